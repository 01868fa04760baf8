//! FILENAME: core/row-grouping-engine/tests/common/mod.rs
//! Shared fixtures for the row grouping integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use grid_model::{ColumnDef, Record, RowId};
use row_grouping_engine::{NodeId, RowGroupingEngine, RowGroupingOptions, TreeDataPathGetter};

/// Eight sales records over two regions and three products.
pub struct SalesFixture;

impl SalesFixture {
    pub fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::string("region").with_header("Region"),
            ColumnDef::string("product").with_header("Product"),
            ColumnDef::number("amount").with_header("Amount"),
            ColumnDef::number("units").with_header("Units"),
        ]
    }

    pub fn records() -> Vec<Record> {
        let rows: [(i64, &str, &str, f64, f64); 8] = [
            (1, "North", "Apples", 120.0, 10.0),
            (2, "South", "Pears", 80.0, 4.0),
            (3, "North", "Pears", 45.5, 3.0),
            (4, "South", "Apples", 200.0, 16.0),
            (5, "North", "Apples", 30.0, 2.0),
            (6, "East", "Plums", 12.0, 1.0),
            (7, "South", "Pears", 64.0, 5.0),
            (8, "North", "Plums", 18.0, 2.0),
        ];
        rows.iter()
            .map(|(id, region, product, amount, units)| {
                Record::new()
                    .with("id", *id)
                    .with("region", *region)
                    .with("product", *product)
                    .with("amount", *amount)
                    .with("units", *units)
            })
            .collect()
    }

    /// An engine with every group expanded, loaded with the fixture.
    pub fn engine() -> RowGroupingEngine {
        let mut engine = RowGroupingEngine::new(RowGroupingOptions {
            default_grouping_expansion_depth: -1,
            ..RowGroupingOptions::default()
        });
        engine.set_columns(Self::columns());
        engine.set_rows(Self::records());
        engine
    }
}

pub fn group_id(path: &[(&str, &str)]) -> NodeId {
    let segments: Vec<String> = path
        .iter()
        .map(|(field, key)| format!("{}/{}", field, key))
        .collect();
    RowId::text(format!("auto-generated-row-{}", segments.join("-")))
}

/// Splits a `path` field on dots.
pub fn dotted_path_getter() -> TreeDataPathGetter {
    Arc::new(|record: &Record| {
        record
            .get("path")
            .as_text()
            .map(|path| path.split('.').map(str::to_string).collect())
            .unwrap_or_default()
    })
}

/// Every node id with its child list, in top-down order.
pub fn topology(engine: &RowGroupingEngine) -> Vec<(NodeId, Vec<NodeId>)> {
    let tree = engine.tree();
    tree.group_ids_top_down()
        .into_iter()
        .map(|id| {
            let children = tree.children(&id).to_vec();
            (id, children)
        })
        .collect()
}
