//! FILENAME: core/row-grouping-engine/benches/tree_build.rs
//! Tree build and full refresh over a synthetic record set.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_model::{AggregationModel, ColumnDef, Record, RecordSet};
use row_grouping_engine::{GroupingCriterion, RowGroupingEngine, RowGroupingOptions, RowTreeBuilder};

const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];
const PRODUCTS: [&str; 7] = ["Apples", "Pears", "Plums", "Figs", "Kiwis", "Limes", "Dates"];

fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new()
                .with("id", i as i64)
                .with("region", REGIONS[i % REGIONS.len()])
                .with("product", PRODUCTS[(i / 3) % PRODUCTS.len()])
                .with("amount", (i % 97) as f64 * 1.5)
        })
        .collect()
}

fn columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::string("region"),
        ColumnDef::string("product"),
        ColumnDef::number("amount"),
    ]
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");
    let options = RowGroupingOptions::default();
    let criteria = [GroupingCriterion::new("region"), GroupingCriterion::new("product")];
    let columns = columns();

    for count in [1_000usize, 10_000, 50_000] {
        let set = RecordSet::from_records(records(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &set, |b, set| {
            b.iter(|| RowTreeBuilder::new(&options).build(black_box(set), &criteria, &columns))
        });
    }
    group.finish();
}

fn bench_full_refresh(c: &mut Criterion) {
    let rows = records(10_000);
    c.bench_function("grouped_sum_refresh_10k", |b| {
        b.iter(|| {
            let mut engine = RowGroupingEngine::default();
            engine.set_columns(columns());
            engine.set_rows(rows.clone());
            engine.set_row_grouping_model(vec!["region".to_string(), "product".to_string()]);
            engine.set_aggregation_model(AggregationModel::new().with("amount", "sum"));
            black_box(engine.visible_rows().len())
        })
    });
}

criterion_group!(benches, bench_tree_build, bench_full_refresh);
criterion_main!(benches);
