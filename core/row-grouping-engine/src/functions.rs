//! FILENAME: core/row-grouping-engine/src/functions.rs
//! Aggregation functions and their registry.
//!
//! Every function reduces the values of one column across a group's leaves.
//! Functions skip inputs they cannot use instead of failing.

use std::fmt;
use std::sync::Arc;

use grid_model::{format_grouped, CellValue, ColumnType, ValueFormatter};

/// Reduces a list of cell values to one value.
pub type AggregationApply = Arc<dyn Fn(&[CellValue]) -> CellValue + Send + Sync>;

/// A named reduction plus its compatibility and display metadata.
#[derive(Clone)]
pub struct AggregationFunction {
    pub apply: AggregationApply,
    /// Column types the function accepts. `None` accepts every type.
    pub applicable_types: Option<Vec<ColumnType>>,
    /// Label appended to the column header. Defaults to the function name.
    pub label: Option<String>,
    /// Formatter used for aggregated cells instead of the column's own.
    pub value_formatter: Option<ValueFormatter>,
}

impl fmt::Debug for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationFunction")
            .field("applicable_types", &self.applicable_types)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl AggregationFunction {
    pub fn new(apply: impl Fn(&[CellValue]) -> CellValue + Send + Sync + 'static) -> Self {
        AggregationFunction {
            apply: Arc::new(apply),
            applicable_types: None,
            label: None,
            value_formatter: None,
        }
    }

    pub fn with_types(mut self, types: &[ColumnType]) -> Self {
        self.applicable_types = Some(types.to_vec());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value_formatter(
        mut self,
        formatter: impl Fn(&CellValue, &grid_model::CellParams<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.value_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn accepts(&self, column_type: &ColumnType) -> bool {
        match &self.applicable_types {
            Some(types) => types.contains(column_type),
            None => true,
        }
    }
}

// ============================================================================
// BUILT-IN FUNCTIONS
// ============================================================================

fn sum(values: &[CellValue]) -> CellValue {
    let total: f64 = values.iter().filter_map(CellValue::as_number).sum();
    CellValue::Number(total)
}

fn avg(values: &[CellValue]) -> CellValue {
    let mut total = 0.0;
    let mut count = 0usize;
    for n in values.iter().filter_map(CellValue::as_number) {
        total += n;
        count += 1;
    }
    if count == 0 {
        CellValue::Null
    } else {
        CellValue::Number(total / count as f64)
    }
}

/// Keeps the value whose ordinal wins `better`; nullish and non-ordinal values are skipped.
fn extreme(values: &[CellValue], better: fn(f64, f64) -> bool) -> CellValue {
    let mut best: Option<(f64, &CellValue)> = None;
    for value in values {
        let Some(ordinal) = value.as_ordinal() else {
            continue;
        };
        match best {
            Some((current, _)) if !better(ordinal, current) => {}
            _ => best = Some((ordinal, value)),
        }
    }
    best.map(|(_, value)| value.clone()).unwrap_or(CellValue::Null)
}

fn min(values: &[CellValue]) -> CellValue {
    extreme(values, |candidate, current| candidate < current)
}

fn max(values: &[CellValue]) -> CellValue {
    extreme(values, |candidate, current| candidate > current)
}

/// Counts every present value, nulls included.
fn size(values: &[CellValue]) -> CellValue {
    CellValue::Number(values.iter().filter(|v| !v.is_undefined()).count() as f64)
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Named aggregation functions in registration order.
#[derive(Debug, Clone)]
pub struct AggregationFunctions {
    entries: Vec<(String, AggregationFunction)>,
}

impl Default for AggregationFunctions {
    fn default() -> Self {
        AggregationFunctions::builtin()
    }
}

impl AggregationFunctions {
    pub fn empty() -> Self {
        AggregationFunctions { entries: Vec::new() }
    }

    /// `sum`, `avg`, `min`, `max` and `size`.
    pub fn builtin() -> Self {
        let numeric = [ColumnType::Number];
        let ordinal = [ColumnType::Number, ColumnType::Date, ColumnType::DateTime];

        let mut functions = AggregationFunctions::empty();
        functions.register("sum", AggregationFunction::new(sum).with_types(&numeric));
        functions.register("avg", AggregationFunction::new(avg).with_types(&numeric));
        functions.register("min", AggregationFunction::new(min).with_types(&ordinal));
        functions.register("max", AggregationFunction::new(max).with_types(&ordinal));
        functions.register(
            "size",
            AggregationFunction::new(size).with_value_formatter(|value, _| match value.as_number() {
                Some(n) => format_grouped(n),
                None => String::new(),
            }),
        );
        functions
    }

    /// Adds a function, replacing any function registered under the same name.
    pub fn register(&mut self, name: &str, function: AggregationFunction) {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = function,
            None => self.entries.push((name.to_string(), function)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AggregationFunction> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, function)| function)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregationFunction)> {
        self.entries.iter().map(|(name, function)| (name.as_str(), function))
    }

    /// Header label of a function: its explicit label, else its name.
    pub fn label(&self, name: &str) -> String {
        self.get(name)
            .and_then(|function| function.label.clone())
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, values: &[CellValue]) -> CellValue {
        let functions = AggregationFunctions::builtin();
        (functions.get(name).unwrap().apply)(values)
    }

    #[test]
    fn test_sum_ignores_non_numeric() {
        let values = vec![CellValue::Number(10.0), CellValue::text("x"), CellValue::Empty, CellValue::Number(2.5)];
        assert_eq!(apply("sum", &values), CellValue::Number(12.5));
        assert_eq!(apply("sum", &[]), CellValue::Number(0.0));
    }

    #[test]
    fn test_avg_without_numbers_is_null() {
        assert_eq!(apply("avg", &[CellValue::text("a"), CellValue::Null]), CellValue::Null);
        assert_eq!(
            apply("avg", &[CellValue::Number(1.0), CellValue::Number(2.0), CellValue::text("3")]),
            CellValue::Number(1.5)
        );
    }

    #[test]
    fn test_min_max_over_dates() {
        let values = vec![CellValue::Date(20), CellValue::Null, CellValue::Date(3), CellValue::Date(11)];
        assert_eq!(apply("min", &values), CellValue::Date(3));
        assert_eq!(apply("max", &values), CellValue::Date(20));
        assert_eq!(apply("max", &[CellValue::Empty, CellValue::Null]), CellValue::Null);
    }

    #[test]
    fn test_size_counts_nulls_but_not_absent() {
        let values = vec![CellValue::Null, CellValue::Empty, CellValue::text("a"), CellValue::Number(0.0)];
        assert_eq!(apply("size", &values), CellValue::Number(3.0));
    }

    #[test]
    fn test_applicable_types() {
        let functions = AggregationFunctions::builtin();
        assert!(functions.get("sum").unwrap().accepts(&ColumnType::Number));
        assert!(!functions.get("sum").unwrap().accepts(&ColumnType::String));
        assert!(functions.get("max").unwrap().accepts(&ColumnType::DateTime));
        assert!(functions.get("size").unwrap().accepts(&ColumnType::Boolean));
    }

    #[test]
    fn test_register_replaces_and_keeps_order() {
        let mut functions = AggregationFunctions::builtin();
        functions.register("sum", AggregationFunction::new(|_| CellValue::Number(-1.0)).with_label("total"));
        functions.register("first", AggregationFunction::new(|v| v.first().cloned().unwrap_or_default()));

        let names: Vec<&str> = functions.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["sum", "avg", "min", "max", "size", "first"]);
        assert_eq!(functions.label("sum"), "total");
        assert_eq!(functions.label("avg"), "avg");
    }
}
