//! FILENAME: core/grid-model/src/cell.rs
//! PURPOSE: Defines the values a record field can hold and their hashable grouping form.
//! CONTEXT: `CellValue` is what records store and what value getters return.
//! `GroupKey` is the normalized, hashable projection of a `CellValue` used to
//! bucket records into tree levels and to build deterministic node ids.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CELL VALUE
// ============================================================================

/// A value held by one field of one record.
///
/// `Empty` stands for an absent field ("undefined"), `Null` for a field that is
/// present but explicitly null. Aggregation functions treat the two differently
/// (`size` counts nulls but not absent fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    #[default]
    Empty,
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Days since 1970-01-01.
    Date(i64),
    /// Milliseconds since 1970-01-01T00:00:00Z.
    DateTime(i64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Returns true for `Empty` (absent) values only.
    pub fn is_undefined(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Returns true for both absent and explicitly null values.
    pub fn is_nullish(&self) -> bool {
        matches!(self, CellValue::Empty | CellValue::Null)
    }

    /// Numeric view used by `sum`/`avg`. Only real finite numbers qualify;
    /// numeric-looking text does not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Ordinal used to compare dates and date-times with `min`/`max`.
    pub fn as_ordinal(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Date(d) => Some(*d as f64),
            CellValue::DateTime(ms) => Some(*ms as f64),
            _ => None,
        }
    }

    /// Total order used by the default sort comparator.
    /// Nullish values sort first, then numbers, text, booleans, dates.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        fn rank(value: &CellValue) -> u8 {
            match value {
                CellValue::Empty => 0,
                CellValue::Null => 1,
                CellValue::Number(_) => 2,
                CellValue::Text(_) => 3,
                CellValue::Boolean(_) => 4,
                CellValue::Date(_) => 5,
                CellValue::DateTime(_) => 6,
            }
        }

        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::format_cell_value(self))
    }
}

// ============================================================================
// GROUP KEY
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for use as map keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        (self.0.is_nan() && other.0.is_nan()) || self.0 == other.0
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // +0.0 and -0.0 compare equal, so they must hash equal
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// The key a record is bucketed under for one grouping criterion.
/// Absent and null values are keys of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Undefined,
    Null,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
    Date(i64),
    DateTime(i64),
}

impl GroupKey {
    /// Converts the key back into the value shown in the grouping cell.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            GroupKey::Undefined => CellValue::Empty,
            GroupKey::Null => CellValue::Null,
            GroupKey::Number(n) => CellValue::Number(n.0),
            GroupKey::Text(s) => CellValue::Text(s.clone()),
            GroupKey::Boolean(b) => CellValue::Boolean(*b),
            GroupKey::Date(d) => CellValue::Date(*d),
            GroupKey::DateTime(ms) => CellValue::DateTime(*ms),
        }
    }

    /// Stable textual form used inside node ids. Text keys are escaped and
    /// every other key type carries a `%` tag, so two distinct keys never
    /// share a segment.
    pub fn id_segment(&self) -> String {
        match self {
            GroupKey::Undefined => "%undefined".to_string(),
            GroupKey::Null => "%null".to_string(),
            GroupKey::Number(n) => format!("%n:{}", n.0),
            GroupKey::Text(s) => escape_id_component(s),
            GroupKey::Boolean(b) => format!("%b:{}", b),
            GroupKey::Date(d) => format!("%d:{}", d),
            GroupKey::DateTime(ms) => format!("%dt:{}", ms),
        }
    }

    pub fn compare(&self, other: &GroupKey) -> Ordering {
        self.to_cell_value().compare(&other.to_cell_value())
    }
}

impl From<&CellValue> for GroupKey {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => GroupKey::Undefined,
            CellValue::Null => GroupKey::Null,
            CellValue::Number(n) => GroupKey::Number(OrderedFloat(*n)),
            CellValue::Text(s) => GroupKey::Text(s.clone()),
            CellValue::Boolean(b) => GroupKey::Boolean(*b),
            CellValue::Date(d) => GroupKey::Date(*d),
            CellValue::DateTime(ms) => GroupKey::DateTime(*ms),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Text(value.to_string())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Undefined => f.write_str("undefined"),
            GroupKey::Null => f.write_str("null"),
            GroupKey::Number(n) => f.write_str(&crate::format::format_general(n.0)),
            GroupKey::Text(s) => f.write_str(s),
            GroupKey::Boolean(b) => write!(f, "{}", b),
            GroupKey::Date(d) => write!(f, "date:{}", d),
            GroupKey::DateTime(ms) => write!(f, "datetime:{}", ms),
        }
    }
}

/// Escapes the characters node ids use as separators (`-`, `/`) and the
/// escape character itself.
pub fn escape_id_component(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            '/' => escaped.push_str("%2F"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nullish_values() {
        assert!(CellValue::Empty.is_undefined());
        assert!(!CellValue::Null.is_undefined());
        assert!(CellValue::Null.is_nullish());
        assert!(!CellValue::Number(0.0).is_nullish());
    }

    #[test]
    fn test_as_number_ignores_text() {
        assert_eq!(CellValue::Number(3.5).as_number(), Some(3.5));
        assert_eq!(CellValue::text("12").as_number(), None);
        assert_eq!(CellValue::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn test_compare_orders_nullish_first() {
        let mut values = vec![
            CellValue::text("b"),
            CellValue::Number(2.0),
            CellValue::Null,
            CellValue::Number(-1.0),
            CellValue::Empty,
            CellValue::text("a"),
        ];
        values.sort_by(|a, b| a.compare(b));
        assert_eq!(
            values,
            vec![
                CellValue::Empty,
                CellValue::Null,
                CellValue::Number(-1.0),
                CellValue::Number(2.0),
                CellValue::text("a"),
                CellValue::text("b"),
            ]
        );
    }

    #[test]
    fn test_group_key_hash_merges_signed_zero_and_nan() {
        let mut keys = HashSet::new();
        keys.insert(GroupKey::from(&CellValue::Number(0.0)));
        keys.insert(GroupKey::from(&CellValue::Number(-0.0)));
        keys.insert(GroupKey::from(&CellValue::Number(f64::NAN)));
        keys.insert(GroupKey::from(&CellValue::Number(f64::NAN)));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_group_key_distinguishes_null_and_undefined() {
        assert_ne!(GroupKey::from(&CellValue::Null), GroupKey::from(&CellValue::Empty));
        assert_eq!(GroupKey::Null.id_segment(), "%null");
        assert_eq!(GroupKey::Undefined.id_segment(), "%undefined");
    }

    #[test]
    fn test_id_segments_are_distinct_across_key_types() {
        let keys = [
            GroupKey::Null,
            GroupKey::Text("null".to_string()),
            GroupKey::Undefined,
            GroupKey::Text("undefined".to_string()),
            GroupKey::Number(OrderedFloat(1.0)),
            GroupKey::Text("1".to_string()),
            GroupKey::Text("%n:1".to_string()),
            GroupKey::Boolean(true),
            GroupKey::Text("true".to_string()),
            GroupKey::Date(1),
            GroupKey::DateTime(1),
            GroupKey::Number(OrderedFloat(0.1)),
            GroupKey::Number(OrderedFloat(0.1000000000001)),
        ];
        let segments: HashSet<String> = keys.iter().map(GroupKey::id_segment).collect();
        assert_eq!(segments.len(), keys.len());
    }

    #[test]
    fn test_escape_id_component() {
        assert_eq!(escape_id_component("a-b/c%d"), "a%2Db%2Fc%25d");
        assert_eq!(escape_id_component("North"), "North");
        assert_eq!(GroupKey::Null.to_string(), "null");
    }
}
