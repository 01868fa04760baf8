//! FILENAME: core/grid-model/src/record.rs
//! PURPOSE: The authoritative flat collection of rows, keyed by row id.
//! CONTEXT: Records are opaque field maps. The grouping engine only reads them;
//! the only mutation is whole-row replacement through `RecordSet`.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::error::ModelError;

/// Identifier of a column / record field.
pub type FieldId = String;

/// Default field read by the default row id getter.
pub const DEFAULT_ROW_ID_FIELD: &str = "id";

// ============================================================================
// ROW ID
// ============================================================================

/// Identifier of a row. Records use numbers or strings; synthesized tree
/// nodes (groups, footers) always use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Number(i64),
    Text(String),
}

impl RowId {
    pub fn text(value: impl Into<String>) -> Self {
        RowId::Text(value.into())
    }

    /// Derives a row id from a field value. Only integral numbers and text qualify.
    pub fn from_value(value: &CellValue) -> Option<RowId> {
        match value {
            CellValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(RowId::Number(*n as i64)),
            CellValue::Text(s) => Some(RowId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Number(n) => write!(f, "{}", n),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Number(value)
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        RowId::Number(value as i64)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId::Text(value)
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One data row: a map from field to value. Missing fields read as `CellValue::Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: FxHashMap<FieldId, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: &str, value: impl Into<CellValue>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<CellValue>) {
        self.values.insert(field.to_string(), value.into());
    }

    /// Returns the field value, or `Empty` when the field is absent.
    pub fn get(&self, field: &str) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.values.get(field).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldId> {
        self.values.keys()
    }

    /// Parses a record from a JSON object, mapping JSON scalars to cell values.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Record, ModelError> {
        let object = value
            .as_object()
            .ok_or_else(|| ModelError::InvalidRecord("expected a JSON object".to_string()))?;

        let mut record = Record::new();
        for (field, raw) in object {
            let cell = match raw {
                serde_json::Value::Null => CellValue::Null,
                serde_json::Value::Bool(b) => CellValue::Boolean(*b),
                serde_json::Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(f64::NAN)),
                serde_json::Value::String(s) => CellValue::Text(s.clone()),
                other => {
                    return Err(ModelError::InvalidRecord(format!(
                        "field '{}' holds a nested value: {}",
                        field, other
                    )))
                }
            };
            record.values.insert(field.clone(), cell);
        }
        Ok(record)
    }
}

/// Pluggable row id derivation.
pub type RowIdGetter = Arc<dyn Fn(&Record) -> Option<RowId> + Send + Sync>;

/// The default getter: reads the `id` field.
pub fn default_row_id_getter() -> RowIdGetter {
    Arc::new(|record: &Record| RowId::from_value(record.get(DEFAULT_ROW_ID_FIELD)))
}

/// A getter reading an arbitrary field.
pub fn field_row_id_getter(field: &str) -> RowIdGetter {
    let field = field.to_string();
    Arc::new(move |record: &Record| RowId::from_value(record.get(&field)))
}

// ============================================================================
// RECORD SET
// ============================================================================

/// One change applied by `RecordSet::update_rows`.
#[derive(Debug, Clone)]
pub enum RowUpdate {
    /// Insert the record, or replace the existing record with the same id.
    Upsert(Record),
    Delete(RowId),
}

/// Ordered, keyed collection of records.
///
/// Insertion order is preserved and is the "first appearance" order the tree
/// builder relies on when no sort model applies.
#[derive(Clone)]
pub struct RecordSet {
    order: Vec<RowId>,
    rows: FxHashMap<RowId, Record>,
    get_row_id: RowIdGetter,
    /// Bumped on every mutation; lets callers detect staleness cheaply.
    generation: u64,
}

impl fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("len", &self.order.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for RecordSet {
    fn default() -> Self {
        RecordSet::new(default_row_id_getter())
    }
}

impl RecordSet {
    pub fn new(get_row_id: RowIdGetter) -> Self {
        RecordSet {
            order: Vec::new(),
            rows: FxHashMap::default(),
            get_row_id,
            generation: 0,
        }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let mut set = RecordSet::default();
        set.set_rows(records);
        set
    }

    pub fn set_row_id_getter(&mut self, get_row_id: RowIdGetter) {
        self.get_row_id = get_row_id;
        let records: Vec<Record> = self
            .order
            .drain(..)
            .filter_map(|id| self.rows.remove(&id))
            .collect();
        self.set_rows(records);
    }

    /// Replaces every row. Records without a resolvable id are skipped; a
    /// repeated id replaces the earlier record but keeps its position.
    pub fn set_rows(&mut self, records: Vec<Record>) {
        self.order.clear();
        self.rows.clear();
        for record in records {
            self.upsert(record);
        }
        self.generation += 1;
    }

    /// Applies upserts and deletions in order. Returns the number of changes applied.
    pub fn update_rows(&mut self, updates: Vec<RowUpdate>) -> usize {
        let mut applied = 0;
        for update in updates {
            let changed = match update {
                RowUpdate::Upsert(record) => self.upsert(record),
                RowUpdate::Delete(id) => self.remove(&id),
            };
            if changed {
                applied += 1;
            }
        }
        if applied > 0 {
            self.generation += 1;
        }
        applied
    }

    /// Replaces the record stored under `id`. Fails if the id is unknown.
    pub fn update_row(&mut self, id: &RowId, record: Record) -> Result<(), ModelError> {
        match self.rows.get_mut(id) {
            Some(slot) => {
                *slot = record;
                self.generation += 1;
                Ok(())
            }
            None => Err(ModelError::UnknownRow(id.to_string())),
        }
    }

    fn upsert(&mut self, record: Record) -> bool {
        let Some(id) = (self.get_row_id)(&record) else {
            log::warn!(target: "ROWTREE", "skipping record without a resolvable row id");
            return false;
        };
        if self.rows.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
        true
    }

    fn remove(&mut self, id: &RowId) -> bool {
        if self.rows.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &RowId) -> Option<&Record> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.rows.contains_key(id)
    }

    /// Row ids in insertion order.
    pub fn ids(&self) -> &[RowId] {
        &self.order
    }

    /// `(id, record)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&RowId, &Record)> {
        self.order
            .iter()
            .filter_map(move |id| self.rows.get(id).map(|record| (id, record)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
