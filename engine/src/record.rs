//! Records as the host hands them to the ranking core.
//!
//! A [`Record`] is a detached copy of a row: the payload as currently edited,
//! the payload as it was loaded (for change detection), and any pending
//! position requests. Position requests are transient and never stored.

use crate::{adapter::Rankable, Position, Rank, RecordId, TableName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A row of a table, detached from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier within the table
    pub id: RecordId,
    /// Table this record belongs to
    pub table: TableName,
    /// The current field values (JSON object)
    pub payload: Value,
    /// Field values as last loaded or saved, `None` for a new record
    loaded: Option<Value>,
    /// Pending position requests by position field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    positions: BTreeMap<String, Position>,
}

impl Record {
    /// Create a new, unsaved record.
    pub fn new(id: impl Into<RecordId>, table: impl Into<TableName>, payload: Value) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            payload,
            loaded: None,
            positions: BTreeMap::new(),
        }
    }

    /// A record read back from the store.
    pub(crate) fn loaded(
        id: impl Into<RecordId>,
        table: impl Into<TableName>,
        payload: Value,
    ) -> Self {
        let mut record = Self::new(id, table, payload);
        record.mark_loaded();
        record
    }

    /// Whether the record has been saved yet.
    pub fn is_new(&self) -> bool {
        self.loaded.is_none()
    }

    /// Value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Set `field`, turning a non-object payload into an empty object first.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        if !self.payload.is_object() {
            self.payload = Value::Object(Map::new());
        }
        if let Value::Object(fields) = &mut self.payload {
            fields.insert(field.into(), value.into());
        }
    }

    /// Whether `field` differs from its loaded value. Always true for new
    /// records that carry the field.
    pub fn changed(&self, field: &str) -> bool {
        let loaded = self.loaded.as_ref().and_then(|l| l.get(field));
        self.get(field) != loaded
    }

    /// Request a position for the ranking dimension owning `field`.
    pub fn set_position(&mut self, field: impl Into<String>, position: impl Into<Position>) {
        self.positions.insert(field.into(), position.into());
    }

    /// Drop a pending position request.
    pub fn clear_position(&mut self, field: &str) {
        self.positions.remove(field);
    }

    /// Snapshot the current payload as the loaded state.
    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = Some(self.payload.clone());
    }
}

impl Rankable for Record {
    fn id(&self) -> &str {
        &self.id
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn is_new(&self) -> bool {
        Record::is_new(self)
    }

    fn field(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or(Value::Null)
    }

    fn rank(&self, column: &str) -> Option<Rank> {
        self.get(column).and_then(Value::as_i64)
    }

    fn set_rank(&mut self, column: &str, rank: Rank) {
        self.set(column, rank);
    }

    fn rank_changed(&self, column: &str) -> bool {
        self.changed(column)
    }

    fn position(&self, field: &str) -> Option<Position> {
        self.positions.get(field).cloned()
    }

    fn set_position(&mut self, field: &str, position: Option<Position>) {
        match position {
            Some(position) => Record::set_position(self, field, position),
            None => self.clear_position(field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_record() {
        let record = Record::new("duck-1", "ducks", json!({"name": "Quacky"}));

        assert_eq!(record.id, "duck-1");
        assert_eq!(record.table, "ducks");
        assert!(record.is_new());
        assert_eq!(record.get("name"), Some(&json!("Quacky")));
        assert_eq!(record.get("pond"), None);
    }

    #[test]
    fn change_tracking() {
        let mut record = Record::loaded("duck-1", "ducks", json!({"name": "Quacky", "row": 10}));
        assert!(!record.is_new());
        assert!(!record.changed("row"));

        record.set("row", 11);
        assert!(record.changed("row"));
        assert!(!record.changed("name"));

        record.set("row", 10);
        assert!(!record.changed("row"));
    }

    #[test]
    fn new_record_fields_count_as_changed() {
        let record = Record::new("duck-1", "ducks", json!({"row": 10}));
        assert!(record.changed("row"));
        assert!(!record.changed("name"));
    }

    #[test]
    fn rankable_view() {
        let mut record = Record::new("duck-1", "ducks", json!({"name": "Quacky", "pond": "Shin"}));

        assert_eq!(Rankable::rank(&record, "row"), None);
        record.set_rank("row", 42);
        assert_eq!(Rankable::rank(&record, "row"), Some(42));
        assert_eq!(record.payload["row"], json!(42));

        assert_eq!(record.field("pond"), json!("Shin"));
        assert_eq!(record.field("lake"), Value::Null);
    }

    #[test]
    fn positions_are_transient() {
        let mut record = Record::new("duck-1", "ducks", json!({"name": "Quacky"}));
        record.set_position("row_position", Position::First);

        assert_eq!(Rankable::position(&record, "row_position"), Some(Position::First));
        assert_eq!(record.get("row_position"), None);

        Rankable::set_position(&mut record, "row_position", None);
        assert_eq!(Rankable::position(&record, "row_position"), None);
    }

    #[test]
    fn set_on_non_object_payload() {
        let mut record = Record::new("duck-1", "ducks", Value::Null);
        record.set("row", 1);
        assert_eq!(record.payload, json!({"row": 1}));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut record = Record::loaded("duck-1", "ducks", json!({"name": "Quacky", "row": 3}));
        record.set_position("row_position", 2usize);

        let json = serde_json::to_string(&record).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();

        assert_eq!(record, parsed);
    }
}
