//! In-memory reference store.
//!
//! [`Database`] holds tables of JSON rows. Each [`Table`] carries its schema,
//! named scope predicates and the rank policies that run whenever one of its
//! records is saved. It implements [`GroupStore`], so it is both a usable
//! host for small embedded cases and the store the test suite runs against.

use crate::{
    adapter::{Group, GroupStore, Neighbor, RankRange},
    error::Result,
    schema::{FieldType, TableSchema},
    Error, Rank, RankPolicy, Record, RecordId, TableName,
};
use serde_json::Value;
use std::collections::{hash_map::Entry, BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Named predicate narrowing a table, evaluated against a row's payload.
pub type Scope = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A table of rows sharing one schema.
pub struct Table {
    schema: TableSchema,
    scopes: BTreeMap<String, Scope>,
    policies: Vec<RankPolicy>,
    rows: BTreeMap<RecordId, Value>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("policies", &self.policies)
            .field("rows", &self.rows)
            .finish()
    }
}

impl Table {
    fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            scopes: BTreeMap::new(),
            policies: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Register a named scope.
    pub fn with_scope<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.scopes.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Rank records of this table under `policy` on every save.
    ///
    /// The policy's rank column must be declared as an `Int` field.
    pub fn ranks(&mut self, policy: RankPolicy) -> Result<&mut Self> {
        match self.schema.field(policy.column()) {
            Some(field) if field.field_type == FieldType::Int => {}
            _ => return Err(Error::InvalidField(policy.column().to_string())),
        }
        self.policies.push(policy);
        Ok(self)
    }

    pub fn policies(&self) -> &[RankPolicy] {
        &self.policies
    }

    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Stored payload of a row.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All tables of one in-memory store.
#[derive(Debug, Default)]
pub struct Database {
    tables: HashMap<TableName, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table, replacing any existing table of the same name.
    pub fn create_table(&mut self, schema: TableSchema) -> &mut Table {
        match self.tables.entry(schema.name.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(Table::new(schema));
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(Table::new(schema)),
        }
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Load a persisted record.
    pub fn find(&self, table: &str, id: &str) -> Result<Record> {
        let payload = self
            .table(table)?
            .get(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        Ok(Record::loaded(id, table, payload.clone()))
    }

    /// Store a row as-is. No rank policy runs.
    pub fn insert_raw(
        &mut self,
        table: &str,
        id: impl Into<RecordId>,
        payload: Value,
    ) -> Result<()> {
        let id = id.into();
        let table = self.table_mut(table)?;
        if table.rows.contains_key(&id) {
            return Err(Error::RecordAlreadyExists(id));
        }
        table.schema.validate_payload(&payload)?;
        table.rows.insert(id, payload);
        Ok(())
    }

    /// Rank and persist a record.
    ///
    /// Every policy of the record's table runs before the row is written.
    /// Sibling rows may be shifted or rebalanced along the way. On success
    /// pending position requests are cleared and the record counts as
    /// loaded.
    pub fn save(&mut self, record: &mut Record) -> Result<()> {
        let table = self.table(&record.table)?;
        let exists = table.rows.contains_key(&record.id);
        if record.is_new() && exists {
            return Err(Error::RecordAlreadyExists(record.id.clone()));
        }
        if !record.is_new() && !exists {
            return Err(Error::RecordNotFound(record.id.clone()));
        }
        table.schema.validate_payload(&record.payload)?;

        let policies = table.policies.clone();
        for policy in &policies {
            policy.bind(record, self)?.handle_ranking()?;
        }

        self.table_mut(&record.table)?
            .rows
            .insert(record.id.clone(), record.payload.clone());

        for policy in &policies {
            record.clear_position(&policy.position_field());
        }
        record.mark_loaded();

        debug!(table = %record.table, id = %record.id, "saved record");
        Ok(())
    }

    /// Remove a row. Remaining ranks are left as they are.
    pub fn delete(&mut self, table: &str, id: &str) -> Result<()> {
        self.table_mut(table)?
            .rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    fn members(&self, group: &Group) -> Result<Vec<Neighbor>> {
        let table = self.table(&group.table)?;
        let scope = match &group.scope {
            Some(name) => Some(
                table
                    .scopes
                    .get(name)
                    .ok_or_else(|| Error::InvalidScope(name.clone()))?,
            ),
            None => None,
        };

        let mut members: Vec<Neighbor> = table
            .rows
            .iter()
            .filter(|(id, payload)| group.admits(id, payload))
            .filter(|(_, payload)| scope.map_or(true, |predicate| predicate(*payload)))
            .map(|(id, payload)| {
                Neighbor::new(id.clone(), payload.get(&group.column).and_then(Value::as_i64))
            })
            .collect();

        // rows are id-ordered, so ties stay deterministic
        members.sort_by_key(|member| member.rank);
        Ok(members)
    }
}

impl GroupStore for Database {
    type Error = Error;

    fn has_scope(&self, table: &str, scope: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|table| table.has_scope(scope))
    }

    fn has_field(&self, table: &str, field: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|table| table.schema.field(field).is_some())
    }

    fn ordered(&self, group: &Group) -> Result<Vec<Neighbor>> {
        self.members(group)
    }

    fn last(&self, group: &Group) -> Result<Option<Neighbor>> {
        Ok(self.members(group)?.pop())
    }

    fn at_rank(&self, group: &Group, rank: Rank) -> Result<Option<Neighbor>> {
        Ok(self
            .members(group)?
            .into_iter()
            .find(|member| member.rank == Some(rank)))
    }

    fn bulk_shift(&mut self, group: &Group, range: RankRange, delta: Rank) -> Result<usize> {
        let ids: Vec<RecordId> = self
            .members(group)?
            .into_iter()
            .filter(|member| range.matches(member.rank))
            .map(|member| member.id)
            .collect();

        let table = self.table_mut(&group.table)?;
        for id in &ids {
            let Some(Value::Object(fields)) = table.rows.get_mut(id) else {
                continue;
            };
            if let Some(rank) = fields.get(&group.column).and_then(Value::as_i64) {
                fields.insert(group.column.clone(), Value::from(rank + delta));
            }
        }

        Ok(ids.len())
    }

    fn write_rank_silently(&mut self, group: &Group, id: &str, rank: Rank) -> Result<()> {
        let table = self.table_mut(&group.table)?;
        match table.rows.get_mut(id) {
            Some(Value::Object(fields)) => {
                fields.insert(group.column.clone(), Value::from(rank));
                Ok(())
            }
            Some(_) => Err(Error::InvalidPayload(format!("row {id} is not an object"))),
            None => Err(Error::RecordNotFound(id.to_string())),
        }
    }
}
