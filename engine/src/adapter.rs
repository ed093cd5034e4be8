//! Host interfaces the ranking core needs.
//!
//! The mapper never touches a database directly. A host implements
//! [`Rankable`] once for its record type and [`GroupStore`] once for its
//! persistence layer; [`crate::table::Database`] is the in-memory reference
//! implementation of both.

use crate::{Position, Rank, RecordId, TableName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A group member as seen from a neighbor query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: RecordId,
    /// `None` when the member has never been ranked.
    pub rank: Option<Rank>,
}

impl Neighbor {
    pub fn new(id: impl Into<RecordId>, rank: Option<Rank>) -> Self {
        Self {
            id: id.into(),
            rank,
        }
    }
}

/// Range predicate for a bulk shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankRange {
    /// `rank < value`
    Below(Rank),
    /// `rank <= value`
    AtMost(Rank),
    /// `rank >= value`
    AtLeast(Rank),
}

impl RankRange {
    /// Whether a stored rank matches. Unranked rows never match.
    pub fn matches(&self, rank: Option<Rank>) -> bool {
        match (self, rank) {
            (_, None) => false,
            (Self::Below(bound), Some(rank)) => rank < *bound,
            (Self::AtMost(bound), Some(rank)) => rank <= *bound,
            (Self::AtLeast(bound), Some(rank)) => rank >= *bound,
        }
    }
}

/// Description of the records a target is ordered against.
///
/// Built once per mapper from the policy and the target's current values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Record type (table) the group lives in
    pub table: TableName,
    /// Field holding the rank
    pub column: String,
    /// Named scope predicate narrowing the table
    pub scope: Option<String>,
    /// Field/value pairs every member must match
    pub equals: Vec<(String, Value)>,
    /// The target itself, once persisted
    pub exclude: Option<RecordId>,
}

impl Group {
    /// Whether a row matches the equality key and is not the excluded target.
    ///
    /// The scope predicate is not evaluated here; it belongs to the store.
    pub fn admits(&self, id: &str, payload: &Value) -> bool {
        if self.exclude.as_deref() == Some(id) {
            return false;
        }
        self.equals
            .iter()
            .all(|(field, value)| payload.get(field).unwrap_or(&Value::Null) == value)
    }
}

/// A record that can be ranked.
///
/// Field names are supplied by the policy, so one implementation serves
/// every ranking dimension of a record type.
pub trait Rankable {
    /// Stable identifier of the record.
    fn id(&self) -> &str;

    /// Record type the record belongs to.
    fn table(&self) -> &str;

    /// Whether the record has never been persisted.
    fn is_new(&self) -> bool;

    /// Current value of `field`, `Value::Null` when absent.
    fn field(&self, field: &str) -> Value;

    fn rank(&self, column: &str) -> Option<Rank>;

    fn set_rank(&mut self, column: &str, rank: Rank);

    /// Whether the rank differs from the value it was loaded with.
    fn rank_changed(&self, column: &str) -> bool;

    /// Pending position request stored under `field`.
    fn position(&self, field: &str) -> Option<Position>;

    fn set_position(&mut self, field: &str, position: Option<Position>);
}

/// Persistence operations the mapper issues against a group.
///
/// Every query sees the group in ascending rank order with unranked members
/// first. Writes through [`GroupStore::bulk_shift`] and
/// [`GroupStore::write_rank_silently`] are raw updates: they change sibling
/// rows directly and must not run any per-record lifecycle hooks.
pub trait GroupStore {
    /// Store failures, handed back to the caller unchanged. Engine failures
    /// raised while ranking are converted into it.
    type Error: std::error::Error + From<crate::Error>;

    /// Whether `table` defines a scope called `scope`.
    fn has_scope(&self, table: &str, scope: &str) -> bool;

    /// Whether records in `table` expose a field called `field`.
    fn has_field(&self, table: &str, field: &str) -> bool;

    /// All members in rank order.
    fn ordered(&self, group: &Group) -> Result<Vec<Neighbor>, Self::Error>;

    /// Up to `count` members starting at `offset`.
    fn at_offset_window(
        &self,
        group: &Group,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Neighbor>, Self::Error> {
        Ok(self
            .ordered(group)?
            .into_iter()
            .skip(offset)
            .take(count)
            .collect())
    }

    fn at_offset(&self, group: &Group, offset: usize) -> Result<Option<Neighbor>, Self::Error> {
        Ok(self.at_offset_window(group, offset, 1)?.into_iter().next())
    }

    fn first(&self, group: &Group) -> Result<Option<Neighbor>, Self::Error> {
        self.at_offset(group, 0)
    }

    /// Member with the highest rank (ordered descending, unranked last).
    fn last(&self, group: &Group) -> Result<Option<Neighbor>, Self::Error>;

    /// Member holding exactly `rank`, if any.
    fn at_rank(&self, group: &Group, rank: Rank) -> Result<Option<Neighbor>, Self::Error>;

    /// Add `delta` to the rank of every member matching `range`.
    ///
    /// Returns the number of rows changed.
    fn bulk_shift(
        &mut self,
        group: &Group,
        range: RankRange,
        delta: Rank,
    ) -> Result<usize, Self::Error>;

    /// Overwrite one member's rank without going through its save path.
    fn write_rank_silently(
        &mut self,
        group: &Group,
        id: &str,
        rank: Rank,
    ) -> Result<(), Self::Error>;
}
