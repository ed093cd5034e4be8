//! Rank policies: one ranking dimension of a record type.
//!
//! A policy names the rank field, the transient position field, and how the
//! group of comparable records is narrowed. Binding a policy to a record
//! validates that the record type actually has the scope and fields the
//! policy refers to, and yields a [`Mapper`].

use crate::{
    adapter::{Group, GroupStore, Rankable},
    error::Result,
    Error, Mapper, RankBounds,
};
use serde::{Deserialize, Serialize};

/// Secondary equality key: records only compete with records that share
/// these field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WithSame {
    One(String),
    All(Vec<String>),
}

impl WithSame {
    pub fn fields(&self) -> &[String] {
        match self {
            Self::One(field) => std::slice::from_ref(field),
            Self::All(fields) => fields,
        }
    }
}

impl From<&str> for WithSame {
    fn from(field: &str) -> Self {
        Self::One(field.to_string())
    }
}

impl From<String> for WithSame {
    fn from(field: String) -> Self {
        Self::One(field)
    }
}

impl<S: Into<String>> From<Vec<S>> for WithSame {
    fn from(fields: Vec<S>) -> Self {
        Self::All(fields.into_iter().map(Into::into).collect())
    }
}

/// Immutable description of one ranking dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankPolicy {
    name: String,
    column: String,
    scope: Option<String>,
    with_same: Option<WithSame>,
    bounds: RankBounds,
}

impl RankPolicy {
    /// Create a policy whose rank field is also called `name`.
    ///
    /// Bounds are taken from [`RankBounds::global`] at this point.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            scope: None,
            with_same: None,
            bounds: RankBounds::global(),
        }
    }

    /// Store ranks in `column` instead of `name`.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Narrow the group with a named scope of the record type.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Narrow the group to records sharing the given field value(s).
    pub fn with_same(mut self, fields: impl Into<WithSame>) -> Self {
        self.with_same = Some(fields.into());
        self
    }

    pub fn with_bounds(mut self, bounds: RankBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Equality-key fields, empty when the policy has none.
    pub fn same_fields(&self) -> &[String] {
        match &self.with_same {
            Some(with_same) => with_same.fields(),
            None => &[],
        }
    }

    pub fn bounds(&self) -> RankBounds {
        self.bounds
    }

    /// Field carrying position requests: `<name>_position`.
    pub fn position_field(&self) -> String {
        format!("{}_position", self.name)
    }

    /// Validate the policy against `record`'s type and bind a mapper.
    pub fn bind<'a, R, S>(
        &'a self,
        record: &'a mut R,
        store: &'a mut S,
    ) -> Result<Mapper<'a, R, S>>
    where
        R: Rankable,
        S: GroupStore,
    {
        self.validate(&*record, &*store)?;
        Ok(Mapper::new(self, record, store))
    }

    fn validate<R: Rankable, S: GroupStore>(&self, record: &R, store: &S) -> Result<()> {
        let table = record.table();

        if let Some(scope) = &self.scope {
            if !store.has_scope(table, scope) {
                return Err(Error::InvalidScope(scope.clone()));
            }
        }

        if let Some(with_same) = &self.with_same {
            let fields = with_same.fields();
            if !fields.iter().any(|field| store.has_field(table, field)) {
                return Err(Error::InvalidField(fields.join(", ")));
            }
        }

        Ok(())
    }

    /// The group `record` is ordered against, using its current values.
    pub fn group_for<R: Rankable>(&self, record: &R) -> Group {
        Group {
            table: record.table().to_string(),
            column: self.column.clone(),
            scope: self.scope.clone(),
            equals: self
                .same_fields()
                .iter()
                .map(|field| (field.clone(), record.field(field)))
                .collect(),
            exclude: (!record.is_new()).then(|| record.id().to_string()),
        }
    }
}
