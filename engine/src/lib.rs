//! # Ranked Engine
//!
//! Stable ordering for groups of records through sparse integer ranks.
//!
//! Every record in a group carries an integer rank inside fixed bounds.
//! Inserting a record between two others takes the midpoint of their ranks,
//! so most writes touch only the record itself. When the gap runs out, a
//! short run of neighbors is shifted by one, and only when the rank space is
//! saturated is the whole group re-spaced.
//!
//! ## Design Principles
//!
//! - **Store-agnostic**: the core speaks to storage only through the
//!   [`GroupStore`] and [`Rankable`] traits
//! - **Bounded**: ranks never leave [`RankBounds`]
//! - **Explicit raw writes**: sibling ranks are rewritten through dedicated
//!   store operations that skip per-record save hooks
//!
//! ## Core Concepts
//!
//! ### Policies
//!
//! A [`RankPolicy`] describes one ranking dimension: the rank field, the
//! position field (`<name>_position`), an optional named scope and an
//! optional equality key ([`WithSame`]) that splits a table into independent
//! groups.
//!
//! ### Positions
//!
//! A [`Position`] is a one-shot request: `first`, `last`, `middle` or an
//! index. It is translated into a rank and then forgotten.
//!
//! ### Mappers
//!
//! Binding a policy to a record yields a [`Mapper`], whose
//! [`Mapper::handle_ranking`] computes the record's rank and resolves
//! collisions before the record is persisted.
//!
//! ## Quick Start
//!
//! ```rust
//! use ranked_engine::{Database, FieldDef, FieldType, Position, RankPolicy, Record, TableSchema};
//! use serde_json::json;
//!
//! // 1. Define a table with a rank column
//! let mut db = Database::new();
//! db.create_table(TableSchema::new(
//!     "ducks",
//!     vec![
//!         FieldDef::required("name", FieldType::String),
//!         FieldDef::optional("row", FieldType::Int),
//!     ],
//! ))
//! .ranks(RankPolicy::new("row"))
//! .unwrap();
//!
//! // 2. Save records; each lands last unless a position is requested
//! let mut a = Record::new("duck-a", "ducks", json!({"name": "A"}));
//! db.save(&mut a).unwrap();
//!
//! let mut b = Record::new("duck-b", "ducks", json!({"name": "B"}));
//! b.set_position("row_position", Position::First);
//! db.save(&mut b).unwrap();
//!
//! // 3. B now sorts before A
//! assert!(b.payload["row"].as_i64() < a.payload["row"].as_i64());
//! ```
//!
//! ## Concurrency
//!
//! The engine does no locking. Neighbor lookups and sibling writes are
//! separate store calls, so hosts with concurrent writers must run
//! [`Mapper::handle_ranking`] and the following persist in one transaction.

pub mod adapter;
pub mod bounds;
pub mod error;
pub mod mapper;
pub mod policy;
pub mod position;
pub mod record;
pub mod schema;
pub mod table;

// Re-export main types at crate root
pub use adapter::{Group, GroupStore, Neighbor, RankRange, Rankable};
pub use bounds::{RankBounds, MAX_RANK, MEDIAN_RANK, MIN_RANK};
pub use error::Error;
pub use mapper::Mapper;
pub use policy::{RankPolicy, WithSame};
pub use position::Position;
pub use record::Record;
pub use schema::{FieldDef, FieldType, TableSchema};
pub use table::{Database, Scope, Table};

/// Type aliases for clarity
pub type RecordId = String;
pub type TableName = String;
pub type Rank = i64;
