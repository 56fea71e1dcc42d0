//! Record trait: the compile-time schema of a persisted type.
//!
//! Types implementing `Record` describe their columns explicitly instead of
//! being inspected at runtime. Use `#[derive(Record)]` to generate the
//! implementation.
//!
//! # Example
//!
//! ```text
//! #[derive(Record)]
//! pub struct Timestamps {
//!     pub created_at: Option<StorageDatetime>,
//!     pub updated_at: Option<StorageDatetime>,
//!     pub deleted_at: Option<StorageDatetime>,
//! }
//!
//! #[derive(Record)]
//! pub struct User {
//!     pub id: i64,
//!     #[column(name = "display_name")]
//!     pub name: String,
//!     #[column(flatten)]
//!     pub timestamps: Timestamps,
//!     #[column(skip)]
//!     pub cached_avatar: Option<Vec<u8>>,
//! }
//! ```
//!
//! # Column Naming
//!
//! Columns default to the Rust field name. `#[column(name = "...")]` overrides
//! it, `#[column(flatten)]` merges a nested record's columns into the parent's
//! namespace, and `#[column(skip)]` excludes a field (it is rebuilt with
//! `Default` when read back).
//!
//! Column names must not collide across nesting levels. Collisions are not
//! detected.

use crate::{Row, StorageError, Value};

pub trait Record: Sized + Send + Sync {
    /// Column names in declaration order, nested records flattened in place.
    fn columns() -> Vec<&'static str>;

    /// Current value of every column, in the same order as [`Record::columns`].
    fn to_columns(&self) -> Vec<(&'static str, Value)>;

    /// Rebuild a record from a store row.
    fn from_row(row: &Row) -> Result<Self, StorageError>;

    /// Value of a single column, if the record has it.
    fn column_value(&self, column: &str) -> Option<Value> {
        self.to_columns()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}
