//! Auditable Storage - statement construction, change diffing and an
//! append-only audit trail for relational tables.
//!
//! # Core Concepts
//!
//! - **Record**: a type with a compile-time column list, usually derived with
//!   `#[derive(Record)]`. Nested records are flattened into one column set.
//! - **Mode**: which columns take part in an insert or update (`skip`/`only`)
//!   and whether the store fills timestamps itself.
//! - **Diff**: the `{o, n}` pairs of the columns an update actually changed.
//! - **Audit entry**: an immutable row describing one mutation or view.
//!
//! # Layers
//!
//! - Pure builders: [`build_insert`], [`build_update`], [`Condition`],
//!   [`PaginationRequest`], and the soft-delete statements. They return SQL
//!   with `:name` placeholders and never perform I/O.
//! - [`Store`] / [`TransactionStore`]: the execution boundary implemented by
//!   a backend crate.
//! - [`Repository`]: table-scoped reads and writes, each with a `_tx` mirror.
//! - [`AuditRecorder`]: builds entries with ids from [`IdGenerator`] and
//!   inserts them.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

extern crate self as auditable_storage;

mod audit;
mod condition;
mod config;
mod error;
mod id;
mod key;
mod mode;
mod pagination;
mod record;
mod repository;
mod soft_delete;
mod statement;
mod store;
mod table;
mod time;
mod value;

pub use audit::{Actor, AuditEntry, AuditRecorder, Operation, record_key};
pub use condition::{Clause, Condition, Joiner, Operator, like_pattern};
pub use config::{AppMode, AuditConfig, ConnectionConfig};
pub use error::StorageError;
pub use id::{GenerateError, IdGenerator, IdParts};
pub use key::Key;
pub use mode::{DEFAULT_SKIP_COLUMNS, Mode};
pub use pagination::{MAX_ITEMS_PER_PAGE, Order, PaginationRequest};
pub use record::Record;
pub use repository::{Page, Repository, Total, Updated, UpdatedRow};
pub use soft_delete::{
    build_delete, build_hard_delete, build_restore, build_restore_at, build_soft_delete,
    build_soft_delete_at,
};
pub use statement::{
    Change, Diff, Statement, UpdateStatement, build_count, build_insert, build_insert_at,
    build_select, build_update, build_update_at,
};
pub use store::{ExecResult, Store, StoreConnection, TransactionStore};
pub use table::{TableDescriptor, Visibility};
pub use time::StorageDatetime;
pub use value::{ColumnType, FromValue, Params, Row, Typed, Value};

// Re-export derive macro
pub use auditable_storage_derive::Record;
