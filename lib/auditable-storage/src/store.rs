//! Store boundary.
//!
//! The core never talks to a database directly. It hands finished
//! [`Statement`]s to a [`Store`] (or to a [`TransactionStore`] obtained from
//! one) and decodes returned rows through [`Record::from_row`].

use async_trait::async_trait;

use crate::{ConnectionConfig, Record, Statement, StorageError};

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Identity generated by the insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

impl ExecResult {
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            last_insert_id: None,
            rows_affected,
        }
    }

    /// True when at least one row matched.
    pub fn found(&self) -> bool {
        self.rows_affected > 0
    }
}

/// Executes statements against a connection pool.
#[async_trait]
pub trait Store: Send + Sync {
    type Transaction: TransactionStore;

    /// Run a statement that returns no rows.
    async fn execute(&self, statement: &Statement) -> Result<ExecResult, StorageError>;

    /// First row of the result, `None` when there is no row.
    async fn query_one<R: Record>(&self, statement: &Statement)
    -> Result<Option<R>, StorageError>;

    async fn query_many<R: Record>(&self, statement: &Statement) -> Result<Vec<R>, StorageError>;

    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError>;
}

/// The same operations scoped to an open transaction.
#[async_trait]
pub trait TransactionStore: Send + Sized {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecResult, StorageError>;

    async fn query_one<R: Record>(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<R>, StorageError>;

    async fn query_many<R: Record>(
        &mut self,
        statement: &Statement,
    ) -> Result<Vec<R>, StorageError>;

    async fn commit(self) -> Result<(), StorageError>;

    async fn rollback(self) -> Result<(), StorageError>;
}

/// Connection lifecycle for a concrete backend.
#[async_trait]
pub trait StoreConnection: Sized + Send + Sync {
    async fn connect(config: impl Into<ConnectionConfig> + Send) -> Result<Self, StorageError>;
}
