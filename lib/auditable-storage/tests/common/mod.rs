//! Shared fixtures: record types and an in-memory store that records every
//! statement it receives and replays scripted results.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use auditable_storage::{
    ExecResult, Record, Row, Statement, StorageDatetime, StorageError, Store, TransactionStore,
    Value,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Timestamps {
    pub created_at: Option<StorageDatetime>,
    pub updated_at: Option<StorageDatetime>,
    pub deleted_at: Option<StorageDatetime>,
}

#[derive(Debug, Clone, PartialEq, Record)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    #[column(name = "display_name")]
    pub name: String,
    pub email: Option<String>,
    #[column(flatten)]
    pub timestamps: Timestamps,
    #[column(skip)]
    pub session_note: Option<String>,
}

pub fn user(id: i64, name: &str) -> User {
    User {
        id,
        uuid: format!("uuid-{}", id),
        name: name.to_string(),
        email: None,
        timestamps: Timestamps::default(),
        session_note: None,
    }
}

pub fn user_row(id: i64, name: &str) -> Row {
    let mut row = Row::new();
    row.insert("id", id);
    row.insert("uuid", format!("uuid-{}", id));
    row.insert("display_name", name);
    row
}

pub fn total_row(total: i64) -> Row {
    let mut row = Row::new();
    row.insert("total", total);
    row
}

/// One statement as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub statement: Statement,
    pub in_transaction: bool,
}

#[derive(Default)]
struct Inner {
    log: Mutex<Vec<Recorded>>,
    rows: Mutex<VecDeque<Vec<Row>>>,
    affected: Mutex<VecDeque<u64>>,
    outcomes: Mutex<Vec<&'static str>>,
}

impl Inner {
    fn execute(&self, statement: &Statement, in_transaction: bool) -> ExecResult {
        self.log.lock().push(Recorded {
            statement: statement.clone(),
            in_transaction,
        });
        ExecResult::affected(self.affected.lock().pop_front().unwrap_or(1))
    }

    fn query(&self, statement: &Statement, in_transaction: bool) -> Vec<Row> {
        self.log.lock().push(Recorded {
            statement: statement.clone(),
            in_transaction,
        });
        self.rows.lock().pop_front().unwrap_or_default()
    }
}

/// Store that never touches a database.
///
/// `execute` reports the next scripted affected-row count (1 when none is
/// queued); queries return the next scripted row set (empty when none is
/// queued).
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: Arc<Inner>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.inner.rows.lock().push_back(rows);
    }

    pub fn push_affected(&self, rows_affected: u64) {
        self.inner.affected.lock().push_back(rows_affected);
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.inner.log.lock().clone()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.recorded().into_iter().map(|r| r.statement).collect()
    }

    pub fn last(&self) -> Option<Statement> {
        self.statements().pop()
    }

    pub fn outcomes(&self) -> Vec<&'static str> {
        self.inner.outcomes.lock().clone()
    }

    pub fn clear(&self) {
        self.inner.log.lock().clear();
    }
}

#[async_trait]
impl Store for RecordingStore {
    type Transaction = RecordingTransaction;

    async fn execute(&self, statement: &Statement) -> Result<ExecResult, StorageError> {
        Ok(self.inner.execute(statement, false))
    }

    async fn query_one<R: Record>(
        &self,
        statement: &Statement,
    ) -> Result<Option<R>, StorageError> {
        self.inner
            .query(statement, false)
            .first()
            .map(R::from_row)
            .transpose()
    }

    async fn query_many<R: Record>(&self, statement: &Statement) -> Result<Vec<R>, StorageError> {
        self.inner
            .query(statement, false)
            .iter()
            .map(R::from_row)
            .collect()
    }

    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError> {
        Ok(RecordingTransaction {
            inner: Arc::clone(&self.inner),
        })
    }
}

pub struct RecordingTransaction {
    inner: Arc<Inner>,
}

#[async_trait]
impl TransactionStore for RecordingTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecResult, StorageError> {
        Ok(self.inner.execute(statement, true))
    }

    async fn query_one<R: Record>(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<R>, StorageError> {
        self.inner
            .query(statement, true)
            .first()
            .map(R::from_row)
            .transpose()
    }

    async fn query_many<R: Record>(
        &mut self,
        statement: &Statement,
    ) -> Result<Vec<R>, StorageError> {
        self.inner
            .query(statement, true)
            .iter()
            .map(R::from_row)
            .collect()
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.inner.outcomes.lock().push("commit");
        Ok(())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.inner.outcomes.lock().push("rollback");
        Ok(())
    }
}

/// Store whose every call fails, for error propagation tests.
pub struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    type Transaction = RecordingTransaction;

    async fn execute(&self, _statement: &Statement) -> Result<ExecResult, StorageError> {
        Err(StorageError::Store("connection reset".to_string()))
    }

    async fn query_one<R: Record>(
        &self,
        _statement: &Statement,
    ) -> Result<Option<R>, StorageError> {
        Err(StorageError::Store("connection reset".to_string()))
    }

    async fn query_many<R: Record>(
        &self,
        _statement: &Statement,
    ) -> Result<Vec<R>, StorageError> {
        Err(StorageError::Store("connection reset".to_string()))
    }

    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError> {
        Err(StorageError::Store("connection reset".to_string()))
    }
}

pub fn param<'a>(statement: &'a Statement, name: &str) -> Option<&'a Value> {
    statement.params.get(name)
}
