//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use auditable_storage::{
    ConnectionConfig, ExecResult, Record, Statement, StorageError, Store, StoreConnection,
    TransactionStore,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Postgres, Transaction};
use std::ops::Deref;

use crate::bind::prepare;
use crate::row::extract_row;

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

fn store_error(context: &'static str, statement: &Statement, e: sqlx::Error) -> StorageError {
    tracing::error!(sql = %statement.sql, error = %e, "{}", context);
    match e {
        sqlx::Error::RowNotFound => StorageError::NotFound(statement.sql.clone()),
        e => StorageError::Store(e.to_string()),
    }
}

fn decode<R: Record>(row: &PgRow) -> Result<R, StorageError> {
    R::from_row(&extract_row(row)?)
}

/// Wrapper around sqlx::PgPool that implements [`Store`].
#[derive(Clone, Debug)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self(pool)
    }

    pub fn inner(&self) -> &sqlx::PgPool {
        &self.0
    }
}

impl Deref for PgPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl StoreConnection for PgPool {
    async fn connect(config: impl Into<ConnectionConfig> + Send) -> Result<Self, StorageError> {
        let url = config.into().to_url();
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(&url)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "cannot connect to postgres");
                StorageError::Store(e.to_string())
            })?;
        Ok(Self(pool))
    }
}

#[async_trait]
impl Store for PgPool {
    type Transaction = PgTransaction;

    async fn execute(&self, statement: &Statement) -> Result<ExecResult, StorageError> {
        let (sql, args) = prepare(&statement.sql, &statement.params)?;
        let result = sqlx::query_with(&sql, args)
            .execute(&self.0)
            .await
            .map_err(|e| store_error("execute failed", statement, e))?;
        Ok(ExecResult::affected(result.rows_affected()))
    }

    async fn query_one<R: Record>(
        &self,
        statement: &Statement,
    ) -> Result<Option<R>, StorageError> {
        let (sql, args) = prepare(&statement.sql, &statement.params)?;
        let row = sqlx::query_with(&sql, args)
            .fetch_optional(&self.0)
            .await
            .map_err(|e| store_error("query one failed", statement, e))?;
        row.as_ref().map(decode::<R>).transpose()
    }

    async fn query_many<R: Record>(&self, statement: &Statement) -> Result<Vec<R>, StorageError> {
        let (sql, args) = prepare(&statement.sql, &statement.params)?;
        let rows = sqlx::query_with(&sql, args)
            .fetch_all(&self.0)
            .await
            .map_err(|e| store_error("query many failed", statement, e))?;
        rows.iter().map(decode::<R>).collect()
    }

    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError> {
        let tx = self.0.begin().await.map_err(|e| {
            tracing::error!(error = %e, "cannot begin transaction");
            StorageError::Store(e.to_string())
        })?;
        tracing::debug!("transaction started");
        Ok(PgTransaction { tx })
    }
}

/// PostgreSQL transaction wrapper implementing [`TransactionStore`].
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionStore for PgTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecResult, StorageError> {
        let (sql, args) = prepare(&statement.sql, &statement.params)?;
        let result = sqlx::query_with(&sql, args)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error("execute in transaction failed", statement, e))?;
        Ok(ExecResult::affected(result.rows_affected()))
    }

    async fn query_one<R: Record>(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<R>, StorageError> {
        let (sql, args) = prepare(&statement.sql, &statement.params)?;
        let row = sqlx::query_with(&sql, args)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| store_error("query one in transaction failed", statement, e))?;
        row.as_ref().map(decode::<R>).transpose()
    }

    async fn query_many<R: Record>(
        &mut self,
        statement: &Statement,
    ) -> Result<Vec<R>, StorageError> {
        let (sql, args) = prepare(&statement.sql, &statement.params)?;
        let rows = sqlx::query_with(&sql, args)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| store_error("query many in transaction failed", statement, e))?;
        rows.iter().map(decode::<R>).collect()
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "commit failed");
            StorageError::Store(e.to_string())
        })?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.tx.rollback().await.map_err(|e| {
            tracing::error!(error = %e, "rollback failed");
            StorageError::Store(e.to_string())
        })?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}
