//! Table-scoped reads and writes.
//!
//! [`Repository`] pairs a [`TableDescriptor`] with a record type and exposes
//! each operation twice: once against a [`Store`] and once, with a `_tx`
//! suffix, against an open [`TransactionStore`]. Both forms go through the
//! same `*_statement` constructor, so the SQL and parameters they send are
//! identical for identical inputs.

use std::marker::PhantomData;

use crate::{
    AppMode, Clause, Condition, Diff, ExecResult, Joiner, Mode, PaginationRequest, Record,
    Statement, Store, StorageError, TableDescriptor, TransactionStore, Value, Visibility,
    soft_delete, statement,
};

/// `SELECT COUNT(..) AS total` result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, crate::Record)]
pub struct Total {
    pub total: i64,
}

/// One page of a list read.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Rows matching the condition, ignoring pagination.
    pub total: i64,
    pub items: Vec<R>,
}

/// Result of an update: the applied diff and how many rows it touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Updated {
    pub diff: Diff,
    pub rows_affected: u64,
}

impl Updated {
    pub fn found(&self) -> bool {
        self.rows_affected > 0
    }
}

/// Result of an update that reads the row back through `RETURNING`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedRow<R> {
    pub diff: Diff,
    /// `None` when nothing matched or nothing changed.
    pub row: Option<R>,
}

/// Operations on one table, decoding rows as `R`.
pub struct Repository<R> {
    table: TableDescriptor,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    pub fn new(table: TableDescriptor) -> Self {
        Self {
            table,
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    // ==================== Statements ====================

    /// SELECT of this table's fields, `condition` first, then the visibility guard.
    pub fn select_statement(&self, condition: &Clause, visibility: Visibility) -> Statement {
        let condition = condition.clone().and(self.table.visibility(visibility));
        statement::build_select(
            self.table.name(),
            &self.table.fields(),
            &condition,
            &Clause::default(),
        )
    }

    pub fn get_by_id_statement(&self, id: impl Into<Value>) -> Statement {
        self.select_statement(&Clause::by_id(id), Visibility::Active)
    }

    pub fn get_by_uuid_statement(&self, uuid: &str) -> Statement {
        self.select_statement(&Clause::by_field("uuid", uuid), Visibility::Active)
    }

    pub fn get_soft_deleted_by_id_statement(&self, id: impl Into<Value>) -> Statement {
        let condition = Clause::by_id(id).and(Visibility::SoftDeleted.predicate(true));
        statement::build_select(
            self.table.name(),
            &self.table.fields(),
            &condition,
            &Clause::default(),
        )
    }

    /// COUNT and page statements for [`Repository::list`].
    pub fn list_statements(
        &self,
        condition: &Clause,
        pagination: &PaginationRequest,
    ) -> Result<(Statement, Statement), StorageError> {
        pagination.validate()?;
        let condition = self.table.visibility(Visibility::Active).and(condition.clone());
        let count = statement::build_count(
            self.table.name(),
            &format!("{}.id", self.table.name()),
            &condition,
        );
        let page = statement::build_select(
            self.table.name(),
            &self.table.fields(),
            &condition,
            &pagination.build(),
        );
        Ok((count, page))
    }

    /// `SELECT COUNT(column) ... AND column IN (...)`, `None` for an empty list.
    pub fn validate_list_statement(
        &self,
        column: &str,
        values: &[Value],
        condition: &Clause,
    ) -> Option<Statement> {
        if values.is_empty() {
            return None;
        }
        let condition = Condition::new()
            .in_list(Joiner::And, column, "val", values.iter().cloned())
            .build()
            .and(condition.clone());
        Some(statement::build_count(self.table.name(), column, &condition))
    }

    pub fn create_statement(&self, record: &R, mode: &Mode) -> Statement {
        statement::build_insert(self.table.name(), record, mode)
    }

    pub fn create_returning_statement(&self, record: &R, mode: &Mode) -> Statement {
        self.create_statement(record, mode)
            .returning(&self.table.fields())
    }

    pub fn update_statement(
        &self,
        old: &R,
        new: &R,
        mode: &Mode,
        condition: &Clause,
    ) -> statement::UpdateStatement {
        statement::build_update(self.table.name(), old, new, mode, condition)
    }

    /// [`Repository::update_statement`] with `RETURNING <fields>`.
    pub fn update_returning_statement(
        &self,
        old: &R,
        new: &R,
        mode: &Mode,
        condition: &Clause,
    ) -> statement::UpdateStatement {
        let mut update = self.update_statement(old, new, mode, condition);
        update.statement = update.statement.returning(&self.table.fields());
        update
    }

    pub fn delete_statement(&self, condition: &Clause) -> Statement {
        soft_delete::build_delete(&self.table, condition)
    }

    pub fn hard_delete_statement(&self, condition: &Clause) -> Statement {
        soft_delete::build_hard_delete(self.table.name(), condition)
    }

    pub fn soft_delete_statement(&self, condition: &Clause) -> Statement {
        soft_delete::build_soft_delete(self.table.name(), condition)
    }

    pub fn restore_statement(&self, condition: &Clause) -> Statement {
        soft_delete::build_restore(self.table.name(), condition)
    }

    // ==================== Reads ====================

    pub async fn get_by_id<S: Store>(
        &self,
        store: &S,
        id: impl Into<Value>,
    ) -> Result<Option<R>, StorageError> {
        store.query_one(&self.get_by_id_statement(id)).await
    }

    pub async fn get_by_id_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        id: impl Into<Value>,
    ) -> Result<Option<R>, StorageError> {
        tx.query_one(&self.get_by_id_statement(id)).await
    }

    pub async fn get_by_uuid<S: Store>(
        &self,
        store: &S,
        uuid: &str,
    ) -> Result<Option<R>, StorageError> {
        store.query_one(&self.get_by_uuid_statement(uuid)).await
    }

    pub async fn get_by_uuid_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        uuid: &str,
    ) -> Result<Option<R>, StorageError> {
        tx.query_one(&self.get_by_uuid_statement(uuid)).await
    }

    pub async fn get_soft_deleted_by_id<S: Store>(
        &self,
        store: &S,
        id: impl Into<Value>,
    ) -> Result<Option<R>, StorageError> {
        store
            .query_one(&self.get_soft_deleted_by_id_statement(id))
            .await
    }

    pub async fn get_soft_deleted_by_id_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        id: impl Into<Value>,
    ) -> Result<Option<R>, StorageError> {
        tx.query_one(&self.get_soft_deleted_by_id_statement(id))
            .await
    }

    /// First row matching a caller-owned condition. No visibility guard is added.
    pub async fn get_by_field<S: Store>(
        &self,
        store: &S,
        condition: &Clause,
    ) -> Result<Option<R>, StorageError> {
        store
            .query_one(&self.select_statement(condition, Visibility::All))
            .await
    }

    pub async fn get_by_field_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        condition: &Clause,
    ) -> Result<Option<R>, StorageError> {
        tx.query_one(&self.select_statement(condition, Visibility::All))
            .await
    }

    /// Run a caller-built statement and decode every row.
    pub async fn select<S: Store>(
        &self,
        store: &S,
        statement: &Statement,
    ) -> Result<Vec<R>, StorageError> {
        store.query_many(statement).await
    }

    pub async fn select_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        statement: &Statement,
    ) -> Result<Vec<R>, StorageError> {
        tx.query_many(statement).await
    }

    /// Total matching rows plus the requested page of active rows.
    pub async fn list<S: Store>(
        &self,
        store: &S,
        condition: &Clause,
        pagination: &PaginationRequest,
    ) -> Result<Page<R>, StorageError> {
        let (count, page) = self.list_statements(condition, pagination)?;
        let total = store
            .query_one::<Total>(&count)
            .await?
            .map_or(0, |t| t.total);
        let items = store.query_many(&page).await?;
        Ok(Page { total, items })
    }

    pub async fn list_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        condition: &Clause,
        pagination: &PaginationRequest,
    ) -> Result<Page<R>, StorageError> {
        let (count, page) = self.list_statements(condition, pagination)?;
        let total = tx.query_one::<Total>(&count).await?.map_or(0, |t| t.total);
        let items = tx.query_many(&page).await?;
        Ok(Page { total, items })
    }

    /// True when every value in `values` exists in `column`.
    pub async fn validate_list<S: Store>(
        &self,
        store: &S,
        column: &str,
        values: &[Value],
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let Some(count) = self.validate_list_statement(column, values, condition) else {
            return Ok(true);
        };
        let total = store
            .query_one::<Total>(&count)
            .await?
            .map_or(0, |t| t.total);
        Ok(total == values.len() as i64)
    }

    pub async fn validate_list_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        column: &str,
        values: &[Value],
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let Some(count) = self.validate_list_statement(column, values, condition) else {
            return Ok(true);
        };
        let total = tx.query_one::<Total>(&count).await?.map_or(0, |t| t.total);
        Ok(total == values.len() as i64)
    }

    // ==================== Writes ====================

    pub async fn create<S: Store>(
        &self,
        store: &S,
        record: &R,
        mode: &Mode,
    ) -> Result<ExecResult, StorageError> {
        store.execute(&self.create_statement(record, mode)).await
    }

    pub async fn create_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        record: &R,
        mode: &Mode,
    ) -> Result<ExecResult, StorageError> {
        tx.execute(&self.create_statement(record, mode)).await
    }

    /// Insert and read the stored row back through `RETURNING`.
    pub async fn create_returning<S: Store>(
        &self,
        store: &S,
        record: &R,
        mode: &Mode,
    ) -> Result<Option<R>, StorageError> {
        store
            .query_one(&self.create_returning_statement(record, mode))
            .await
    }

    pub async fn create_returning_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        record: &R,
        mode: &Mode,
    ) -> Result<Option<R>, StorageError> {
        tx.query_one(&self.create_returning_statement(record, mode))
            .await
    }

    /// Update by primary key.
    pub async fn update<S: Store>(
        &self,
        store: &S,
        old: &R,
        new: &R,
        mode: &Mode,
        id: impl Into<Value>,
    ) -> Result<Updated, StorageError> {
        self.update_custom(store, old, new, mode, &Clause::by_id(id))
            .await
    }

    pub async fn update_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        old: &R,
        new: &R,
        mode: &Mode,
        id: impl Into<Value>,
    ) -> Result<Updated, StorageError> {
        self.update_custom_tx(tx, old, new, mode, &Clause::by_id(id))
            .await
    }

    /// Update rows matching `condition`. Nothing is sent when no column changed.
    pub async fn update_custom<S: Store>(
        &self,
        store: &S,
        old: &R,
        new: &R,
        mode: &Mode,
        condition: &Clause,
    ) -> Result<Updated, StorageError> {
        let update = self.update_statement(old, new, mode, condition);
        if update.is_empty() {
            tracing::debug!(table = self.table.name(), "update skipped, nothing changed");
            return Ok(Updated::default());
        }
        let result = store.execute(&update.statement).await?;
        Ok(Updated {
            diff: update.diff,
            rows_affected: result.rows_affected,
        })
    }

    pub async fn update_custom_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        old: &R,
        new: &R,
        mode: &Mode,
        condition: &Clause,
    ) -> Result<Updated, StorageError> {
        let update = self.update_statement(old, new, mode, condition);
        if update.is_empty() {
            tracing::debug!(table = self.table.name(), "update skipped, nothing changed");
            return Ok(Updated::default());
        }
        let result = tx.execute(&update.statement).await?;
        Ok(Updated {
            diff: update.diff,
            rows_affected: result.rows_affected,
        })
    }

    /// Update by primary key and read the stored row back.
    pub async fn update_returning<S: Store>(
        &self,
        store: &S,
        old: &R,
        new: &R,
        mode: &Mode,
        id: impl Into<Value>,
    ) -> Result<UpdatedRow<R>, StorageError> {
        self.update_custom_returning(store, old, new, mode, &Clause::by_id(id))
            .await
    }

    pub async fn update_returning_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        old: &R,
        new: &R,
        mode: &Mode,
        id: impl Into<Value>,
    ) -> Result<UpdatedRow<R>, StorageError> {
        self.update_custom_returning_tx(tx, old, new, mode, &Clause::by_id(id))
            .await
    }

    /// Update rows matching `condition` and read the first updated row back.
    /// Nothing is sent when no column changed.
    pub async fn update_custom_returning<S: Store>(
        &self,
        store: &S,
        old: &R,
        new: &R,
        mode: &Mode,
        condition: &Clause,
    ) -> Result<UpdatedRow<R>, StorageError> {
        let update = self.update_returning_statement(old, new, mode, condition);
        if update.is_empty() {
            tracing::debug!(table = self.table.name(), "update skipped, nothing changed");
            return Ok(UpdatedRow {
                diff: update.diff,
                row: None,
            });
        }
        let row = store.query_one(&update.statement).await?;
        Ok(UpdatedRow {
            diff: update.diff,
            row,
        })
    }

    pub async fn update_custom_returning_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        old: &R,
        new: &R,
        mode: &Mode,
        condition: &Clause,
    ) -> Result<UpdatedRow<R>, StorageError> {
        let update = self.update_returning_statement(old, new, mode, condition);
        if update.is_empty() {
            tracing::debug!(table = self.table.name(), "update skipped, nothing changed");
            return Ok(UpdatedRow {
                diff: update.diff,
                row: None,
            });
        }
        let row = tx.query_one(&update.statement).await?;
        Ok(UpdatedRow {
            diff: update.diff,
            row,
        })
    }

    /// Soft delete when the table supports it, hard delete otherwise.
    /// Returns whether a row matched.
    pub async fn delete<S: Store>(
        &self,
        store: &S,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        let result = store.execute(&self.delete_statement(&Clause::by_id(id))).await?;
        Ok(result.found())
    }

    pub async fn delete_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        let result = tx.execute(&self.delete_statement(&Clause::by_id(id))).await?;
        Ok(result.found())
    }

    pub async fn hard_delete<S: Store>(
        &self,
        store: &S,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        self.hard_delete_custom(store, &Clause::by_id(id)).await
    }

    pub async fn hard_delete_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        self.hard_delete_custom_tx(tx, &Clause::by_id(id)).await
    }

    pub async fn hard_delete_custom<S: Store>(
        &self,
        store: &S,
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let result = store.execute(&self.hard_delete_statement(condition)).await?;
        Ok(result.found())
    }

    pub async fn hard_delete_custom_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let result = tx.execute(&self.hard_delete_statement(condition)).await?;
        Ok(result.found())
    }

    /// Mark an active row deleted. An already deleted row is a no-op: `Ok(false)`.
    pub async fn soft_delete<S: Store>(
        &self,
        store: &S,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        self.soft_delete_custom(store, &Clause::by_id(id)).await
    }

    pub async fn soft_delete_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        self.soft_delete_custom_tx(tx, &Clause::by_id(id)).await
    }

    pub async fn soft_delete_custom<S: Store>(
        &self,
        store: &S,
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let result = store.execute(&self.soft_delete_statement(condition)).await?;
        Ok(result.found())
    }

    pub async fn soft_delete_custom_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let result = tx.execute(&self.soft_delete_statement(condition)).await?;
        Ok(result.found())
    }

    /// Clear the deletion marker. An active row is a no-op: `Ok(false)`.
    pub async fn restore<S: Store>(
        &self,
        store: &S,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        self.restore_custom(store, &Clause::by_id(id)).await
    }

    pub async fn restore_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        id: impl Into<Value>,
    ) -> Result<bool, StorageError> {
        self.restore_custom_tx(tx, &Clause::by_id(id)).await
    }

    pub async fn restore_custom<S: Store>(
        &self,
        store: &S,
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let result = store.execute(&self.restore_statement(condition)).await?;
        Ok(result.found())
    }

    pub async fn restore_custom_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        condition: &Clause,
    ) -> Result<bool, StorageError> {
        let result = tx.execute(&self.restore_statement(condition)).await?;
        Ok(result.found())
    }

    // ==================== UUIDs ====================

    /// A v4 UUID not yet present in the `uuid` column.
    pub async fn generate_uuid<S: Store>(
        &self,
        store: &S,
        mode: AppMode,
    ) -> Result<String, StorageError> {
        loop {
            let candidate = format!("{}{}", mode.uuid_prefix(), uuid::Uuid::new_v4());
            if self.get_by_uuid(store, &candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::debug!(table = self.table.name(), "uuid collision, regenerating");
        }
    }

    pub async fn generate_uuid_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        mode: AppMode,
    ) -> Result<String, StorageError> {
        loop {
            let candidate = format!("{}{}", mode.uuid_prefix(), uuid::Uuid::new_v4());
            if self.get_by_uuid_tx(tx, &candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::debug!(table = self.table.name(), "uuid collision, regenerating");
        }
    }
}
