//! Append-only audit trail.
//!
//! An [`AuditRecorder`] turns a mutation (or a view) into an [`AuditEntry`]
//! and inserts it. Entries are fully formed when prepared: id, timestamp and
//! service identity are stamped once and never changed afterwards.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::{
    AuditConfig, FromValue, IdGenerator, Key, Mode, Record, Statement, Store, StorageDatetime,
    StorageError, TableDescriptor, TransactionStore, Value, statement,
};

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    SoftDelete,
    UnsoftDelete,
    View,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::SoftDelete => "softdelete",
            Operation::UnsoftDelete => "unsoftdelete",
            Operation::View => "view",
        }
    }

    /// Whether entries of this kind store a serialized change.
    pub fn carries_payload(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Delete
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            "softdelete" => Ok(Operation::SoftDelete),
            "unsoftdelete" => Ok(Operation::UnsoftDelete),
            "view" => Ok(Operation::View),
            other => Err(StorageError::Validation(format!(
                "unknown audit operation {}",
                other
            ))),
        }
    }
}

impl From<Operation> for Value {
    fn from(operation: Operation) -> Self {
        Value::String(operation.as_str().to_string())
    }
}

impl FromValue for Operation {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::String(s) => s.parse(),
            _ => Err(StorageError::Decode {
                column: column.to_string(),
                expected: "operation text",
            }),
        }
    }
}

/// Who performed the audited action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub token_id: String,
}

impl Actor {
    pub fn new(id: i64, token_id: impl Into<String>) -> Self {
        Self {
            id,
            token_id: token_id.into(),
        }
    }
}

/// One row of the audit table.
#[derive(Debug, Clone, PartialEq, Serialize, crate::Record)]
pub struct AuditEntry {
    pub id: String,
    pub operation: Operation,
    pub module_name: String,
    pub table_name: String,
    pub table_key: String,
    /// Serialized payload; `None` for operations without one.
    pub change: Option<String>,
    pub remark: String,
    pub service_ip: String,
    pub token_id: String,
    pub created_by: i64,
    pub created_at: StorageDatetime,
}

/// Builds and persists [`AuditEntry`] rows.
pub struct AuditRecorder {
    service_identity: String,
    ids: Arc<IdGenerator>,
    table: TableDescriptor,
    mode: Mode,
}

impl AuditRecorder {
    pub fn new(config: AuditConfig) -> Result<Self, StorageError> {
        let ids = Arc::new(IdGenerator::new(config.start_time, config.machine_id)?);
        Ok(Self::with_generator(config, ids))
    }

    /// Share an existing generator, e.g. with other recorders in the process.
    pub fn with_generator(config: AuditConfig, ids: Arc<IdGenerator>) -> Self {
        Self {
            service_identity: config.service_identity,
            ids,
            table: TableDescriptor::for_record::<AuditEntry>(config.table),
            // id and created_at are supplied by the recorder itself.
            mode: Mode::skip(["updated_at", "deleted_at"]).with_auto_timestamp(true),
        }
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Build a complete entry. `change` is dropped for operations without a payload.
    pub fn prepare(
        &self,
        operation: Operation,
        table: &TableDescriptor,
        change: Option<String>,
        key: Key,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        Ok(AuditEntry {
            id: self.ids.next_string()?,
            operation,
            module_name: table.module().to_string(),
            table_name: table.name().to_string(),
            table_key: key.to_string(),
            change: change.filter(|_| operation.carries_payload()),
            remark: remark.to_string(),
            service_ip: self.service_identity.clone(),
            token_id: actor.token_id.clone(),
            created_by: actor.id,
            created_at: StorageDatetime::now(),
        })
    }

    fn prepare_with<P: Serialize + ?Sized>(
        &self,
        operation: Operation,
        table: &TableDescriptor,
        payload: &P,
        key: Key,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let change = serde_json::to_string(payload)?;
        self.prepare(operation, table, Some(change), key, actor, remark)
    }

    pub fn prepare_create<P: Serialize + ?Sized>(
        &self,
        table: &TableDescriptor,
        payload: &P,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        self.prepare_with(Operation::Create, table, payload, key.into(), actor, remark)
    }

    /// `payload` is normally the [`Diff`](crate::Diff) returned by the update.
    pub fn prepare_update<P: Serialize + ?Sized>(
        &self,
        table: &TableDescriptor,
        payload: &P,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        self.prepare_with(Operation::Update, table, payload, key.into(), actor, remark)
    }

    pub fn prepare_delete<P: Serialize + ?Sized>(
        &self,
        table: &TableDescriptor,
        payload: &P,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        self.prepare_with(Operation::Delete, table, payload, key.into(), actor, remark)
    }

    pub fn prepare_soft_delete(
        &self,
        table: &TableDescriptor,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        self.prepare(Operation::SoftDelete, table, None, key.into(), actor, remark)
    }

    pub fn prepare_unsoft_delete(
        &self,
        table: &TableDescriptor,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        self.prepare(Operation::UnsoftDelete, table, None, key.into(), actor, remark)
    }

    pub fn prepare_view(
        &self,
        table: &TableDescriptor,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        self.prepare(Operation::View, table, None, key.into(), actor, remark)
    }

    /// INSERT for an entry.
    pub fn persist_statement(&self, entry: &AuditEntry) -> Statement {
        statement::build_insert(self.table.name(), entry, &self.mode)
    }

    /// Insert an entry. Store failures are returned as-is, never retried.
    pub async fn persist<S: Store>(&self, store: &S, entry: &AuditEntry) -> Result<(), StorageError> {
        store.execute(&self.persist_statement(entry)).await?;
        tracing::debug!(
            id = %entry.id,
            operation = %entry.operation,
            table = %entry.table_name,
            key = %entry.table_key,
            "audit entry persisted"
        );
        Ok(())
    }

    pub async fn persist_tx<T: TransactionStore>(
        &self,
        tx: &mut T,
        entry: &AuditEntry,
    ) -> Result<(), StorageError> {
        tx.execute(&self.persist_statement(entry)).await?;
        tracing::debug!(
            id = %entry.id,
            operation = %entry.operation,
            table = %entry.table_name,
            key = %entry.table_key,
            "audit entry persisted in transaction"
        );
        Ok(())
    }

    /// Prepare and persist in one call, returning the stored entry.
    #[allow(clippy::too_many_arguments)]
    pub async fn record<S: Store>(
        &self,
        store: &S,
        operation: Operation,
        table: &TableDescriptor,
        change: Option<String>,
        key: Key,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare(operation, table, change, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }

    pub async fn log_create<S: Store, P: Serialize + ?Sized>(
        &self,
        store: &S,
        table: &TableDescriptor,
        payload: &P,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare_create(table, payload, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }

    pub async fn log_update<S: Store, P: Serialize + ?Sized>(
        &self,
        store: &S,
        table: &TableDescriptor,
        payload: &P,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare_update(table, payload, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }

    pub async fn log_delete<S: Store, P: Serialize + ?Sized>(
        &self,
        store: &S,
        table: &TableDescriptor,
        payload: &P,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare_delete(table, payload, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }

    pub async fn log_soft_delete<S: Store>(
        &self,
        store: &S,
        table: &TableDescriptor,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare_soft_delete(table, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }

    pub async fn log_unsoft_delete<S: Store>(
        &self,
        store: &S,
        table: &TableDescriptor,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare_unsoft_delete(table, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }

    pub async fn log_view<S: Store>(
        &self,
        store: &S,
        table: &TableDescriptor,
        key: impl Into<Key>,
        actor: &Actor,
        remark: &str,
    ) -> Result<AuditEntry, StorageError> {
        let entry = self.prepare_view(table, key, actor, remark)?;
        self.persist(store, &entry).await?;
        Ok(entry)
    }
}

/// Resolve a record's key column, e.g. `id`, into a [`Key`].
pub fn record_key<R: Record>(record: &R, column: &str) -> Result<Key, StorageError> {
    let value = record
        .column_value(column)
        .ok_or_else(|| StorageError::UnsupportedKey(format!("no column {}", column)))?;
    Key::try_from(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> AuditRecorder {
        AuditRecorder::new(AuditConfig::new("api-01:8080")).unwrap()
    }

    fn users() -> TableDescriptor {
        TableDescriptor::new("users").with_module("accounts")
    }

    #[test]
    fn operation_tags() {
        let tags: Vec<_> = [
            Operation::Create,
            Operation::Update,
            Operation::Delete,
            Operation::SoftDelete,
            Operation::UnsoftDelete,
            Operation::View,
        ]
        .iter()
        .map(Operation::as_str)
        .collect();
        assert_eq!(
            tags,
            vec!["create", "update", "delete", "softdelete", "unsoftdelete", "view"]
        );
        assert_eq!("softdelete".parse::<Operation>().unwrap(), Operation::SoftDelete);
    }

    #[test]
    fn update_entry_carries_serialized_payload() {
        let actor = Actor::new(42, "tok-1");
        let entry = recorder()
            .prepare_update(&users(), &json!({"name": {"o": "A", "n": "B"}}), 7i64, &actor, "rename")
            .unwrap();

        assert_eq!(entry.operation, Operation::Update);
        assert_eq!(entry.table_key, "7");
        assert_eq!(entry.table_name, "users");
        assert_eq!(entry.module_name, "accounts");
        assert_eq!(entry.change.as_deref(), Some(r#"{"name":{"o":"A","n":"B"}}"#));
        assert_eq!(entry.service_ip, "api-01:8080");
        assert_eq!(entry.created_by, 42);
        assert_eq!(entry.token_id, "tok-1");
        assert!(entry.id.parse::<u64>().is_ok());
    }

    #[test]
    fn payload_free_operations_drop_change() {
        let recorder = recorder();
        let entry = recorder
            .prepare(
                Operation::View,
                &users(),
                Some("{}".to_string()),
                Key::from("abc"),
                &Actor::default(),
                "",
            )
            .unwrap();
        assert_eq!(entry.change, None);
        assert_eq!(entry.table_key, "abc");
    }

    #[test]
    fn persist_statement_includes_id_and_created_at() {
        let recorder = recorder();
        let entry = recorder
            .prepare_soft_delete(&users(), 9i64, &Actor::default(), "")
            .unwrap();
        let stmt = recorder.persist_statement(&entry);

        assert_eq!(
            stmt.sql,
            "INSERT INTO audit_trail (id, operation, module_name, table_name, table_key, change, remark, service_ip, token_id, created_by, created_at) VALUES (:id, :operation, :module_name, :table_name, :table_key, :change, :remark, :service_ip, :token_id, :created_by, :created_at)"
        );
        assert_eq!(stmt.params["operation"], Value::from("softdelete"));
        assert!(stmt.params["change"].is_null());
    }

    #[test]
    fn entry_ids_are_unique() {
        let recorder = recorder();
        let a = recorder.prepare_view(&users(), 1i64, &Actor::default(), "").unwrap();
        let b = recorder.prepare_view(&users(), 1i64, &Actor::default(), "").unwrap();
        assert_ne!(a.id, b.id);
    }
}
