//! Delete and restore statements.
//!
//! A soft-delete table moves rows between two states through the nullable
//! `deleted_at` column:
//!
//! ```text
//! active (deleted_at IS NULL)  --soft delete-->  soft-deleted (deleted_at set)
//!                              <---restore-----
//! ```
//!
//! Each transition is guarded by the predicate of its source state, so
//! applying it to a row in the wrong state matches nothing.

use crate::{Clause, Statement, StorageDatetime, TableDescriptor, Value, Visibility};

fn scoped(condition: &Clause, guard: Visibility) -> String {
    let guard = guard.predicate(true);
    let mut parts = vec!["WHERE 1=1".to_string()];
    for sql in [condition.sql.trim(), guard.sql.trim()] {
        if !sql.is_empty() {
            parts.push(sql.to_string());
        }
    }
    parts.join(" ")
}

/// Active to soft-deleted: set `deleted_at` and bump `updated_at`.
pub fn build_soft_delete(table: &str, condition: &Clause) -> Statement {
    build_soft_delete_at(table, condition, StorageDatetime::now())
}

pub fn build_soft_delete_at(table: &str, condition: &Clause, now: StorageDatetime) -> Statement {
    let sql = format!(
        "UPDATE {} SET updated_at = :updated_at, deleted_at = :deleted_at {}",
        table,
        scoped(condition, Visibility::Active)
    );
    let mut params = condition.params.clone();
    params.insert("updated_at".to_string(), Value::Datetime(now));
    params.insert("deleted_at".to_string(), Value::Datetime(now));

    tracing::debug!(table, sql = %sql, "built soft delete");
    Statement::new(sql, params)
}

/// Soft-deleted to active: clear `deleted_at` and bump `updated_at`.
pub fn build_restore(table: &str, condition: &Clause) -> Statement {
    build_restore_at(table, condition, StorageDatetime::now())
}

pub fn build_restore_at(table: &str, condition: &Clause, now: StorageDatetime) -> Statement {
    let sql = format!(
        "UPDATE {} SET updated_at = :updated_at, deleted_at = NULL {}",
        table,
        scoped(condition, Visibility::SoftDeleted)
    );
    let mut params = condition.params.clone();
    params.insert("updated_at".to_string(), Value::Datetime(now));

    tracing::debug!(table, sql = %sql, "built restore");
    Statement::new(sql, params)
}

/// Irreversible row removal.
pub fn build_hard_delete(table: &str, condition: &Clause) -> Statement {
    let condition_sql = condition.sql.trim();
    let sql = if condition_sql.is_empty() {
        format!("DELETE FROM {} WHERE 1=1", table)
    } else {
        format!("DELETE FROM {} WHERE 1=1 {}", table, condition_sql)
    };

    tracing::debug!(table, sql = %sql, "built hard delete");
    Statement::new(sql, condition.params.clone())
}

/// Soft delete when the table supports it, hard delete otherwise.
pub fn build_delete(table: &TableDescriptor, condition: &Clause) -> Statement {
    if table.soft_delete() {
        build_soft_delete(table.name(), condition)
    } else {
        build_hard_delete(table.name(), condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> StorageDatetime {
        StorageDatetime::from_ymd_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn soft_delete_requires_active_row() {
        let stmt = build_soft_delete_at("users", &Clause::by_id(7i64), noon());
        assert_eq!(
            stmt.sql,
            "UPDATE users SET updated_at = :updated_at, deleted_at = :deleted_at WHERE 1=1 AND id = :id AND deleted_at IS NULL"
        );
        assert_eq!(stmt.params["id"], Value::Int(7));
        assert_eq!(stmt.params["deleted_at"], Value::Datetime(noon()));
    }

    #[test]
    fn restore_requires_soft_deleted_row() {
        let stmt = build_restore_at("users", &Clause::by_id(7i64), noon());
        assert_eq!(
            stmt.sql,
            "UPDATE users SET updated_at = :updated_at, deleted_at = NULL WHERE 1=1 AND id = :id AND deleted_at IS NOT NULL"
        );
        assert!(!stmt.params.contains_key("deleted_at"));
    }

    #[test]
    fn delete_dispatches_on_table_flag() {
        let soft = TableDescriptor::new("users").with_soft_delete(true);
        let hard = TableDescriptor::new("logs");

        assert!(build_delete(&soft, &Clause::by_id(1i64)).sql.starts_with("UPDATE users"));
        assert_eq!(
            build_delete(&hard, &Clause::by_id(1i64)).sql,
            "DELETE FROM logs WHERE 1=1 AND id = :id"
        );
    }
}
