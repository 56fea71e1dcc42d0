//! INSERT/UPDATE/SELECT construction with field-level diffing.
//!
//! Builders are pure: they return statement text plus named parameters and
//! never touch the store, so callers can inspect or compose them before
//! executing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Clause, Mode, Params, Record, StorageDatetime, Value};

/// A complete statement with `:name` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Append `RETURNING <fields>`.
    pub fn returning(mut self, fields: &str) -> Self {
        self.sql = format!("{} RETURNING {}", self.sql, fields);
        self
    }
}

/// Old/new pair for one changed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub o: Value,
    pub n: Value,
}

/// Changed columns of an update, keyed by column name.
pub type Diff = BTreeMap<String, Change>;

/// An UPDATE statement and the diff it applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateStatement {
    pub statement: Statement,
    pub diff: Diff,
    /// Whether the SET clause carries a builder-stamped `updated_at`.
    pub stamped: bool,
}

impl UpdateStatement {
    /// True when the SET clause would be empty and the statement must not run.
    pub fn is_empty(&self) -> bool {
        self.diff.is_empty() && !self.stamped
    }
}

/// Value equality for diffing. Floats compare by bit pattern so an unchanged NaN stays unchanged.
fn unchanged(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
        _ => old == new,
    }
}

fn where_one(condition: &Clause) -> String {
    let condition = condition.sql.trim();
    if condition.is_empty() {
        "WHERE 1=1".to_string()
    } else {
        format!("WHERE 1=1 {}", condition)
    }
}

/// Build an INSERT for the participating columns of `record`.
pub fn build_insert<R: Record>(table: &str, record: &R, mode: &Mode) -> Statement {
    build_insert_at(table, record, mode, StorageDatetime::now())
}

/// [`build_insert`] with an explicit timestamp for builder-stamped columns.
pub fn build_insert_at<R: Record>(
    table: &str,
    record: &R,
    mode: &Mode,
    now: StorageDatetime,
) -> Statement {
    let mut columns = Vec::new();
    let mut params = Params::new();

    for (column, value) in record.to_columns() {
        if !mode.participates(column) {
            continue;
        }
        columns.push(column.to_string());
        params.insert(column.to_string(), value);
    }

    if mode.stamps_timestamps() {
        for column in ["created_at", "updated_at"] {
            columns.push(column.to_string());
            params.insert(column.to_string(), Value::Datetime(now));
        }
    }

    let placeholders: Vec<String> = columns.iter().map(|c| format!(":{}", c)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );

    tracing::debug!(table, sql = %sql, param_count = params.len(), "built insert");
    Statement { sql, params }
}

/// Build an UPDATE touching only the participating columns whose value changed.
///
/// `condition` is appended verbatim after `WHERE 1=1` and its parameters are
/// merged in; scoping it correctly is the caller's job.
pub fn build_update<R: Record>(
    table: &str,
    old: &R,
    new: &R,
    mode: &Mode,
    condition: &Clause,
) -> UpdateStatement {
    build_update_at(table, old, new, mode, condition, StorageDatetime::now())
}

/// [`build_update`] with an explicit timestamp for a builder-stamped `updated_at`.
pub fn build_update_at<R: Record>(
    table: &str,
    old: &R,
    new: &R,
    mode: &Mode,
    condition: &Clause,
    now: StorageDatetime,
) -> UpdateStatement {
    let mut new_values: BTreeMap<&'static str, Value> = new.to_columns().into_iter().collect();
    let mut assignments = Vec::new();
    let mut params = Params::new();
    let mut diff = Diff::new();

    for (column, old_value) in old.to_columns() {
        if !mode.participates(column) {
            continue;
        }
        let Some(new_value) = new_values.remove(column) else {
            continue;
        };
        if unchanged(&old_value, &new_value) {
            continue;
        }

        assignments.push(format!("{} = :{}", column, column));
        params.insert(column.to_string(), new_value.clone());
        diff.insert(
            column.to_string(),
            Change {
                o: old_value,
                n: new_value,
            },
        );
    }

    let stamped = mode.stamps_timestamps();
    if stamped {
        assignments.push("updated_at = :updated_at".to_string());
        params.insert("updated_at".to_string(), Value::Datetime(now));
    }

    params.extend(condition.params.clone());
    let sql = format!(
        "UPDATE {} SET {} {}",
        table,
        assignments.join(", "),
        where_one(condition)
    );

    tracing::debug!(
        table,
        sql = %sql,
        param_count = params.len(),
        changed = diff.len(),
        "built update"
    );
    UpdateStatement {
        statement: Statement { sql, params },
        diff,
        stamped,
    }
}

/// `SELECT <fields> FROM <table> WHERE 1=1 <condition> <tail>`.
pub fn build_select(table: &str, fields: &str, condition: &Clause, tail: &Clause) -> Statement {
    let mut sql = format!("SELECT {} FROM {} {}", fields, table, where_one(condition));
    if !tail.is_empty() {
        sql = format!("{} {}", sql, tail.sql.trim());
    }
    let mut params = condition.params.clone();
    params.extend(tail.params.clone());

    tracing::debug!(table, sql = %sql, param_count = params.len(), "built select");
    Statement { sql, params }
}

/// `SELECT COUNT(<column>) AS total FROM <table> WHERE 1=1 <condition>`.
pub fn build_count(table: &str, column: &str, condition: &Clause) -> Statement {
    let sql = format!(
        "SELECT COUNT({}) AS total FROM {} {}",
        column,
        table,
        where_one(condition)
    );
    Statement {
        sql,
        params: condition.params.clone(),
    }
}
