//! Named-parameter rewriting and value binding.
//!
//! Statements from the core use `:name` placeholders. PostgreSQL wants `$n`,
//! so placeholders are renumbered in order of first appearance and the
//! referenced values are bound in that order. A name used twice shares one
//! position.

use auditable_storage::{ColumnType, Params, StorageError, Value};
use sqlx::Arguments;
use sqlx::postgres::PgArguments;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite `:name` placeholders to `$n` and collect the values in binding order.
///
/// `::type` casts and text inside single quotes are left alone. A placeholder
/// without a matching parameter is an error.
pub fn rewrite_named<'p>(
    sql: &str,
    params: &'p Params,
) -> Result<(String, Vec<&'p Value>), StorageError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut in_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            in_quote = !in_quote;
            out.push(c);
            i += 1;
            continue;
        }

        if !in_quote && c == ':' {
            if chars.get(i + 1) == Some(&':') {
                out.push_str("::");
                i += 2;
                continue;
            }

            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_name_char(chars[end]) {
                end += 1;
            }
            if end > start {
                let name: String = chars[start..end].iter().collect();
                let position = match names.iter().position(|n| *n == name) {
                    Some(idx) => idx + 1,
                    None => {
                        names.push(name);
                        names.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
                i = end;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }

    let values = names
        .iter()
        .map(|name| {
            params
                .get(name)
                .ok_or_else(|| StorageError::Validation(format!("missing parameter :{}", name)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((out, values))
}

fn bind_error(e: sqlx::error::BoxDynError) -> StorageError {
    StorageError::Store(e.to_string())
}

/// Bind one value. Nulls are bound with the SQL type of their column.
pub fn bind_value(args: &mut PgArguments, value: &Value) -> Result<(), StorageError> {
    match value {
        Value::String(s) => args.add(s.as_str()),
        Value::Int(n) => args.add(*n),
        Value::UInt(n) => {
            let n = i64::try_from(*n)
                .map_err(|_| StorageError::Validation(format!("{} does not fit BIGINT", n)))?;
            args.add(n)
        }
        Value::Float(n) => args.add(*n),
        Value::Bool(b) => args.add(*b),
        Value::Strings(v) => args.add(v.as_slice()),
        Value::Datetime(dt) => args.add(*dt.inner()),
        Value::Json(v) => args.add(v.clone()),
        Value::Null(column_type) => match column_type {
            ColumnType::Text => args.add(None::<String>),
            ColumnType::BigInt => args.add(None::<i64>),
            ColumnType::Integer => args.add(None::<i32>),
            ColumnType::Double => args.add(None::<f64>),
            ColumnType::Boolean => args.add(None::<bool>),
            ColumnType::Datetime => args.add(None::<chrono::DateTime<chrono::Utc>>),
            ColumnType::Json => args.add(None::<serde_json::Value>),
            ColumnType::TextArray => args.add(None::<Vec<String>>),
        },
    }
    .map_err(bind_error)
}

/// Rewrite a statement and bind its parameters.
pub fn prepare(sql: &str, params: &Params) -> Result<(String, PgArguments), StorageError> {
    let (sql, values) = rewrite_named(sql, params)?;
    let mut args = PgArguments::default();
    for value in values {
        bind_value(&mut args, value)?;
    }
    Ok((sql, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn placeholders_are_numbered_by_first_use() {
        let p = params(&[("name", Value::from("B")), ("id", Value::Int(7))]);
        let (sql, values) =
            rewrite_named("UPDATE t SET name = :name WHERE 1=1 AND id = :id", &p).unwrap();

        assert_eq!(sql, "UPDATE t SET name = $1 WHERE 1=1 AND id = $2");
        assert_eq!(values, vec![&Value::from("B"), &Value::Int(7)]);
    }

    #[test]
    fn repeated_names_share_a_position() {
        let p = params(&[("q", Value::from("%a%"))]);
        let (sql, values) = rewrite_named("WHERE a LIKE :q OR b LIKE :q", &p).unwrap();
        assert_eq!(sql, "WHERE a LIKE $1 OR b LIKE $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn casts_and_literals_are_untouched() {
        let p = params(&[("id", Value::Int(1))]);
        let (sql, _) =
            rewrite_named("SELECT ':skip', id::text FROM t WHERE id = :id::bigint", &p).unwrap();
        assert_eq!(sql, "SELECT ':skip', id::text FROM t WHERE id = $1::bigint");
    }

    #[test]
    fn missing_parameter_is_reported() {
        let err = rewrite_named("WHERE id = :id", &Params::new()).unwrap_err();
        assert!(err.to_string().contains(":id"));
    }

    #[test]
    fn binds_typed_nulls() {
        let p = params(&[
            ("a", Value::Null(ColumnType::Datetime)),
            ("b", Value::Null(ColumnType::BigInt)),
            ("c", Value::from(vec!["x".to_string()])),
        ]);
        let (sql, _args) = prepare("VALUES (:a, :b, :c)", &p).unwrap();
        assert_eq!(sql, "VALUES ($1, $2, $3)");
    }
}
