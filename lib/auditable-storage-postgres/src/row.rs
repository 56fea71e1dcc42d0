//! PostgreSQL rows to core [`Row`]s.

use auditable_storage::{ColumnType, Row, StorageDatetime, StorageError, Value};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Row as _, TypeInfo};

/// How a column is read, by its PostgreSQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Timestamptz,
    Timestamp,
    Date,
    Uuid,
    Json,
    TextArray,
    Text,
    /// No lossless mapping onto a core value.
    Unsupported,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "BOOL" => ColumnKind::Bool,
        "INT2" => ColumnKind::Int2,
        "INT4" => ColumnKind::Int4,
        "INT8" => ColumnKind::Int8,
        "FLOAT4" => ColumnKind::Float4,
        "FLOAT8" => ColumnKind::Float8,
        "TIMESTAMPTZ" => ColumnKind::Timestamptz,
        "TIMESTAMP" => ColumnKind::Timestamp,
        "DATE" => ColumnKind::Date,
        "UUID" => ColumnKind::Uuid,
        "JSON" | "JSONB" => ColumnKind::Json,
        "TEXT[]" | "VARCHAR[]" => ColumnKind::TextArray,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "CITEXT" => ColumnKind::Text,
        _ => ColumnKind::Unsupported,
    }
}

fn decode_error(e: sqlx::Error) -> StorageError {
    StorageError::Store(e.to_string())
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, StorageError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(idx).map_err(decode_error)
}

/// Read one column by index, mapping SQL NULL to a typed null.
fn extract_column(row: &PgRow, column: &PgColumn) -> Result<Value, StorageError> {
    let idx = column.ordinal();
    let type_name = column.type_info().name();
    let value = match column_kind(type_name) {
        ColumnKind::Bool => get::<bool>(row, idx)?
            .map_or(Value::Null(ColumnType::Boolean), Value::Bool),
        ColumnKind::Int2 => get::<i16>(row, idx)?
            .map_or(Value::Null(ColumnType::Integer), |n| Value::Int(i64::from(n))),
        ColumnKind::Int4 => get::<i32>(row, idx)?
            .map_or(Value::Null(ColumnType::Integer), |n| Value::Int(i64::from(n))),
        ColumnKind::Int8 => get::<i64>(row, idx)?
            .map_or(Value::Null(ColumnType::BigInt), Value::Int),
        ColumnKind::Float4 => get::<f32>(row, idx)?
            .map_or(Value::Null(ColumnType::Double), |n| Value::Float(f64::from(n))),
        ColumnKind::Float8 => get::<f64>(row, idx)?
            .map_or(Value::Null(ColumnType::Double), Value::Float),
        ColumnKind::Timestamptz => get::<chrono::DateTime<chrono::Utc>>(row, idx)?
            .map_or(Value::Null(ColumnType::Datetime), |dt| {
                Value::Datetime(StorageDatetime::from(dt))
            }),
        ColumnKind::Timestamp => get::<chrono::NaiveDateTime>(row, idx)?
            .map_or(Value::Null(ColumnType::Datetime), |dt| {
                Value::Datetime(StorageDatetime::from(dt.and_utc()))
            }),
        ColumnKind::Date => get::<chrono::NaiveDate>(row, idx)?
            .map_or(Value::Null(ColumnType::Text), |d| Value::String(d.to_string())),
        ColumnKind::Uuid => get::<uuid::Uuid>(row, idx)?
            .map_or(Value::Null(ColumnType::Text), |u| Value::String(u.to_string())),
        ColumnKind::Json => get::<serde_json::Value>(row, idx)?
            .map_or(Value::Null(ColumnType::Json), Value::Json),
        ColumnKind::TextArray => get::<Vec<String>>(row, idx)?
            .map_or(Value::Null(ColumnType::TextArray), Value::Strings),
        ColumnKind::Text => get::<String>(row, idx)?
            .map_or(Value::Null(ColumnType::Text), Value::String),
        ColumnKind::Unsupported => {
            return Err(StorageError::UnsupportedColumnType {
                column: column.name().to_string(),
                type_name: type_name.to_string(),
            });
        }
    };
    Ok(value)
}

/// Every column of a row, keyed by column name.
pub fn extract_row(row: &PgRow) -> Result<Row, StorageError> {
    let mut out = Row::new();
    for column in row.columns() {
        let value = extract_column(row, column)?;
        out.insert(column.name(), value);
    }
    Ok(out)
}
