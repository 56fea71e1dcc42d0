//! Parameter values, typed nulls and decoded rows.
//!
//! Every column value travelling between a record and the store is a [`Value`].
//! Statement builders collect them into [`Params`] keyed by placeholder name,
//! and stores hand query results back as [`Row`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::{StorageDatetime, StorageError};

/// Named statement parameters (`:name` → value).
pub type Params = BTreeMap<String, Value>;

/// Database-agnostic column type, used to bind nulls with the right SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    BigInt,
    Integer,
    Double,
    Boolean,
    Datetime,
    Json,
    TextArray,
}

/// A value that can be bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Strings(Vec<String>),
    Datetime(StorageDatetime),
    Json(serde_json::Value),
    Null(ColumnType),
}

impl Value {
    /// Whether this is the default value of its type.
    ///
    /// Empty strings and lists, numeric zero, `false`, JSON `null` and every
    /// null count as zero. Timestamps never do.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::Int(n) => *n == 0,
            Value::UInt(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            Value::Bool(b) => !*b,
            Value::Strings(v) => v.is_empty(),
            Value::Datetime(_) => false,
            Value::Json(j) => j.is_null(),
            Value::Null(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::Text,
            Value::Int(_) | Value::UInt(_) => ColumnType::BigInt,
            Value::Float(_) => ColumnType::Double,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Strings(_) => ColumnType::TextArray,
            Value::Datetime(_) => ColumnType::Datetime,
            Value::Json(_) => ColumnType::Json,
            Value::Null(ty) => *ty,
        }
    }

    /// Plain-text rendering, used for LIKE patterns and key stringification.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::UInt(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Strings(v) => v.join(","),
            Value::Datetime(dt) => dt.to_string(),
            Value::Json(j) => j.to_string(),
            Value::Null(_) => String::new(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Strings(v) => v.serialize(serializer),
            Value::Datetime(dt) => dt.serialize(serializer),
            Value::Json(j) => j.serialize(serializer),
            Value::Null(_) => serializer.serialize_none(),
        }
    }
}

/// Types with a fixed column type, so `Option<T>` can produce a typed null.
pub trait Typed {
    const COLUMN_TYPE: ColumnType;
}

macro_rules! typed {
    ($($ty:ty => $col:ident),* $(,)?) => {
        $(impl Typed for $ty {
            const COLUMN_TYPE: ColumnType = ColumnType::$col;
        })*
    };
}

typed! {
    String => Text,
    i64 => BigInt,
    i32 => Integer,
    u64 => BigInt,
    u32 => Integer,
    f64 => Double,
    bool => Boolean,
    Vec<String> => TextArray,
    StorageDatetime => Datetime,
    DateTime<Utc> => Datetime,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::UInt(u64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl From<&[String]> for Value {
    fn from(v: &[String]) -> Self {
        Value::Strings(v.to_vec())
    }
}

impl From<StorageDatetime> for Value {
    fn from(dt: StorageDatetime) -> Self {
        Value::Datetime(dt)
    }
}

impl From<&StorageDatetime> for Value {
    fn from(dt: &StorageDatetime) -> Self {
        Value::Datetime(*dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Datetime(dt.into())
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl<T: Into<Value> + Typed> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null(T::COLUMN_TYPE),
        }
    }
}

/// Decode a [`Value`] read from the store into a field type.
pub trait FromValue: Sized {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError>;
}

fn decode_error(column: &str, expected: &'static str) -> StorageError {
    StorageError::Decode {
        column: column.to_string(),
        expected,
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(decode_error(column, "text")),
        }
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Int(n) => Ok(*n),
            Value::UInt(n) => i64::try_from(*n).map_err(|_| decode_error(column, "bigint")),
            _ => Err(decode_error(column, "bigint")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        let n = i64::from_value(column, value)?;
        i32::try_from(n).map_err(|_| decode_error(column, "integer"))
    }
}

impl FromValue for u64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::UInt(n) => Ok(*n),
            Value::Int(n) => u64::try_from(*n).map_err(|_| decode_error(column, "unsigned bigint")),
            _ => Err(decode_error(column, "unsigned bigint")),
        }
    }
}

impl FromValue for u32 {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        let n = u64::from_value(column, value)?;
        u32::try_from(n).map_err(|_| decode_error(column, "unsigned integer"))
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Float(n) => Ok(*n),
            Value::Int(n) => Ok(*n as f64),
            _ => Err(decode_error(column, "double")),
        }
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(decode_error(column, "boolean")),
        }
    }
}

impl FromValue for Vec<String> {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Strings(v) => Ok(v.clone()),
            _ => Err(decode_error(column, "text array")),
        }
    }
}

impl FromValue for StorageDatetime {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Datetime(dt) => Ok(*dt),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| StorageDatetime::from(dt.with_timezone(&Utc)))
                .map_err(|_| decode_error(column, "datetime")),
            _ => Err(decode_error(column, "datetime")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        StorageDatetime::from_value(column, value).map(DateTime::from)
    }
}

impl FromValue for serde_json::Value {
    fn from_value(_column: &str, value: &Value) -> Result<Self, StorageError> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            other => Ok(serde_json::to_value(other)?),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: &Value) -> Result<Self, StorageError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(column, value).map(Some)
    }
}

/// A row returned by the store: column name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Raw access to a column's value.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Decode a column. A missing column decodes like a null.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, StorageError> {
        match self.0.get(column) {
            Some(value) => T::from_value(column, value),
            None => T::from_value(column, &Value::Null(ColumnType::Text)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}
