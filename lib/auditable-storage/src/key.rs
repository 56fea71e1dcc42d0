use std::fmt;

use crate::{StorageError, Value};

/// Primary key of an audited record: either text or a 64-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    String(String),
    Integer(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => write!(f, "{}", s),
            Key::Integer(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::String(s.clone())
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Integer(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Integer(i64::from(n))
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::String(s) => Value::String(s),
            Key::Integer(n) => Value::Int(n),
        }
    }
}

impl TryFrom<&Value> for Key {
    type Error = StorageError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Key::String(s.clone())),
            Value::Int(n) => Ok(Key::Integer(*n)),
            Value::UInt(n) => i64::try_from(*n)
                .map(Key::Integer)
                .map_err(|_| StorageError::UnsupportedKey(format!("{} exceeds i64", n))),
            other => Err(StorageError::UnsupportedKey(format!(
                "{:?} is neither text nor integer",
                other.column_type()
            ))),
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = StorageError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Key::try_from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringifies_both_forms() {
        assert_eq!(Key::from(7i64).to_string(), "7");
        assert_eq!(Key::from("abc").to_string(), "abc");
    }

    #[test]
    fn rejects_non_key_values() {
        assert!(matches!(
            Key::try_from(Value::Bool(true)),
            Err(StorageError::UnsupportedKey(_))
        ));
        assert_eq!(Key::try_from(Value::UInt(9)).unwrap(), Key::Integer(9));
    }
}
