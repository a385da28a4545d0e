use std::cmp::Ordering;
use std::fmt;

use super::DataType;

/// A typed value held in a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Null value - compatible with any type
    Null,
    Boolean(bool),
    Integer(i32),
    BigInt(i64),
    Varchar(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interprets the value as a predicate result. Null is not true.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Adds another numeric value, widening to BigInt when either side is
    /// one. Returns None for non-numeric operands; Null absorbs.
    pub fn add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Some(Value::Null),
            (Value::Integer(a), Value::Integer(b)) => Some(Value::Integer(a.wrapping_add(*b))),
            (Value::BigInt(a), Value::BigInt(b)) => Some(Value::BigInt(a.wrapping_add(*b))),
            (Value::Integer(a), Value::BigInt(b)) => {
                Some(Value::BigInt((*a as i64).wrapping_add(*b)))
            }
            (Value::BigInt(a), Value::Integer(b)) => {
                Some(Value::BigInt(a.wrapping_add(*b as i64)))
            }
            _ => None,
        }
    }

    /// Orders two comparable values. Null and cross-family comparisons
    /// return None.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::BigInt(b)) => Some((*a as i64).cmp(b)),
            (Value::BigInt(a), Value::Integer(b)) => Some(a.cmp(&(*b as i64))),
            (Value::Varchar(a), Value::Varchar(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Serializes the value according to the column type. Returns None when
    /// the value does not fit the type. Nulls are recorded in the tuple's
    /// null bitmap and encode as zeroed filler here.
    pub fn serialize(&self, data_type: &DataType) -> Option<Vec<u8>> {
        match (self, data_type) {
            (Value::Null, DataType::VarChar(_)) => Some(vec![0, 0]),
            (Value::Null, t) => Some(vec![0; t.fixed_size().unwrap()]),

            (Value::Boolean(b), DataType::Boolean) => Some(vec![u8::from(*b)]),
            (Value::Integer(v), DataType::Integer) => Some(v.to_le_bytes().to_vec()),
            (Value::BigInt(v), DataType::BigInt) => Some(v.to_le_bytes().to_vec()),
            (Value::Integer(v), DataType::BigInt) => Some((*v as i64).to_le_bytes().to_vec()),

            (Value::Varchar(s), DataType::VarChar(max_len)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *max_len as usize {
                    return None;
                }
                let mut result = (bytes.len() as u16).to_le_bytes().to_vec();
                result.extend_from_slice(bytes);
                Some(result)
            }

            _ => None,
        }
    }

    /// Deserializes a value of the given type, returning it together with
    /// the number of bytes consumed.
    pub fn deserialize(data: &[u8], data_type: &DataType) -> Option<(Self, usize)> {
        match data_type {
            DataType::Boolean => {
                if data.is_empty() {
                    return None;
                }
                Some((Value::Boolean(data[0] != 0), 1))
            }
            DataType::Integer => {
                if data.len() < 4 {
                    return None;
                }
                let v = i32::from_le_bytes(data[..4].try_into().unwrap());
                Some((Value::Integer(v), 4))
            }
            DataType::BigInt => {
                if data.len() < 8 {
                    return None;
                }
                let v = i64::from_le_bytes(data[..8].try_into().unwrap());
                Some((Value::BigInt(v), 8))
            }
            DataType::VarChar(_) => {
                if data.len() < 2 {
                    return None;
                }
                let len = u16::from_le_bytes([data[0], data[1]]) as usize;
                if data.len() < 2 + len {
                    return None;
                }
                let s = std::str::from_utf8(&data[2..2 + len]).ok()?;
                Some((Value::Varchar(s.to_string()), 2 + len))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Varchar(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Varchar(v)
    }
}
