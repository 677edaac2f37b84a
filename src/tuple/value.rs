use std::cmp::Ordering;
use std::fmt;

use crate::common::{QuarryError, Result};

use super::DataType;

/// A typed value held by a tuple cell.
///
/// `Null` carries no type of its own; the surrounding schema supplies
/// one. Equality and hashing are structural (`Null == Null`), which is
/// what hash aggregation and hash join keys want; SQL three-valued
/// comparison semantics live in the expression layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    BigInt(i64),
    Timestamp(i64),
    Varchar(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The widest integer view of this value, if it is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Total order between two non-null values of the same (or coercible
    /// numeric) type; `None` when either side is null or the types are
    /// incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Varchar(a), Value::Varchar(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_i64()?;
                let b = other.as_i64()?;
                Some(a.cmp(&b))
            }
        }
    }

    /// Numeric addition for aggregation; integer types widen as needed.
    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(Value::Integer(a.wrapping_add(*b))),
            _ => {
                let a = self.as_i64()?;
                let b = other.as_i64()?;
                Some(Value::BigInt(a.wrapping_add(b)))
            }
        }
    }

    /// Writes this value into a fixed-width slot laid out for
    /// `data_type`. The slot must be exactly `data_type.fixed_size()`
    /// bytes; nulls zero the slot (the tuple's null bitmap is
    /// authoritative).
    pub fn serialize_into(&self, data_type: &DataType, slot: &mut [u8]) -> Result<()> {
        assert_eq!(slot.len(), data_type.fixed_size());

        match (self, data_type) {
            (Value::Null, _) => slot.fill(0),
            (Value::Boolean(b), DataType::Boolean) => slot[0] = *b as u8,
            (Value::Integer(v), DataType::Integer) => slot.copy_from_slice(&v.to_le_bytes()),
            (Value::BigInt(v), DataType::BigInt) => slot.copy_from_slice(&v.to_le_bytes()),
            (Value::Timestamp(v), DataType::Timestamp) => slot.copy_from_slice(&v.to_le_bytes()),
            (Value::Varchar(s), DataType::Varchar(max_len)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *max_len as usize {
                    return Err(QuarryError::TypeMismatch(format!("varchar({max_len})")));
                }
                slot[0..2].copy_from_slice(&(bytes.len() as u16).to_le_bytes());
                slot[2..2 + bytes.len()].copy_from_slice(bytes);
                slot[2 + bytes.len()..].fill(0);
            }
            // Narrower integers widen into BigInt columns.
            (Value::Integer(v), DataType::BigInt) => {
                slot.copy_from_slice(&(*v as i64).to_le_bytes())
            }
            _ => {
                return Err(QuarryError::TypeMismatch(format!(
                    "{self:?} as {data_type:?}"
                )))
            }
        }
        Ok(())
    }

    /// Reads a value back from a fixed-width slot.
    pub fn deserialize_from(data_type: &DataType, slot: &[u8]) -> Value {
        assert_eq!(slot.len(), data_type.fixed_size());

        match data_type {
            DataType::Boolean => Value::Boolean(slot[0] != 0),
            DataType::Integer => Value::Integer(i32::from_le_bytes(slot[0..4].try_into().unwrap())),
            DataType::BigInt => Value::BigInt(i64::from_le_bytes(slot[0..8].try_into().unwrap())),
            DataType::Timestamp => {
                Value::Timestamp(i64::from_le_bytes(slot[0..8].try_into().unwrap()))
            }
            DataType::Varchar(_) => {
                let len = u16::from_le_bytes(slot[0..2].try_into().unwrap()) as usize;
                let content = String::from_utf8_lossy(&slot[2..2 + len]).into_owned();
                Value::Varchar(content)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::Varchar(s) => write!(f, "'{s}'"),
        }
    }
}
