use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use super::data_type::TEXT_LEN_PREFIX;
use super::DataType;
use crate::common::{QuarryError, Result};

/// Represents a typed value that can be stored in a tuple.
/// Each variant corresponds to a DataType and holds the actual data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean value
    Boolean(bool),

    /// 32-bit signed integer
    Integer(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// Text value, at most the field's declared length in bytes
    Text(String),
}

impl Value {
    /// Returns the DataType that best matches this value.
    /// Text returns a type sized to the string's byte length.
    pub fn infer_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer(_) => DataType::Integer,
            Value::BigInt(_) => DataType::BigInt,
            Value::Text(s) => DataType::Text(s.len() as u16),
        }
    }

    /// Returns true if this value can be stored in a field of `data_type`.
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Boolean(_), DataType::Boolean)
            | (Value::Integer(_), DataType::Integer)
            | (Value::BigInt(_), DataType::BigInt) => true,
            (Value::Text(s), DataType::Text(n)) => s.len() <= *n as usize,
            _ => false,
        }
    }

    /// Converts this value to the target type, widening integers.
    pub fn coerce(self, target: &DataType) -> Result<Value> {
        match (self, target) {
            (Value::Integer(v), DataType::BigInt) => Ok(Value::BigInt(v as i64)),
            (v, dt) if v.fits(dt) => Ok(v),
            (v, dt) => Err(QuarryError::schema(format!(
                "value {} does not fit a {} field",
                v, dt
            ))),
        }
    }

    /// Writes the fixed-width encoding of this value for a field of `data_type`.
    pub fn serialize(&self, data_type: &DataType, buf: &mut impl BufMut) -> Result<()> {
        match (self, data_type) {
            (Value::Boolean(b), DataType::Boolean) => buf.put_u8(*b as u8),
            (Value::Integer(v), DataType::Integer) => buf.put_i32_le(*v),
            (Value::BigInt(v), DataType::BigInt) => buf.put_i64_le(*v),
            (Value::Integer(v), DataType::BigInt) => buf.put_i64_le(*v as i64),
            (Value::Text(s), DataType::Text(n)) => {
                let n = *n as usize;
                let bytes = s.as_bytes();
                if bytes.len() > n {
                    return Err(QuarryError::schema(format!(
                        "text of {} bytes exceeds field length {}",
                        bytes.len(),
                        n
                    )));
                }
                buf.put_u32_le(bytes.len() as u32);
                buf.put_slice(bytes);
                buf.put_bytes(0, n - bytes.len());
            }
            (v, dt) => {
                return Err(QuarryError::schema(format!(
                    "cannot encode {} as {}",
                    v, dt
                )))
            }
        }
        Ok(())
    }

    /// Reads a value of `data_type` from the buffer, consuming exactly
    /// `data_type.size()` bytes.
    pub fn deserialize(data_type: &DataType, buf: &mut impl Buf) -> Result<Value> {
        if buf.remaining() < data_type.size() {
            return Err(QuarryError::schema(format!(
                "need {} bytes to decode {}, have {}",
                data_type.size(),
                data_type,
                buf.remaining()
            )));
        }

        let value = match data_type {
            DataType::Boolean => Value::Boolean(buf.get_u8() != 0),
            DataType::Integer => Value::Integer(buf.get_i32_le()),
            DataType::BigInt => Value::BigInt(buf.get_i64_le()),
            DataType::Text(n) => {
                let n = *n as usize;
                let len = buf.get_u32_le() as usize;
                if len > n {
                    return Err(QuarryError::schema(format!(
                        "stored text length {} exceeds field length {}",
                        len, n
                    )));
                }
                let mut raw = vec![0u8; n];
                buf.copy_to_slice(&mut raw);
                Value::Text(String::from_utf8_lossy(&raw[..len]).into_owned())
            }
        };
        Ok(value)
    }

    /// Compares two values for ordering.
    /// Returns None if the values are not comparable (different types).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),

            // Cross-type numeric comparisons promote to i64
            (Value::Integer(a), Value::BigInt(b)) => Some((*a as i64).cmp(b)),
            (Value::BigInt(a), Value::Integer(b)) => Some(a.cmp(&(*b as i64))),

            _ => None,
        }
    }

    /// Returns the value as an i64 if it is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice of a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
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

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
