use std::fmt;

use crate::common::DEFAULT_TEXT_LEN;

/// Width in bytes of the length prefix stored ahead of every text field.
pub const TEXT_LEN_PREFIX: usize = 4;

/// Represents the data types supported by the storage engine.
///
/// Every type has a fixed encoded width so a tuple's size is known from its
/// descriptor alone and page slots can be laid out as a flat array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type: 1 byte (0 = false, 1 = true)
    Boolean,

    /// 32-bit signed integer: 4 bytes, little-endian
    Integer,

    /// 64-bit signed integer: 8 bytes, little-endian
    BigInt,

    /// Bounded string of at most n bytes.
    /// Stored as: length (4 bytes) + data zero-padded to n bytes
    Text(u16),
}

impl DataType {
    /// Text type with the default maximum length.
    pub fn text() -> Self {
        DataType::Text(DEFAULT_TEXT_LEN)
    }

    /// Returns the encoded size of a field of this type in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::Integer => 4,
            DataType::BigInt => 8,
            DataType::Text(n) => TEXT_LEN_PREFIX + *n as usize,
        }
    }

    /// Returns true for the integer types that support arithmetic aggregates.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInt)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Text(n) => write!(f, "TEXT({})", n),
        }
    }
}
