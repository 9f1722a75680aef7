use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use super::{TupleDesc, Value};
use crate::common::{QuarryError, RecordId, Result};

/// Represents a single row in a table.
///
/// A tuple holds one value per field of its descriptor and, once stored,
/// the record id of the slot it lives in.
///
/// ## Tuple Binary Format
///
/// Fields are written back to back in descriptor order, each at its type's
/// fixed width:
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | Field 0   | Field 1   | ... | Field N-1 |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// so every tuple of a descriptor encodes to exactly `desc.size()` bytes.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a tuple, checking the values against the descriptor.
    ///
    /// Integer values bound for a BIGINT field are widened.
    pub fn new(desc: Arc<TupleDesc>, values: Vec<Value>) -> Result<Self> {
        if values.len() != desc.num_fields() {
            return Err(QuarryError::schema(format!(
                "tuple has {} values, descriptor has {} fields",
                values.len(),
                desc.num_fields()
            )));
        }
        let values = values
            .into_iter()
            .zip(desc.types())
            .map(|(v, t)| v.coerce(&t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            desc,
            values,
            record_id: None,
        })
    }

    /// Decodes one tuple of `desc` from the buffer.
    pub fn deserialize(desc: Arc<TupleDesc>, buf: &mut impl Buf) -> Result<Self> {
        let values = desc
            .types()
            .map(|t| Value::deserialize(&t, buf))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            desc,
            values,
            record_id: None,
        })
    }

    /// Encodes the tuple's fields into the buffer.
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<()> {
        for (value, t) in self.values.iter().zip(self.desc.types()) {
            value.serialize(&t, buf)?;
        }
        Ok(())
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Rebinds the tuple to another descriptor with the same field types,
    /// keeping its values. Used to rename fields without copying data.
    pub fn reset_tuple_desc(&mut self, desc: Arc<TupleDesc>) -> Result<()> {
        if *desc != *self.desc {
            return Err(QuarryError::schema(format!(
                "cannot rebind tuple of ({}) to ({})",
                self.desc, desc
            )));
        }
        self.desc = desc;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Returns the value of field `index`.
    pub fn field(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or(QuarryError::IndexOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Replaces the value of field `index`. The value must fit the field's type.
    pub fn set_field(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let field_type = self.desc.field_type(index)?;
        self.values[index] = value.into().coerce(&field_type)?;
        Ok(())
    }

    /// Returns all values in field order.
    pub fn fields(&self) -> &[Value] {
        &self.values
    }
}

/// Tuples are equal when their descriptors and values match. The record id
/// is a storage location, not content, and is not compared.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    desc: Arc<TupleDesc>,
    values: Vec<Option<Value>>,
    current_index: usize,
}

impl TupleBuilder {
    /// Creates a new tuple builder for the given descriptor.
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let count = desc.num_fields();
        Self {
            desc,
            values: vec![None; count],
            current_index: 0,
        }
    }

    /// Sets the value at the current position and advances.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        if self.current_index < self.values.len() {
            self.values[self.current_index] = Some(value.into());
            self.current_index += 1;
        }
        self
    }

    /// Sets the value for a specific field by name.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Ok(index) = self.desc.index_of(name) {
            self.values[index] = Some(value.into());
        }
        self
    }

    /// Builds the tuple. Fails if any field was left unset.
    pub fn build(self) -> Result<Tuple> {
        let mut values = Vec::with_capacity(self.values.len());
        for (i, v) in self.values.into_iter().enumerate() {
            match v {
                Some(v) => values.push(v),
                None => {
                    return Err(QuarryError::schema(format!("field {} was not set", i)));
                }
            }
        }
        Tuple::new(self.desc, values)
    }
}
