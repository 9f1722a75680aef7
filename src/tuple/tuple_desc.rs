use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::DataType;
use crate::common::{QuarryError, Result};

/// One field of a tuple descriptor: its type and optional name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdItem {
    pub field_type: DataType,
    pub field_name: Option<String>,
}

impl TdItem {
    pub fn new(field_type: DataType, field_name: Option<String>) -> Self {
        Self {
            field_type,
            field_name,
        }
    }
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_name {
            Some(name) => write!(f, "{}({})", self.field_type, name),
            None => write!(f, "{}", self.field_type),
        }
    }
}

/// Describes the layout of a tuple: an ordered, non-empty list of typed,
/// optionally named fields.
///
/// Immutable once built. Two descriptors compare equal when they have the
/// same number of fields and the same type at every position; names do not
/// take part in equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,

    /// Sum of the fixed widths of all fields
    size: usize,
}

impl TupleDesc {
    /// Creates a descriptor from its fields. Fails if `items` is empty.
    pub fn new(items: Vec<TdItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(QuarryError::schema(
                "a tuple descriptor needs at least one field",
            ));
        }
        let size = items.iter().map(|item| item.field_type.size()).sum();
        Ok(Self { items, size })
    }

    /// Creates a descriptor with anonymous fields of the given types.
    pub fn from_types(types: &[DataType]) -> Result<Self> {
        Self::new(types.iter().map(|t| TdItem::new(*t, None)).collect())
    }

    /// Creates a descriptor pairing `types` with `names` position by position.
    pub fn with_names(types: &[DataType], names: &[&str]) -> Result<Self> {
        if types.len() != names.len() {
            return Err(QuarryError::schema(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }
        Self::new(
            types
                .iter()
                .zip(names)
                .map(|(t, n)| TdItem::new(*t, Some(n.to_string())))
                .collect(),
        )
    }

    /// Creates a one-field descriptor.
    pub fn single(field_type: DataType, name: Option<&str>) -> Self {
        Self {
            items: vec![TdItem::new(field_type, name.map(str::to_string))],
            size: field_type.size(),
        }
    }

    /// Creates a descriptor builder for fluent construction.
    pub fn builder() -> TupleDescBuilder {
        TupleDescBuilder::new()
    }

    /// Returns the number of fields.
    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    /// Returns the encoded size in bytes of a tuple with this layout.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the name of field `index`, which may be unset.
    pub fn field_name(&self, index: usize) -> Result<Option<&str>> {
        self.item(index).map(|item| item.field_name.as_deref())
    }

    /// Returns the type of field `index`.
    pub fn field_type(&self, index: usize) -> Result<DataType> {
        self.item(index).map(|item| item.field_type)
    }

    /// Returns the index of the first field named `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.field_name.as_deref() == Some(name))
            .ok_or_else(|| QuarryError::NoSuchElement(format!("no field named '{}'", name)))
    }

    /// Returns an iterator over all fields.
    pub fn iter(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }

    /// Returns the field types in order.
    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.items.iter().map(|item| item.field_type)
    }

    /// Concatenates two descriptors: all fields of `a` followed by all of `b`.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let items: Vec<TdItem> = a.items.iter().chain(b.items.iter()).cloned().collect();
        TupleDesc {
            items,
            size: a.size + b.size,
        }
    }

    /// Returns a copy whose named fields are qualified as `alias.name`.
    pub fn with_prefix(&self, alias: &str) -> TupleDesc {
        let items = self
            .items
            .iter()
            .map(|item| {
                let name = item
                    .field_name
                    .as_ref()
                    .map(|name| format!("{}.{}", alias, name));
                TdItem::new(item.field_type, name)
            })
            .collect();
        TupleDesc {
            items,
            size: self.size,
        }
    }

    /// Wraps the descriptor for sharing between tuples.
    pub fn into_arc(self) -> Arc<TupleDesc> {
        Arc::new(self)
    }

    fn item(&self, index: usize) -> Result<&TdItem> {
        self.items.get(index).ok_or(QuarryError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.types().eq(other.types())
    }
}

impl Eq for TupleDesc {}

impl Hash for TupleDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for t in self.types() {
            t.hash(state);
        }
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

/// Builder for constructing descriptors fluently.
#[derive(Default)]
pub struct TupleDescBuilder {
    items: Vec<TdItem>,
}

impl TupleDescBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named field.
    pub fn field(mut self, name: impl Into<String>, field_type: DataType) -> Self {
        self.items.push(TdItem::new(field_type, Some(name.into())));
        self
    }

    /// Adds an anonymous field.
    pub fn unnamed(mut self, field_type: DataType) -> Self {
        self.items.push(TdItem::new(field_type, None));
        self
    }

    pub fn build(self) -> Result<TupleDesc> {
        TupleDesc::new(self.items)
    }

    /// Builds the descriptor wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Result<Arc<TupleDesc>> {
        self.build().map(Arc::new)
    }
}
