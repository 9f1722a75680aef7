use std::cmp::Ordering;
use std::fmt;

use crate::common::{QuarryError, Result};
use crate::tuple::{Tuple, Value};

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    GreaterThan,
    LessThan,
    GreaterThanOrEq,
    LessThanOrEq,
    /// Substring containment on text
    Like,
    NotEquals,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::LessThan => "<",
            Op::GreaterThanOrEq => ">=",
            Op::LessThanOrEq => "<=",
            Op::Like => "LIKE",
            Op::NotEquals => "<>",
        };
        write!(f, "{}", s)
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Value,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Evaluates `tuple.field(field) op operand`.
    ///
    /// Fails if the field does not exist or its value cannot be compared
    /// with the operand.
    pub fn filter(&self, tuple: &Tuple) -> Result<bool> {
        let value = tuple.field(self.field)?;

        if self.op == Op::Like {
            if let (Some(v), Some(pattern)) = (value.as_str(), self.operand.as_str()) {
                return Ok(v.contains(pattern));
            }
        }

        let ord = value.compare(&self.operand).ok_or_else(|| {
            QuarryError::schema(format!("cannot compare {} with {}", value, self.operand))
        })?;
        Ok(match self.op {
            // LIKE on non-text values is plain equality
            Op::Equals | Op::Like => ord == Ordering::Equal,
            Op::NotEquals => ord != Ordering::Equal,
            Op::GreaterThan => ord == Ordering::Greater,
            Op::LessThan => ord == Ordering::Less,
            Op::GreaterThanOrEq => ord != Ordering::Less,
            Op::LessThanOrEq => ord != Ordering::Greater,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{} {} {}", self.field, self.op, self.operand)
    }
}
