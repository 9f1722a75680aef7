use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::{QuarryError, Result};
use crate::tuple::{DataType, Tuple, TupleDesc, Value};

use super::TupleIterator;

/// Aggregate function applied per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Count => "COUNT",
        };
        write!(f, "{}", s)
    }
}

/// Running state of one group.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: i64,
    /// `None` once the running sum has overflowed
    sum: Option<i64>,
    min: i64,
    max: i64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: Some(0),
            min: i64::MAX,
            max: i64::MIN,
        }
    }

    fn add(&mut self, value: Option<i64>) {
        self.count += 1;
        if let Some(v) = value {
            self.sum = self.sum.and_then(|s| s.checked_add(v));
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    /// Returns `None` when SUM or AVG overflowed.
    fn result(&self, op: AggregateOp) -> Option<i64> {
        match op {
            AggregateOp::Count => Some(self.count),
            AggregateOp::Sum => self.sum,
            // integer division, truncating toward zero
            AggregateOp::Avg => self.sum.map(|s| s / self.count.max(1)),
            AggregateOp::Min => Some(self.min),
            AggregateOp::Max => Some(self.max),
        }
    }
}

/// Groups tuples by an optional field and folds one aggregate per group.
///
/// Groups are emitted in the order their key was first seen. Numeric fields
/// support every [`AggregateOp`]; text and boolean fields support only
/// `Count`.
#[derive(Debug)]
pub struct Aggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggregateOp,
    agg_type: DataType,
    desc: Arc<TupleDesc>,
    /// Accumulators in first-seen order
    groups: Vec<(Option<Value>, Accumulator)>,
    index: HashMap<Option<Value>, usize>,
}

impl Aggregator {
    /// Creates an aggregator over tuples shaped like `input`.
    pub fn new(
        input: &TupleDesc,
        group_field: Option<usize>,
        agg_field: usize,
        op: AggregateOp,
    ) -> Result<Self> {
        let agg_type = input.field_type(agg_field)?;
        if op != AggregateOp::Count && !agg_type.is_numeric() {
            return Err(QuarryError::schema(format!(
                "{} is not supported on {} fields",
                op, agg_type
            )));
        }

        let agg_name = format!("{}({})", op, input.field_name(agg_field)?.unwrap_or(""));
        let result_type = match (op, agg_type) {
            (AggregateOp::Count, _) => DataType::Integer,
            (_, t) => t,
        };
        let agg_desc = TupleDesc::single(result_type, Some(&agg_name));
        let desc = match group_field {
            Some(g) => {
                let group_desc =
                    TupleDesc::single(input.field_type(g)?, input.field_name(g)?);
                TupleDesc::merge(&group_desc, &agg_desc)
            }
            None => agg_desc,
        };

        Ok(Self {
            group_field,
            agg_field,
            op,
            agg_type: result_type,
            desc: Arc::new(desc),
            groups: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Schema of the result tuples: the group key (if grouping) followed by
    /// the aggregate value, named like `SUM(price)`.
    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    /// Folds one input tuple into its group.
    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.group_field {
            Some(g) => Some(tuple.field(g)?.clone()),
            None => None,
        };
        let value = tuple.field(self.agg_field)?.as_i64();

        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.groups.push((key.clone(), Accumulator::new()));
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.add(value);
        Ok(())
    }

    /// Builds the result tuples.
    ///
    /// Without grouping and without input, COUNT and SUM yield a single 0
    /// while MIN, MAX and AVG yield nothing, having no value to report.
    pub fn iterator(&self) -> Result<TupleIterator> {
        let mut tuples = Vec::with_capacity(self.groups.len().max(1));

        if self.groups.is_empty()
            && self.group_field.is_none()
            && matches!(self.op, AggregateOp::Count | AggregateOp::Sum)
        {
            tuples.push(Tuple::new(self.desc.clone(), vec![self.result_value(0)?])?);
        }

        for (key, acc) in &self.groups {
            let result = acc.result(self.op).ok_or_else(|| {
                QuarryError::schema(format!("{} result overflows {}", self.op, self.agg_type))
            })?;
            let value = self.result_value(result)?;
            let values = match key {
                Some(k) => vec![k.clone(), value],
                None => vec![value],
            };
            tuples.push(Tuple::new(self.desc.clone(), values)?);
        }

        TupleIterator::new(self.desc.clone(), tuples)
    }

    /// Discards all groups.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.index.clear();
    }

    fn result_value(&self, v: i64) -> Result<Value> {
        match self.agg_type {
            DataType::BigInt => Ok(Value::BigInt(v)),
            _ => i32::try_from(v).map(Value::Integer).map_err(|_| {
                QuarryError::schema(format!("{} result {} overflows INTEGER", self.op, v))
            }),
        }
    }
}
