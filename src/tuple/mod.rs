mod data_type;
mod tuple;
mod tuple_desc;
mod value;

pub use data_type::{DataType, TEXT_LEN_PREFIX};
pub use tuple::{Tuple, TupleBuilder};
pub use tuple_desc::{TdItem, TupleDesc, TupleDescBuilder};
pub use value::Value;
