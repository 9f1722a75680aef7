mod buffer_pool;
mod lock_manager;
mod lru_replacer;
mod stats;

pub use buffer_pool::*;
pub use lock_manager::*;
pub use lru_replacer::*;
pub use stats::*;
