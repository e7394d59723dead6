pub mod storage;
pub mod types;

pub use storage::table::{Rows, Table};
pub use types::error::{EngineError, Result};
pub use types::row::Row;
