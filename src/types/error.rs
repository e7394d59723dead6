use thiserror::Error;

use crate::types::{PageId, RowId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page limit reached: {requested} pages requested, ceiling is {max}")]
    CapacityExceeded { requested: u64, max: u64 },

    #[error("value for '{field}' is {actual} bytes, limit is {max}")]
    Validation {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("duplicate key: {key}")]
    DuplicateKey { key: RowId },

    #[error("corrupted page: page_id={page_id}, reason={reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("corrupted database: {reason}")]
    CorruptedDatabase { reason: String },

    #[error("invalid node type tag: {0}")]
    InvalidNodeType(u8),

    #[error("invalid page size: expected {expected} bytes, got {actual} bytes")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("page {page_id} out of bounds (allocated pages: {allocated})")]
    PageOutOfBounds { page_id: PageId, allocated: u64 },
}

impl EngineError {
    /// Whether the caller should stop driving the engine. I/O and
    /// corruption failures are fatal; validation, duplicate-key and
    /// capacity failures reject one operation and leave the tree usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Io(_)
                | EngineError::CorruptedPage { .. }
                | EngineError::CorruptedDatabase { .. }
                | EngineError::InvalidNodeType(_)
                | EngineError::InvalidPageSize { .. }
                | EngineError::PageOutOfBounds { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
