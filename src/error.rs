//! Error types for the neartree index engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index must be initialized with a non-empty dataset before searching")]
    NotInitialized,

    #[error("dimension mismatch: index holds {expected}-dimensional vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("threshold must be non-negative, got {0}")]
    InvalidThreshold(i64),

    #[error("corrupt serialized state: {0}")]
    Corrupt(String),

    #[error("serialized state exhausted: tried to read {requested} bytes, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },

    #[error("malformed serialized payload: {0}")]
    Malformed(String),
}
