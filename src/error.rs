//! Error types for graph construction and execution.

use thiserror::Error;

/// Everything that can go wrong building or running a dataflow graph.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("selection path '{0}' is already booked")]
    DuplicateSelectionPath(String),

    #[error("slot concurrency mismatch: expected {expected} slots, found {found}")]
    SlotConcurrencyMismatch { expected: usize, found: usize },

    #[error("dataset partition produced zero ranges")]
    EmptyPartition,

    #[error("cannot merge query '{0}' results across zero slots")]
    ZeroSlotMerge(String),

    #[error("row limit {limit} exceeds {available} rows available in the dataset")]
    RowLimitExceedsDataset { limit: u64, available: u64 },

    #[error("failed to build slot thread pool: {0}")]
    ThreadPoolInit(String),

    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    #[error("column '{0}' has an unexpected type")]
    ColumnTypeMismatch(String),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type GraphResult<T> = Result<T, GraphError>;
