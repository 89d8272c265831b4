//! External dataset interface.
//!
//! A dataset format is out of scope for this crate's core (see
//! `src/datasets` for the one reference implementation it ships); anything
//! implementing [`Dataset`] can be plugged into a [`crate::Dataflow`].

use crate::error::GraphResult;
use crate::node::{ColumnValue, Range};

/// A partition is a list of row ranges, one per slot.
pub type Partition = Vec<Range>;

/// A source of rows that a [`crate::Dataflow`] can read columns from.
pub trait Dataset: Send + Sync {
    /// Splits the dataset into up to `requested_concurrency` contiguous,
    /// non-overlapping row ranges. May return fewer ranges than requested
    /// (e.g. if there are fewer rows than slots); never more.
    fn parallelize(&self, requested_concurrency: usize) -> Partition;

    /// A normalization weight applied uniformly to every row of this
    /// dataset (e.g. cross-section / event-count scaling). Defaults to 1.
    fn normalize(&self) -> f64 {
        1.0
    }

    /// Total number of rows in the dataset, used to validate row limits.
    fn row_count(&self) -> u64;

    /// Opens a row cursor scoped to `range`.
    fn open_reader(&self, range: &Range) -> Box<dyn RowReader>;

    /// Opens a typed reader for column `name`, scoped to `range`. Errors
    /// with [`crate::error::GraphError::ColumnNotFound`]/
    /// [`crate::error::GraphError::ColumnTypeMismatch`] rather than panicking,
    /// so a caller can surface a missing or mistyped column as an ordinary
    /// `Err` instead of aborting the process.
    fn read_column<T: ColumnValue>(&self, name: &str, range: &Range) -> GraphResult<Box<dyn ColumnSource<T>>>;

    /// Called once before the first range starts processing.
    fn initialize(&self) {}

    /// Called once after the last range finishes processing.
    fn finalize(&self) {}
}

/// A per-slot row cursor. Most in-memory/columnar datasets need no shared
/// cursor state (each [`ColumnSource`] can index directly by row number), in
/// which case this is a no-op; formats with genuine row-at-a-time decoding
/// (e.g. a line-oriented or record-oriented file) hold their cursor here.
pub trait RowReader: Send {
    fn start(&mut self, _range: &Range) {}
    fn read(&mut self, _range: &Range, _entry: u64) {}
    fn finish(&mut self, _range: &Range) {}
}

/// A typed, randomly-addressable view of one dataset column within a range.
pub trait ColumnSource<T>: Send {
    fn read(&mut self, range: &Range, entry: u64) -> &T;
}
