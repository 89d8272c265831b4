//! Reference [`Dataset`] implementation: a column-oriented, fully
//! in-memory table. Meant for tests, benchmarks, and small analyses; see
//! the crate's Non-goals for why no file-backed format ships here.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::dataset::{ColumnSource, Dataset, Partition, RowReader};
use crate::error::{GraphError, GraphResult};
use crate::node::{ColumnValue, Range};

/// A dataset whose columns are plain `Vec<T>`s held behind a type-erased
/// `Arc`. Column values are retrieved by downcasting back to `Vec<T>`; a
/// missing name or a type mismatch comes back as
/// [`crate::error::GraphError::ColumnNotFound`]/
/// [`crate::error::GraphError::ColumnTypeMismatch`] rather than a panic, so
/// a caller driving column names from outside this crate (e.g. a config
/// file) can handle the mistake instead of crashing.
pub struct InMemoryDataset {
    row_count: u64,
    columns: HashMap<String, Arc<dyn Any + Send + Sync>>,
    weight: f64,
}

impl InMemoryDataset {
    pub fn new(row_count: u64) -> Self {
        InMemoryDataset { row_count, columns: HashMap::new(), weight: 1.0 }
    }

    /// Sets the dataset-wide normalization weight returned by `normalize()`.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Adds a column. Panics if `data.len()` does not match the row count
    /// this dataset was constructed with.
    pub fn with_column<T: ColumnValue>(mut self, name: impl Into<String>, data: Vec<T>) -> Self {
        assert_eq!(
            data.len() as u64,
            self.row_count,
            "column length does not match dataset row count"
        );
        self.columns.insert(name.into(), Arc::new(data));
        self
    }
}

impl Dataset for InMemoryDataset {
    fn parallelize(&self, requested_concurrency: usize) -> Partition {
        let slots = requested_concurrency.max(1) as u64;
        let total = self.row_count;
        let base = total / slots;
        let remainder = total % slots;
        let mut ranges = Vec::new();
        let mut begin = 0u64;
        for slot in 0..slots as usize {
            let extra = if (slot as u64) < remainder { 1 } else { 0 };
            let len = base + extra;
            let end = begin + len;
            if len > 0 {
                ranges.push(Range { slot, begin, end });
            }
            begin = end;
        }
        ranges
    }

    fn normalize(&self) -> f64 {
        self.weight
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn open_reader(&self, _range: &Range) -> Box<dyn RowReader> {
        Box::new(NullRowReader)
    }

    fn read_column<T: ColumnValue>(&self, name: &str, _range: &Range) -> GraphResult<Box<dyn ColumnSource<T>>> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| GraphError::ColumnNotFound(name.to_string()))?;
        let data = Arc::clone(column)
            .downcast::<Vec<T>>()
            .map_err(|_| GraphError::ColumnTypeMismatch(name.to_string()))?;
        Ok(Box::new(InMemoryColumnSource { data }))
    }
}

struct InMemoryColumnSource<T> {
    data: Arc<Vec<T>>,
}

impl<T: ColumnValue> ColumnSource<T> for InMemoryColumnSource<T> {
    fn read(&mut self, _range: &Range, entry: u64) -> &T {
        &self.data[entry as usize]
    }
}

struct NullRowReader;
impl RowReader for NullRowReader {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallelize_splits_rows_evenly_with_remainder_up_front() {
        let dataset = InMemoryDataset::new(10);
        let partition = dataset.parallelize(3);
        let lens: Vec<u64> = partition.iter().map(Range::len).collect();
        assert_eq!(lens.iter().sum::<u64>(), 10);
        assert_eq!(lens, vec![4, 3, 3]);
    }

    #[test]
    fn parallelize_never_returns_empty_ranges() {
        let dataset = InMemoryDataset::new(2);
        let partition = dataset.parallelize(8);
        assert_eq!(partition.len(), 2);
        assert!(partition.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn read_column_round_trips_values() {
        let dataset = InMemoryDataset::new(3).with_column("x", vec![1i64, 2, 3]);
        let range = Range { slot: 0, begin: 0, end: 3 };
        let mut source = dataset.read_column::<i64>("x", &range).unwrap();
        assert_eq!(*source.read(&range, 1), 2);
    }

    #[test]
    fn read_column_missing_name_is_a_graph_error() {
        let dataset = InMemoryDataset::new(3).with_column("x", vec![1i64, 2, 3]);
        let range = Range { slot: 0, begin: 0, end: 3 };
        let result = dataset.read_column::<i64>("y", &range);
        assert!(matches!(result, Err(GraphError::ColumnNotFound(name)) if name == "y"));
    }

    #[test]
    fn read_column_wrong_type_is_a_graph_error() {
        let dataset = InMemoryDataset::new(3).with_column("x", vec![1i64, 2, 3]);
        let range = Range { slot: 0, begin: 0, end: 3 };
        let result = dataset.read_column::<f64>("x", &range);
        assert!(matches!(result, Err(GraphError::ColumnTypeMismatch(name)) if name == "x"));
    }
}
