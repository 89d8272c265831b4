//! Object-safe façade handles use to register nodes and trigger execution,
//! decoupled from the concrete `Dataset` type backing a `Dataflow`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dataset::{Dataset, Partition};
use crate::error::{GraphError, GraphResult};
use crate::node::{NodeOps, Range};
use crate::processor::Processor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Column,
    Selection,
    Query,
}

/// Everything a user-facing handle (`Column`, `Selection`, `Query`) needs
/// from the graph it belongs to, with the concrete dataset type erased.
///
/// Methods take `&self`: the one implementor, [`DriverCell`], keeps its
/// mutable state behind an internal `parking_lot::Mutex` so that handles can
/// hold a plain `Arc<dyn GraphDriver>` rather than an `Arc<Mutex<dyn
/// GraphDriver>>` (the latter cannot be built from a concrete `Arc<Mutex<
/// Inner<D>>>` by unsized coercion).
pub(crate) trait GraphDriver: Send + Sync {
    fn concurrency(&self) -> usize;
    fn register(&self, kind: NodeKind, slot: usize, node: NodeOps);
    fn register_selection_path(&self, path: &str) -> GraphResult<()>;
    fn analyze(&self) -> GraphResult<()>;
}

/// Shared, type-erased handle to a dataflow's mutable build/execution state.
pub(crate) type SharedDriver = Arc<dyn GraphDriver>;

pub(crate) struct Inner<D: Dataset> {
    dataset: Arc<D>,
    partition: Partition,
    processors: Vec<Processor>,
    selection_paths: HashSet<String>,
    analyzed: bool,
}

impl<D: Dataset> Inner<D> {
    pub fn new(dataset: Arc<D>, requested_concurrency: usize, row_limit: Option<u64>) -> GraphResult<Self> {
        let mut partition = dataset.parallelize(requested_concurrency);
        if partition.is_empty() {
            return Err(GraphError::EmptyPartition);
        }
        if let Some(limit) = row_limit {
            let available = dataset.row_count();
            if limit > available {
                return Err(GraphError::RowLimitExceedsDataset { limit, available });
            }
            partition = truncate_partition(partition, limit);
        }
        let processors = partition.iter().map(|range| Processor::new(dataset.open_reader(range))).collect();
        Ok(Inner { dataset, partition, processors, selection_paths: HashSet::new(), analyzed: false })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }
}

fn truncate_partition(partition: Partition, limit: u64) -> Partition {
    let mut out = Vec::new();
    let mut remaining = limit;
    for range in partition {
        if remaining == 0 {
            break;
        }
        let len = range.len();
        if len <= remaining {
            remaining -= len;
            out.push(range);
        } else {
            out.push(Range { slot: range.slot, begin: range.begin, end: range.begin + remaining });
            remaining = 0;
        }
    }
    out
}

impl<D: Dataset> Inner<D> {
    fn register(&mut self, kind: NodeKind, slot: usize, node: NodeOps) {
        let processor = &mut self.processors[slot];
        match kind {
            NodeKind::Column => processor.push_column(node),
            NodeKind::Selection => processor.push_selection(node),
            NodeKind::Query => processor.push_query(node),
        }
        // Any registration after a completed analyze means the graph has
        // grown since results were last merged; the next result access must
        // trigger another pass.
        self.analyzed = false;
    }

    fn register_selection_path(&mut self, path: &str) -> GraphResult<()> {
        if !self.selection_paths.insert(path.to_string()) {
            return Err(GraphError::DuplicateSelectionPath(path.to_string()));
        }
        Ok(())
    }

    fn analyze(&mut self) -> GraphResult<()> {
        if self.analyzed {
            return Ok(());
        }
        let span = tracing::debug_span!("analyze", concurrency = self.processors.len());
        let _guard = span.enter();
        self.dataset.initialize();
        let ranges = self.partition.clone();
        if self.processors.len() <= 1 {
            for (range, processor) in ranges.iter().zip(self.processors.iter_mut()) {
                processor.process(range);
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.processors.len())
                .build()
                .map_err(|e| GraphError::ThreadPoolInit(e.to_string()))?;
            pool.scope(|scope| {
                for (range, processor) in ranges.iter().zip(self.processors.iter_mut()) {
                    scope.spawn(move |_| processor.process(range));
                }
            });
        }
        self.dataset.finalize();
        self.analyzed = true;
        Ok(())
    }
}

/// Wraps `Inner<D>` behind a `Mutex` so it can be exposed as `Arc<dyn
/// GraphDriver>` to dataset-agnostic handles.
pub(crate) struct DriverCell<D: Dataset> {
    inner: Mutex<Inner<D>>,
}

impl<D: Dataset> DriverCell<D> {
    pub fn new(inner: Inner<D>) -> Self {
        DriverCell { inner: Mutex::new(inner) }
    }

    pub fn partition(&self) -> Partition {
        self.inner.lock().partition().clone()
    }
}

impl<D: Dataset + 'static> GraphDriver for DriverCell<D> {
    fn concurrency(&self) -> usize {
        self.inner.lock().processors.len()
    }

    fn register(&self, kind: NodeKind, slot: usize, node: NodeOps) {
        self.inner.lock().register(kind, slot, node);
    }

    fn register_selection_path(&self, path: &str) -> GraphResult<()> {
        self.inner.lock().register_selection_path(path)
    }

    fn analyze(&self) -> GraphResult<()> {
        self.inner.lock().analyze()
    }
}
