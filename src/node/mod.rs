//! Per-row node lifecycle shared by columns, selections, and queries.

use std::sync::Arc;

pub mod column;
pub mod query;
pub mod selection;

/// A contiguous, half-open span of dataset rows assigned to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub slot: usize,
    pub begin: u64,
    pub end: u64,
}

impl Range {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }
}

/// A list of [`Range`]s, one per slot, covering a dataset (or a truncated
/// prefix of it when a row limit is in effect).
pub type Partition = Vec<Range>;

/// Bound satisfied by every value a column may hold.
pub trait ColumnValue: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> ColumnValue for T {}

/// Type-erased per-row lifecycle implemented by every concrete node kind
/// (columns, selections, queries). A [`crate::processor::Processor`] drives
/// three ordered lists of `AnyNode` trait objects, one per node category.
pub trait AnyNode: Send {
    /// Called once per range before the first row is processed.
    fn initialize(&mut self, _range: &Range) {}

    /// Called once per row, in insertion order within each node category.
    fn execute(&mut self, range: &Range, entry: u64);

    /// Called once per range after the last row is processed.
    fn finalize(&mut self, _range: &Range) {}
}

/// A node reachable from multiple owners (sibling computed columns, a
/// processor's scheduling list, a downstream selection/query) behind a
/// mutex rather than a `RefCell`, since the whole per-slot subgraph is
/// handed to a worker thread once `run_slots` dispatches.
///
/// Trait objects need an extra `Box` layer here because `parking_lot::Mutex`
/// does not support unsized coercion directly; `Box<dyn Trait>` does, so the
/// box is constructed once at the trait-object boundary and the mutex wraps
/// that.
pub type Shared<T> = std::sync::Arc<parking_lot::Mutex<T>>;

/// A shared, typed column node.
pub type SharedColumn<T> = Shared<Box<dyn column::ColumnNode<T> + Send>>;

/// A shared, typed query node.
pub type SharedQuery<R> = Shared<Box<dyn query::QueryNodeErased<R> + Send>>;

/// A shared selection node (concrete, no trait object needed: there is only
/// one selection implementation).
pub type SharedSelection = Shared<selection::SelectionNode>;

/// A type-erased per-row lifecycle, closing over a [`SharedColumn`],
/// [`SharedSelection`], or [`SharedQuery`] instance.
///
/// A [`crate::processor::Processor`] needs one homogeneous list per node
/// category regardless of a column's value type `T` or a query's result
/// type `R`. Rather than coercing `Box<dyn ColumnNode<T>>` down to
/// `Box<dyn AnyNode>` (which would need an extra indirection for every typed
/// node kind in the graph), each `NodeOps` just closes over the already-typed
/// `Shared<...>` handle and dispatches through it directly; the processor
/// drives `NodeOps` uniformly and the handle layer (`crate::handles`) keeps
/// its own typed clone of the same `Shared<...>` to read values back out.
pub struct NodeOps {
    init: Box<dyn FnMut(&Range) + Send>,
    exec: Box<dyn FnMut(&Range, u64) + Send>,
    fin: Box<dyn FnMut(&Range) + Send>,
}

impl NodeOps {
    pub fn from_column<T: ColumnValue>(node: SharedColumn<T>) -> Self {
        let (i, e, f) = (Arc::clone(&node), Arc::clone(&node), node);
        NodeOps {
            init: Box::new(move |range| i.lock().initialize(range)),
            exec: Box::new(move |range, entry| e.lock().execute(range, entry)),
            fin: Box::new(move |range| f.lock().finalize(range)),
        }
    }

    pub fn from_selection(node: SharedSelection) -> Self {
        let (i, e, f) = (Arc::clone(&node), Arc::clone(&node), node);
        NodeOps {
            init: Box::new(move |range| i.lock().initialize(range)),
            exec: Box::new(move |range, entry| e.lock().execute(range, entry)),
            fin: Box::new(move |range| f.lock().finalize(range)),
        }
    }

    pub fn from_query<R: Send + Clone + 'static>(node: SharedQuery<R>) -> Self {
        let (i, e, f) = (Arc::clone(&node), Arc::clone(&node), node);
        NodeOps {
            init: Box::new(move |range| i.lock().initialize(range)),
            exec: Box::new(move |range, entry| e.lock().execute(range, entry)),
            fin: Box::new(move |range| f.lock().finalize(range)),
        }
    }
}

impl AnyNode for NodeOps {
    fn initialize(&mut self, range: &Range) {
        (self.init)(range);
    }

    fn execute(&mut self, range: &Range, entry: u64) {
        (self.exec)(range, entry);
    }

    fn finalize(&mut self, range: &Range) {
        (self.fin)(range);
    }
}
