//! Per-slot driver of the three node lists over a row range.

use crate::dataset::RowReader;
use crate::node::{AnyNode, NodeOps, Range};

/// Holds one slot's columns, selections, and queries in insertion order, and
/// runs the full initialize/execute.../finalize pass over a [`Range`].
///
/// The three lists are kept separate (rather than one combined list) so
/// that columns always execute before the selections that read them, and
/// selections always execute before the queries that read them, regardless
/// of the order a user interleaves `read`/`filter`/`book` calls referring to
/// unrelated parts of the graph.
pub struct Processor {
    reader: Box<dyn RowReader>,
    columns: Vec<NodeOps>,
    selections: Vec<NodeOps>,
    queries: Vec<NodeOps>,
}

impl Processor {
    pub fn new(reader: Box<dyn RowReader>) -> Self {
        Processor { reader, columns: Vec::new(), selections: Vec::new(), queries: Vec::new() }
    }

    pub fn push_column(&mut self, node: NodeOps) {
        self.columns.push(node);
    }

    pub fn push_selection(&mut self, node: NodeOps) {
        self.selections.push(node);
    }

    pub fn push_query(&mut self, node: NodeOps) {
        self.queries.push(node);
    }

    /// Runs one full pass over `range`: dataset reader open, per-range
    /// initialize, a per-row loop advancing every live node in insertion
    /// order, per-range finalize, reader close.
    pub fn process(&mut self, range: &Range) {
        self.reader.start(range);
        for node in self.all_nodes_mut() {
            node.initialize(range);
        }
        for entry in range.begin..range.end {
            self.reader.read(range, entry);
            for node in &mut self.columns {
                node.execute(range, entry);
            }
            for node in &mut self.selections {
                node.execute(range, entry);
            }
            for node in &mut self.queries {
                node.execute(range, entry);
            }
        }
        for node in self.all_nodes_mut() {
            node.finalize(range);
        }
        self.reader.finish(range);
    }

    fn all_nodes_mut(&mut self) -> impl Iterator<Item = &mut NodeOps> {
        self.columns.iter_mut().chain(self.selections.iter_mut()).chain(self.queries.iter_mut())
    }
}
