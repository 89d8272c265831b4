//! Query nodes: accumulate one result per slot, merged associatively.

use super::{AnyNode, Range, SharedColumn, SharedSelection};

/// A query output accumulates state across the rows of its bound selection
/// and reduces to a single result, associatively mergeable across slots.
pub trait QueryOutput: Send {
    type Result: Send + Clone + 'static;

    /// Called on every row where the bound selection passes.
    fn count(&mut self, weight: f64);

    /// Current per-slot result.
    fn result(&self) -> Self::Result;

    /// Combines partial results from any number of slots (order-independent,
    /// associative) into the merged result.
    fn merge(partials: Vec<Self::Result>) -> Self::Result;
}

/// A query output that additionally consumes one or more fill-column tuples
/// each time its selection passes.
pub trait FillableQuery<Args>: QueryOutput {
    fn fill(&mut self, args: Args, weight: f64);
}

/// Type-erased access to a query's per-slot result, used when merging across
/// the slots of a [`crate::lockstep::Lockstep`].
pub trait QueryNodeErased<R>: AnyNode {
    fn result(&self) -> R;
}

/// A query with no fill columns (e.g. [`crate::queries::Count`]).
pub struct QueryNode0<Q: QueryOutput> {
    selection: SharedSelection,
    inner: Q,
}

impl<Q: QueryOutput> QueryNode0<Q> {
    pub fn new(selection: SharedSelection, inner: Q) -> Self {
        QueryNode0 { selection, inner }
    }
}

impl<Q: QueryOutput> AnyNode for QueryNode0<Q> {
    fn execute(&mut self, _range: &Range, _entry: u64) {
        let selection = self.selection.lock();
        if selection.passed() {
            let weight = selection.weight();
            drop(selection);
            self.inner.count(weight);
        }
    }
}

impl<Q: QueryOutput<Result = R>, R: Send + Clone + 'static> QueryNodeErased<R> for QueryNode0<Q> {
    fn result(&self) -> R {
        self.inner.result()
    }
}

/// A query filled from one column per passing row.
pub struct QueryNode1<Q, A>
where
    Q: FillableQuery<(A,)>,
{
    selection: SharedSelection,
    inner: Q,
    fill_input: SharedColumn<A>,
}

impl<Q, A> QueryNode1<Q, A>
where
    Q: FillableQuery<(A,)>,
{
    pub fn new(selection: SharedSelection, inner: Q, fill_input: SharedColumn<A>) -> Self {
        QueryNode1 { selection, inner, fill_input }
    }
}

impl<Q, A> AnyNode for QueryNode1<Q, A>
where
    Q: FillableQuery<(A,)>,
    A: Clone + Send + Sync + 'static,
{
    fn execute(&mut self, _range: &Range, _entry: u64) {
        // The fill column is executed earlier in the same row by the
        // processor's column list; only its already-current value is read
        // here.
        let selection = self.selection.lock();
        if selection.passed() {
            let weight = selection.weight();
            drop(selection);
            self.inner.count(weight);
            let value = self.fill_input.lock().value().clone();
            self.inner.fill((value,), weight);
        }
    }
}

impl<Q, A> QueryNodeErased<Q::Result> for QueryNode1<Q, A>
where
    Q: FillableQuery<(A,)>,
    A: Clone + Send + Sync + 'static,
{
    fn result(&self) -> Q::Result {
        self.inner.result()
    }
}
