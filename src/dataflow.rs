//! The user-facing graph builder (C3): owns the dataset, the partition, and
//! the type-erased driver; exposes `read`/`constant`/`define`/`filter`/
//! `channel`/`weight`/`book` and materialises nodes into each slot's
//! [`crate::processor::Processor`] through [`crate::driver::GraphDriver`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::dataset::{ColumnSource, Dataset, Partition};
use crate::driver::{DriverCell, GraphDriver, Inner, NodeKind, SharedDriver};
use crate::error::GraphResult;
use crate::handles::{Booker0, Column, DelayedColumn1, DelayedColumn2, DelayedColumn3, DelayedFilter1, Selection};
use crate::lockstep::Lockstep;
use crate::node::column::{Constant, Reader};
use crate::node::query::QueryOutput;
use crate::node::selection::SelectionKind;
use crate::node::{ColumnValue, NodeOps, SharedColumn};

/// A dataflow graph bound to one dataset. Building handles (`read`,
/// `define`, `filter`, `book`, ...) never touches the dataset; only the
/// first `Query::result()` call does, via `analyze()`.
pub struct Dataflow<D: Dataset> {
    dataset: Arc<D>,
    partition: Partition,
    driver: SharedDriver,
}

impl<D: Dataset + 'static> Dataflow<D> {
    /// Builds a dataflow with concurrency resolved from the host's CPU
    /// count and no row limit.
    pub fn new(dataset: D) -> GraphResult<Self> {
        Self::with_concurrency(dataset, num_cpus::get().max(1), None)
    }

    /// Builds a dataflow with an explicit requested slot count and an
    /// optional row limit (see `Inner::new` for truncation semantics).
    pub fn with_concurrency(dataset: D, requested_concurrency: usize, row_limit: Option<u64>) -> GraphResult<Self> {
        let dataset = Arc::new(dataset);
        let inner = Inner::new(Arc::clone(&dataset), requested_concurrency, row_limit)?;
        let partition = inner.partition().clone();
        let driver: SharedDriver = Arc::new(DriverCell::new(inner));
        Ok(Dataflow { dataset, partition, driver })
    }

    /// Number of slots this dataflow's dataset was partitioned into.
    pub fn concurrency(&self) -> usize {
        self.driver.concurrency()
    }

    /// Reads column `name` from the dataset, one [`crate::node::column::Reader`]
    /// per slot plus one unregistered model replica (opened against the
    /// first partition range, since the model never executes a row).
    pub fn read<T: ColumnValue>(&self, name: impl Into<String>) -> GraphResult<Column<T>> {
        let name = name.into();
        let model_range = &self.partition[0];
        let model_source = self.dataset.read_column(&name, model_range)?;
        let model: SharedColumn<T> = {
            let boxed: Box<dyn crate::node::column::ColumnNode<T> + Send> = Box::new(Reader::new(model_source));
            Arc::new(Mutex::new(boxed))
        };

        let mut slots = Vec::with_capacity(self.partition.len());
        for range in &self.partition {
            let source: Box<dyn ColumnSource<T>> = self.dataset.read_column(&name, range)?;
            let reader = Reader::new(source);
            let boxed: Box<dyn crate::node::column::ColumnNode<T> + Send> = Box::new(reader);
            let shared: SharedColumn<T> = Arc::new(Mutex::new(boxed));
            self.driver.register(NodeKind::Column, range.slot, NodeOps::from_column(Arc::clone(&shared)));
            slots.push(shared);
        }
        Ok(Column::from_lockstep(Arc::clone(&self.driver), Lockstep::from_parts(model, slots)))
    }

    /// A column whose value is the same `value` on every row, of every slot
    /// (plus an unregistered model replica holding the same constant).
    pub fn constant<T: ColumnValue>(&self, value: T) -> Column<T> {
        let model: SharedColumn<T> = {
            let boxed: Box<dyn crate::node::column::ColumnNode<T> + Send> = Box::new(Constant::new(value.clone()));
            Arc::new(Mutex::new(boxed))
        };

        let mut slots = Vec::with_capacity(self.partition.len());
        for range in &self.partition {
            let boxed: Box<dyn crate::node::column::ColumnNode<T> + Send> = Box::new(Constant::new(value.clone()));
            let shared: SharedColumn<T> = Arc::new(Mutex::new(boxed));
            self.driver.register(NodeKind::Column, range.slot, NodeOps::from_column(Arc::clone(&shared)));
            slots.push(shared);
        }
        Column::from_lockstep(Arc::clone(&self.driver), Lockstep::from_parts(model, slots))
    }

    /// A pending one-argument column evaluator; `.evaluate(input)` binds
    /// the upstream column and emits the computed [`Column<R>`].
    pub fn define1<A: ColumnValue, R: ColumnValue>(
        &self,
        func: impl Fn(&A) -> R + Send + Sync + 'static,
    ) -> DelayedColumn1<A, R> {
        DelayedColumn1 { driver: Arc::clone(&self.driver), func: Arc::new(func) }
    }

    /// A pending two-argument column evaluator.
    pub fn define2<A: ColumnValue, B: ColumnValue, R: ColumnValue>(
        &self,
        func: impl Fn(&A, &B) -> R + Send + Sync + 'static,
    ) -> DelayedColumn2<A, B, R> {
        DelayedColumn2 { driver: Arc::clone(&self.driver), func: Arc::new(func) }
    }

    /// A pending three-argument column evaluator.
    pub fn define3<A: ColumnValue, B: ColumnValue, C: ColumnValue, R: ColumnValue>(
        &self,
        func: impl Fn(&A, &B, &C) -> R + Send + Sync + 'static,
    ) -> DelayedColumn3<A, B, C, R> {
        DelayedColumn3 { driver: Arc::clone(&self.driver), func: Arc::new(func) }
    }

    /// A pending cut: rows pass when `expr` is truthy, weight is inherited
    /// from the parent unchanged. Does not contribute to descendants' paths.
    pub fn filter1<A: ColumnValue>(
        &self,
        name: impl Into<String>,
        expr: impl Fn(&A) -> bool + Send + Sync + 'static,
    ) -> DelayedFilter1<A> {
        self.selection1(name, false, SelectionKind::Cut, move |a| if expr(a) { 1.0 } else { 0.0 })
    }

    /// Like [`Dataflow::filter1`], but publishes `name` into descendants'
    /// selection paths.
    pub fn channel_filter1<A: ColumnValue>(
        &self,
        name: impl Into<String>,
        expr: impl Fn(&A) -> bool + Send + Sync + 'static,
    ) -> DelayedFilter1<A> {
        self.selection1(name, true, SelectionKind::Cut, move |a| if expr(a) { 1.0 } else { 0.0 })
    }

    /// A pending weight: rows always pass, weight is scaled by `expr`'s
    /// current value.
    pub fn weight1<A: ColumnValue>(
        &self,
        name: impl Into<String>,
        expr: impl Fn(&A) -> f64 + Send + Sync + 'static,
    ) -> DelayedFilter1<A> {
        self.selection1(name, false, SelectionKind::Weight, expr)
    }

    /// Like [`Dataflow::weight1`], but publishes `name` into descendants'
    /// selection paths.
    pub fn channel_weight1<A: ColumnValue>(
        &self,
        name: impl Into<String>,
        expr: impl Fn(&A) -> f64 + Send + Sync + 'static,
    ) -> DelayedFilter1<A> {
        self.selection1(name, true, SelectionKind::Weight, expr)
    }

    fn selection1<A: ColumnValue>(
        &self,
        name: impl Into<String>,
        channel: bool,
        kind: SelectionKind,
        expr: impl Fn(&A) -> f64 + Send + Sync + 'static,
    ) -> DelayedFilter1<A> {
        DelayedFilter1 { driver: Arc::clone(&self.driver), name: name.into(), channel, kind, expr: Arc::new(expr) }
    }

    /// Convenience root selection: every row passes, with weight seeded
    /// from the dataset's [`Dataset::normalize`] (1.0 unless the dataset
    /// overrides it), so a dataset built with a non-unit normalization
    /// weight scales every selection and query descending from the root.
    pub fn root(&self) -> GraphResult<Selection> {
        let normalize = self.constant(self.dataset.normalize());
        self.weight1("root", |w: &f64| *w).apply(None, &normalize)
    }

    /// A pending query output with no recorded fill columns.
    pub fn book0<Q: QueryOutput + 'static>(&self, make: impl Fn() -> Q + Send + Sync + 'static) -> Booker0<Q> {
        Booker0 { driver: Arc::clone(&self.driver), make: Arc::new(make) }
    }
}
