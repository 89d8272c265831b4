//! User-facing handles: [`Column`], [`Selection`], [`Query`], and the
//! `Delayed*` factories that produce them once their inputs are known.
//!
//! None of these types own a node's lifetime directly; each wraps a
//! [`Lockstep`] of one model replica plus N per-slot replicas (see
//! [`crate::lockstep`]), plus a type-erased [`SharedDriver`] back-reference
//! used to register new slot nodes and to trigger [`crate::dataflow::Dataflow`]'s
//! `analyze()` on first result access. The model replica is built the same
//! way as a slot but is never registered with the driver, so it never
//! executes per-row; it exists to be the authority for shape-invariant,
//! read-only values such as a selection's name, channel flag, and path.
//! Building a handle (`read`, `constant`, `evaluate`, `apply`, `book`) is
//! cheap and does not touch the dataset; only `Query::result()` does.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::{NodeKind, SharedDriver};
use crate::error::{GraphError, GraphResult};
use crate::lockstep::Lockstep;
use crate::node::column::{self, ColumnNode};
use crate::node::query::{self, FillableQuery, QueryNodeErased, QueryOutput};
use crate::node::selection::{SelectionKind, SelectionNode};
use crate::node::{ColumnValue, NodeOps, SharedColumn, SharedQuery, SharedSelection};

/// A fully-specified column: one model replica plus one replica per slot,
/// registered with the dataflow but not yet executed. Cheap to clone (an
/// `Arc` per replica).
pub struct Column<T> {
    pub(crate) driver: SharedDriver,
    pub(crate) nodes: Lockstep<SharedColumn<T>>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Column {
            driver: Arc::clone(&self.driver),
            nodes: Lockstep::from_parts(Arc::clone(self.nodes.model()), self.nodes.slots().to_vec()),
        }
    }
}

impl<T: ColumnValue> Column<T> {
    pub(crate) fn from_lockstep(driver: SharedDriver, nodes: Lockstep<SharedColumn<T>>) -> Self {
        Column { driver, nodes }
    }

    /// Number of per-slot node instances backing this handle (excludes the
    /// model replica).
    pub fn concurrency(&self) -> usize {
        self.nodes.concurrency()
    }
}

/// A column evaluator waiting on one upstream column of type `A`.
///
/// Produced by [`crate::Dataflow::define1`]; `.evaluate(input)` binds the
/// actual column and emits the computed [`Column<R>`].
pub struct DelayedColumn1<A, R> {
    pub(crate) driver: SharedDriver,
    pub(crate) func: Arc<dyn Fn(&A) -> R + Send + Sync>,
}

impl<A: ColumnValue, R: ColumnValue> DelayedColumn1<A, R> {
    pub fn evaluate(&self, input: &Column<A>) -> Column<R> {
        let model = self.computed_node(Arc::clone(input.nodes.model()));
        let mut slots = Vec::with_capacity(input.nodes.slots().len());
        for (slot, input_slot) in input.nodes.slots().iter().enumerate() {
            let shared = self.computed_node(Arc::clone(input_slot));
            self.driver.register(NodeKind::Column, slot, NodeOps::from_column(Arc::clone(&shared)));
            slots.push(shared);
        }
        Column::from_lockstep(Arc::clone(&self.driver), Lockstep::from_parts(model, slots))
    }

    fn computed_node(&self, input: SharedColumn<A>) -> SharedColumn<R> {
        let computed = column::Computed1::new(input, Arc::clone(&self.func));
        let boxed: Box<dyn ColumnNode<R> + Send> = Box::new(computed);
        Arc::new(Mutex::new(boxed))
    }
}

/// A column evaluator waiting on two upstream columns.
pub struct DelayedColumn2<A, B, R> {
    pub(crate) driver: SharedDriver,
    pub(crate) func: Arc<dyn Fn(&A, &B) -> R + Send + Sync>,
}

impl<A: ColumnValue, B: ColumnValue, R: ColumnValue> DelayedColumn2<A, B, R> {
    pub fn evaluate(&self, a: &Column<A>, b: &Column<B>) -> Column<R> {
        assert_eq!(a.nodes.concurrency(), b.nodes.concurrency(), "evaluate: inputs have mismatched slot counts");
        let model = self.computed_node(Arc::clone(a.nodes.model()), Arc::clone(b.nodes.model()));
        let mut slots = Vec::with_capacity(a.nodes.slots().len());
        for (slot, (a_slot, b_slot)) in a.nodes.slots().iter().zip(b.nodes.slots().iter()).enumerate() {
            let shared = self.computed_node(Arc::clone(a_slot), Arc::clone(b_slot));
            self.driver.register(NodeKind::Column, slot, NodeOps::from_column(Arc::clone(&shared)));
            slots.push(shared);
        }
        Column::from_lockstep(Arc::clone(&self.driver), Lockstep::from_parts(model, slots))
    }

    fn computed_node(&self, a: SharedColumn<A>, b: SharedColumn<B>) -> SharedColumn<R> {
        let computed = column::Computed2::new(a, b, Arc::clone(&self.func));
        let boxed: Box<dyn ColumnNode<R> + Send> = Box::new(computed);
        Arc::new(Mutex::new(boxed))
    }
}

/// A column evaluator waiting on three upstream columns.
pub struct DelayedColumn3<A, B, C, R> {
    pub(crate) driver: SharedDriver,
    pub(crate) func: Arc<dyn Fn(&A, &B, &C) -> R + Send + Sync>,
}

impl<A: ColumnValue, B: ColumnValue, C: ColumnValue, R: ColumnValue> DelayedColumn3<A, B, C, R> {
    pub fn evaluate(&self, a: &Column<A>, b: &Column<B>, c: &Column<C>) -> Column<R> {
        assert_eq!(a.nodes.concurrency(), b.nodes.concurrency(), "evaluate: inputs have mismatched slot counts");
        assert_eq!(a.nodes.concurrency(), c.nodes.concurrency(), "evaluate: inputs have mismatched slot counts");
        let model = self.computed_node(Arc::clone(a.nodes.model()), Arc::clone(b.nodes.model()), Arc::clone(c.nodes.model()));
        let mut slots = Vec::with_capacity(a.nodes.slots().len());
        for (slot, ((a_slot, b_slot), c_slot)) in
            a.nodes.slots().iter().zip(b.nodes.slots().iter()).zip(c.nodes.slots().iter()).enumerate()
        {
            let shared = self.computed_node(Arc::clone(a_slot), Arc::clone(b_slot), Arc::clone(c_slot));
            self.driver.register(NodeKind::Column, slot, NodeOps::from_column(Arc::clone(&shared)));
            slots.push(shared);
        }
        Column::from_lockstep(Arc::clone(&self.driver), Lockstep::from_parts(model, slots))
    }

    fn computed_node(&self, a: SharedColumn<A>, b: SharedColumn<B>, c: SharedColumn<C>) -> SharedColumn<R> {
        let computed = column::Computed3::new(a, b, c, Arc::clone(&self.func));
        let boxed: Box<dyn ColumnNode<R> + Send> = Box::new(computed);
        Arc::new(Mutex::new(boxed))
    }
}

/// A selection: a node in a cut/weight chain, with a unique [`path`](Selection::path)
/// derived from its channel ancestors.
pub struct Selection {
    pub(crate) driver: SharedDriver,
    pub(crate) path: String,
    pub(crate) nodes: Lockstep<SharedSelection>,
}

impl Clone for Selection {
    fn clone(&self) -> Self {
        Selection {
            driver: Arc::clone(&self.driver),
            path: self.path.clone(),
            nodes: Lockstep::from_parts(Arc::clone(self.nodes.model()), self.nodes.slots().to_vec()),
        }
    }
}

impl Selection {
    /// `/`-joined channel ancestors plus this selection's own name, read off
    /// the model replica at construction time.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cross-checked against every slot via [`Lockstep::get_model_value`]:
    /// all replicas of one logical selection must agree on their own name.
    pub fn name(&self) -> String {
        self.nodes.get_model_value(|n| n.lock().name().to_string())
    }

    pub fn is_channel(&self) -> bool {
        self.nodes.get_model_value(|n| n.lock().channel())
    }

    pub fn concurrency(&self) -> usize {
        self.nodes.concurrency()
    }
}

/// A pending selection applicator: a name, a cut/weight decision, and
/// whether it publishes into descendants' paths. Produced by
/// [`crate::Dataflow::filter1`]/`channel_filter1`/`weight1`/`channel_weight1`;
/// `.apply(parent, input)` binds the parent selection and decision column.
pub struct DelayedFilter1<A> {
    pub(crate) driver: SharedDriver,
    pub(crate) name: String,
    pub(crate) channel: bool,
    pub(crate) kind: SelectionKind,
    pub(crate) expr: Arc<dyn Fn(&A) -> f64 + Send + Sync>,
}

impl<A: ColumnValue> DelayedFilter1<A> {
    /// Binds this filter to a parent selection (if any) and a decision
    /// column, registering its path in the graph's selection-path registry.
    /// Errors if another selection already occupies that path.
    pub fn apply(&self, parent: Option<&Selection>, input: &Column<A>) -> GraphResult<Selection> {
        let (path, model) = self.build_model(parent, input);
        self.driver.register_selection_path(&path)?;
        let slots = self.build_slots(parent, input);
        Ok(Selection { driver: Arc::clone(&self.driver), path, nodes: Lockstep::from_parts(model, slots) })
    }

    /// Like [`DelayedFilter1::apply`], but for a systematic-variation replica
    /// of an already-registered nominal path: a variation shares its
    /// nominal's identity in the selection-path registry rather than
    /// competing for a second registration of the same path.
    pub(crate) fn apply_variation(&self, parent: Option<&Selection>, input: &Column<A>) -> Selection {
        let (path, model) = self.build_model(parent, input);
        let slots = self.build_slots(parent, input);
        Selection { driver: Arc::clone(&self.driver), path, nodes: Lockstep::from_parts(model, slots) }
    }

    /// Builds the model replica (never registered with the driver, never
    /// executed) and reads its authoritative path by walking the real parent
    /// chain via [`SelectionNode::path`] — the same computation a slot
    /// replica would perform, just against the model's parent.
    fn build_model(&self, parent: Option<&Selection>, input: &Column<A>) -> (String, SharedSelection) {
        let decision = column::Computed1::new(Arc::clone(input.nodes.model()), Arc::clone(&self.expr));
        let decision_boxed: Box<dyn ColumnNode<f64> + Send> = Box::new(decision);
        let decision_shared: SharedColumn<f64> = Arc::new(Mutex::new(decision_boxed));

        let parent_model = parent.map(|p| Arc::clone(p.nodes.model()));
        let node = SelectionNode::new(self.kind, decision_shared, parent_model, self.name.clone(), self.channel);
        let model: SharedSelection = Arc::new(Mutex::new(node));
        let path = model.lock().path();
        (path, model)
    }

    fn build_slots(&self, parent: Option<&Selection>, input: &Column<A>) -> Vec<SharedSelection> {
        let mut slots = Vec::with_capacity(input.nodes.slots().len());
        for (slot, input_slot) in input.nodes.slots().iter().enumerate() {
            let decision = column::Computed1::new(Arc::clone(input_slot), Arc::clone(&self.expr));
            let decision_boxed: Box<dyn ColumnNode<f64> + Send> = Box::new(decision);
            let decision_shared: SharedColumn<f64> = Arc::new(Mutex::new(decision_boxed));
            self.driver.register(NodeKind::Column, slot, NodeOps::from_column(Arc::clone(&decision_shared)));

            let parent_slot = parent.map(|p| Arc::clone(&p.nodes.slots()[slot]));
            let node = SelectionNode::new(self.kind, decision_shared, parent_slot, self.name.clone(), self.channel);
            let shared: SharedSelection = Arc::new(Mutex::new(node));
            self.driver.register(NodeKind::Selection, slot, NodeOps::from_selection(Arc::clone(&shared)));
            slots.push(shared);
        }
        slots
    }
}

/// A query terminal: one model replica plus one per-slot result, merged on
/// demand from the slots (the model replica never executes and takes no
/// part in the merge; it exists only to complete the N+1-instance shape
/// every node family shares).
pub struct Query<R> {
    pub(crate) driver: SharedDriver,
    pub(crate) path: String,
    pub(crate) nodes: Lockstep<SharedQuery<R>>,
    pub(crate) merge: fn(Vec<R>) -> R,
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Query {
            driver: Arc::clone(&self.driver),
            path: self.path.clone(),
            nodes: Lockstep::from_parts(Arc::clone(self.nodes.model()), self.nodes.slots().to_vec()),
            merge: self.merge,
        }
    }
}

impl<R: Send + Clone + 'static> Query<R> {
    /// Path of the selection this query is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Triggers `analyze()` (a no-op if the dataset was already passed over
    /// since the last booking) and merges every slot's partial result.
    pub fn result(&self) -> GraphResult<R> {
        self.driver.analyze()?;
        let slots = self.nodes.slots();
        if slots.is_empty() {
            return Err(GraphError::ZeroSlotMerge(self.path.clone()));
        }
        let partials: Vec<R> = slots.iter().map(|slot| slot.lock().result()).collect();
        Ok((self.merge)(partials))
    }
}

/// A query output factory with no recorded fill columns.
///
/// Produced by [`crate::Dataflow::book0`]; `.at(selection)` books a
/// concrete [`Query`], `.fill1(column)` records a fill column and returns a
/// [`Booker1`], and `.at_many(selections)` books one query per selection.
pub struct Booker0<Q: QueryOutput> {
    pub(crate) driver: SharedDriver,
    pub(crate) make: Arc<dyn Fn() -> Q + Send + Sync>,
}

impl<Q: QueryOutput + 'static> Booker0<Q> {
    pub fn fill1<A: ColumnValue>(&self, input: &Column<A>) -> Booker1<Q, A>
    where
        Q: FillableQuery<(A,)>,
    {
        Booker1 { driver: Arc::clone(&self.driver), make: Arc::clone(&self.make), fill_input: input.clone() }
    }

    pub fn at(&self, selection: &Selection) -> Query<Q::Result> {
        let model = {
            let inner = (self.make)();
            let node = query::QueryNode0::new(Arc::clone(selection.nodes.model()), inner);
            let boxed: Box<dyn QueryNodeErased<Q::Result> + Send> = Box::new(node);
            Arc::new(Mutex::new(boxed))
        };
        let mut slots = Vec::with_capacity(selection.nodes.slots().len());
        for (slot, sel_slot) in selection.nodes.slots().iter().enumerate() {
            let inner = (self.make)();
            let node = query::QueryNode0::new(Arc::clone(sel_slot), inner);
            let boxed: Box<dyn QueryNodeErased<Q::Result> + Send> = Box::new(node);
            let shared: SharedQuery<Q::Result> = Arc::new(Mutex::new(boxed));
            self.driver.register(NodeKind::Query, slot, NodeOps::from_query(Arc::clone(&shared)));
            slots.push(shared);
        }
        Query { driver: Arc::clone(&self.driver), path: selection.path.clone(), nodes: Lockstep::from_parts(model, slots), merge: Q::merge }
    }

    pub fn at_many(&self, selections: &[&Selection]) -> GraphResult<Bookkeeper<Q::Result>> {
        book_many(selections, |s| self.at(s))
    }
}

/// A query output factory with one recorded fill column of type `A`.
pub struct Booker1<Q, A> {
    pub(crate) driver: SharedDriver,
    pub(crate) make: Arc<dyn Fn() -> Q + Send + Sync>,
    pub(crate) fill_input: Column<A>,
}

impl<Q, A> Booker1<Q, A>
where
    Q: FillableQuery<(A,)> + 'static,
    A: ColumnValue,
{
    pub fn at(&self, selection: &Selection) -> Query<Q::Result> {
        let model = {
            let inner = (self.make)();
            let fill_col = Arc::clone(self.fill_input.nodes.model());
            let node = query::QueryNode1::new(Arc::clone(selection.nodes.model()), inner, fill_col);
            let boxed: Box<dyn QueryNodeErased<Q::Result> + Send> = Box::new(node);
            Arc::new(Mutex::new(boxed))
        };
        let mut slots = Vec::with_capacity(selection.nodes.slots().len());
        for (slot, sel_slot) in selection.nodes.slots().iter().enumerate() {
            let inner = (self.make)();
            let fill_col = Arc::clone(&self.fill_input.nodes.slots()[slot]);
            let node = query::QueryNode1::new(Arc::clone(sel_slot), inner, fill_col);
            let boxed: Box<dyn QueryNodeErased<Q::Result> + Send> = Box::new(node);
            let shared: SharedQuery<Q::Result> = Arc::new(Mutex::new(boxed));
            self.driver.register(NodeKind::Query, slot, NodeOps::from_query(Arc::clone(&shared)));
            slots.push(shared);
        }
        Query { driver: Arc::clone(&self.driver), path: selection.path.clone(), nodes: Lockstep::from_parts(model, slots), merge: Q::merge }
    }

    pub fn at_many(&self, selections: &[&Selection]) -> GraphResult<Bookkeeper<Q::Result>> {
        book_many(selections, |s| self.at(s))
    }
}

fn book_many<R>(selections: &[&Selection], mut at: impl FnMut(&Selection) -> Query<R>) -> GraphResult<Bookkeeper<R>> {
    let mut queries = HashMap::new();
    for selection in selections {
        let query = at(selection);
        if queries.insert(selection.path.clone(), query).is_some() {
            return Err(GraphError::DuplicateSelectionPath(selection.path.clone()));
        }
    }
    Ok(Bookkeeper { queries })
}

/// A selection-path → query map produced by `Booker::at_many`.
pub struct Bookkeeper<R> {
    queries: HashMap<String, Query<R>>,
}

impl<R> Bookkeeper<R> {
    pub fn get(&self, path: &str) -> Option<&Query<R>> {
        self.queries.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.queries.keys()
    }
}

impl<R> std::ops::Index<&str> for Bookkeeper<R> {
    type Output = Query<R>;

    fn index(&self, path: &str) -> &Query<R> {
        self.queries.get(path).unwrap_or_else(|| panic!("no query booked at selection path '{path}'"))
    }
}
