//! Systematic variation broadcasting (C5): a nominal value plus named
//! alternates, composed through the same `Delayed*`/`Booker*` builders used
//! for the nominal graph.
//!
//! Every `*_varied` method below follows the same shape: evaluate the
//! nominal once, then evaluate once more per variation name in the union of
//! all varied inputs, falling back to an input's nominal wherever it does
//! not carry that name itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::GraphResult;
use crate::handles::{Booker0, Booker1, Column, DelayedColumn1, DelayedColumn2, DelayedColumn3, DelayedFilter1, Query, Selection};
use crate::node::query::{FillableQuery, QueryOutput};
use crate::node::ColumnValue;

/// A nominal value plus zero or more named alternates.
#[derive(Debug, Clone)]
pub struct Varied<T> {
    nominal: T,
    variations: HashMap<String, T>,
}

impl<T: Clone> Varied<T> {
    pub fn new(nominal: T) -> Self {
        Varied { nominal, variations: HashMap::new() }
    }

    pub fn nominal(&self) -> &T {
        &self.nominal
    }

    pub fn with_variation(mut self, name: impl Into<String>, value: T) -> Self {
        self.variations.insert(name.into(), value);
        self
    }

    /// The named alternate, or the nominal if `name` was never supplied.
    pub fn get(&self, name: &str) -> &T {
        self.variations.get(name).unwrap_or(&self.nominal)
    }

    pub fn variation_names(&self) -> impl Iterator<Item = &String> {
        self.variations.keys()
    }
}

fn union_of<T: Clone>(inputs: &[&Varied<T>]) -> HashSet<String> {
    let mut names = HashSet::new();
    for v in inputs {
        names.extend(v.variation_names().cloned());
    }
    names
}

impl<T: ColumnValue> Column<T> {
    /// Wraps this column as the nominal of a [`Varied`], with one named
    /// alternate.
    pub fn vary(&self, name: impl Into<String>, alternate: Column<T>) -> Varied<Column<T>> {
        Varied::new(self.clone()).with_variation(name, alternate)
    }
}

impl<A: ColumnValue, R: ColumnValue> DelayedColumn1<A, R> {
    pub fn evaluate_varied(&self, input: &Varied<Column<A>>) -> Varied<Column<R>> {
        let mut varied = Varied::new(self.evaluate(input.nominal()));
        for name in input.variation_names() {
            varied = varied.with_variation(name.clone(), self.evaluate(input.get(name)));
        }
        varied
    }
}

impl<A: ColumnValue, B: ColumnValue, R: ColumnValue> DelayedColumn2<A, B, R> {
    pub fn evaluate_varied(&self, a: &Varied<Column<A>>, b: &Varied<Column<B>>) -> Varied<Column<R>> {
        let mut varied = Varied::new(self.evaluate(a.nominal(), b.nominal()));
        for name in union_of(&[a, b]) {
            varied = varied.with_variation(name.clone(), self.evaluate(a.get(&name), b.get(&name)));
        }
        varied
    }
}

impl<A: ColumnValue, B: ColumnValue, C: ColumnValue, R: ColumnValue> DelayedColumn3<A, B, C, R> {
    pub fn evaluate_varied(
        &self,
        a: &Varied<Column<A>>,
        b: &Varied<Column<B>>,
        c: &Varied<Column<C>>,
    ) -> Varied<Column<R>> {
        let mut varied = Varied::new(self.evaluate(a.nominal(), b.nominal(), c.nominal()));
        for name in union_of(&[a, b, c]) {
            varied = varied.with_variation(name.clone(), self.evaluate(a.get(&name), b.get(&name), c.get(&name)));
        }
        varied
    }
}

impl<A: ColumnValue> DelayedFilter1<A> {
    /// Like [`DelayedFilter1::apply`], broadcast across the union of
    /// `parent`'s and `input`'s variation names. A name present in only one
    /// of the two is applied against the other's nominal.
    pub fn apply_varied(
        &self,
        parent: Option<&Varied<Selection>>,
        input: &Varied<Column<A>>,
    ) -> GraphResult<Varied<Selection>> {
        let parent_nominal = parent.map(Varied::nominal);
        let mut varied = Varied::new(self.apply(parent_nominal, input.nominal())?);

        let mut names = union_of(&[input]);
        if let Some(p) = parent {
            names.extend(p.variation_names().cloned());
        }
        for name in names {
            let parent_slot = parent.map(|p| p.get(&name));
            let selection = self.apply_variation(parent_slot, input.get(&name));
            varied = varied.with_variation(name, selection);
        }
        Ok(varied)
    }
}

impl<Q: QueryOutput + 'static> Booker0<Q> {
    /// Books one query per variation name of `selection`, plus the nominal.
    pub fn at_varied(&self, selection: &Varied<Selection>) -> Varied<Query<Q::Result>> {
        let mut varied = Varied::new(self.at(selection.nominal()));
        for name in selection.variation_names() {
            varied = varied.with_variation(name.clone(), self.at(selection.get(name)));
        }
        varied
    }

    /// Records a varied fill column: the eventual [`VariedBooker1::at`] books
    /// one query per variation name of `input`, each filled from that
    /// variation's own column.
    pub fn fill1_varied<A: ColumnValue>(&self, input: &Varied<Column<A>>) -> VariedBooker1<Q, A>
    where
        Q: FillableQuery<(A,)>,
    {
        VariedBooker1 { booker: Booker0 { driver: Arc::clone(&self.driver), make: Arc::clone(&self.make) }, fill_input: input.clone() }
    }
}

/// A query output factory with a varied fill column, produced by
/// [`Booker0::fill1_varied`]; `.at(selection)` books one query per variation
/// name of the fill column.
pub struct VariedBooker1<Q, A> {
    booker: Booker0<Q>,
    fill_input: Varied<Column<A>>,
}

impl<Q, A> VariedBooker1<Q, A>
where
    Q: FillableQuery<(A,)> + 'static,
    A: ColumnValue,
{
    pub fn at(&self, selection: &Selection) -> Varied<Query<Q::Result>> {
        let mut varied = Varied::new(self.booker.fill1(self.fill_input.nominal()).at(selection));
        for name in self.fill_input.variation_names() {
            let query = self.booker.fill1(self.fill_input.get(name)).at(selection);
            varied = varied.with_variation(name.clone(), query);
        }
        varied
    }
}

impl<Q, A> Booker1<Q, A>
where
    Q: FillableQuery<(A,)> + 'static,
    A: ColumnValue,
{
    /// Books one query per variation name of `selection`, reusing this
    /// booker's (unvaried) fill column in every variation.
    pub fn at_varied(&self, selection: &Varied<Selection>) -> Varied<Query<Q::Result>> {
        let mut varied = Varied::new(self.at(selection.nominal()));
        for name in selection.variation_names() {
            varied = varied.with_variation(name.clone(), self.at(selection.get(name)));
        }
        varied
    }
}

impl<R: Send + Clone + 'static> Varied<Query<R>> {
    /// Merged nominal result.
    pub fn result(&self) -> GraphResult<R> {
        self.nominal.result()
    }

    /// Merged result for `name`, falling back to the nominal query when
    /// `name` was never booked as its own variation.
    pub fn variation_result(&self, name: &str) -> GraphResult<R> {
        self.get(name).result()
    }
}
