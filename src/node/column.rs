//! Column node kinds: readers, constants, and computed columns.

use std::sync::Arc;

use super::{AnyNode, ColumnValue, Range, SharedColumn};
use crate::dataset::ColumnSource;

/// Typed value access on top of [`AnyNode`]'s per-row lifecycle.
///
/// `execute` advances the node for the current row; `value` exposes the
/// result, recomputing lazily where the concrete kind calls for it
/// (see [`Computed1`]/[`Computed2`]/[`Computed3`]).
pub trait ColumnNode<T>: AnyNode {
    fn value(&mut self) -> &T;
}

/// A column backed directly by the dataset.
pub struct Reader<T> {
    source: Box<dyn ColumnSource<T>>,
    current: Option<T>,
}

impl<T> Reader<T> {
    pub fn new(source: Box<dyn ColumnSource<T>>) -> Self {
        Reader { source, current: None }
    }
}

impl<T: ColumnValue> AnyNode for Reader<T> {
    fn execute(&mut self, range: &Range, entry: u64) {
        self.current = Some(self.source.read(range, entry).clone());
    }
}

impl<T: ColumnValue> ColumnNode<T> for Reader<T> {
    fn value(&mut self) -> &T {
        self.current
            .as_ref()
            .expect("Reader::value called before execute for the current row")
    }
}

/// A column whose value never changes across rows.
pub struct Constant<T> {
    value: T,
}

impl<T> Constant<T> {
    pub fn new(value: T) -> Self {
        Constant { value }
    }
}

impl<T: ColumnValue> AnyNode for Constant<T> {
    fn execute(&mut self, _range: &Range, _entry: u64) {}
}

impl<T: ColumnValue> ColumnNode<T> for Constant<T> {
    fn value(&mut self) -> &T {
        &self.value
    }
}

/// A column computed from one upstream column.
///
/// `execute` only invalidates the cache (O(1)); the user-supplied function
/// runs on first `value()` access within the row and is reused for the rest
/// of that row. A computed column with no downstream consumer therefore
/// never pays for its own evaluation.
pub struct Computed1<A, R> {
    input: SharedColumn<A>,
    func: Arc<dyn Fn(&A) -> R + Send + Sync>,
    cached: Option<R>,
}

impl<A, R> Computed1<A, R> {
    pub fn new(input: SharedColumn<A>, func: Arc<dyn Fn(&A) -> R + Send + Sync>) -> Self {
        Computed1 { input, func, cached: None }
    }
}

impl<A: ColumnValue, R: ColumnValue> AnyNode for Computed1<A, R> {
    fn execute(&mut self, _range: &Range, _entry: u64) {
        self.cached = None;
    }
}

impl<A: ColumnValue, R: ColumnValue> ColumnNode<R> for Computed1<A, R> {
    fn value(&mut self) -> &R {
        if self.cached.is_none() {
            let mut guard = self.input.lock();
            let result = (self.func)(guard.value());
            drop(guard);
            self.cached = Some(result);
        }
        self.cached.as_ref().expect("cache populated above")
    }
}

/// A column computed from two upstream columns.
pub struct Computed2<A, B, R> {
    input_a: SharedColumn<A>,
    input_b: SharedColumn<B>,
    func: Arc<dyn Fn(&A, &B) -> R + Send + Sync>,
    cached: Option<R>,
}

impl<A, B, R> Computed2<A, B, R> {
    pub fn new(input_a: SharedColumn<A>, input_b: SharedColumn<B>, func: Arc<dyn Fn(&A, &B) -> R + Send + Sync>) -> Self {
        Computed2 { input_a, input_b, func, cached: None }
    }
}

impl<A: ColumnValue, B: ColumnValue, R: ColumnValue> AnyNode for Computed2<A, B, R> {
    fn execute(&mut self, _range: &Range, _entry: u64) {
        self.cached = None;
    }
}

impl<A: ColumnValue, B: ColumnValue, R: ColumnValue> ColumnNode<R> for Computed2<A, B, R> {
    fn value(&mut self) -> &R {
        if self.cached.is_none() {
            let mut guard_a = self.input_a.lock();
            let mut guard_b = self.input_b.lock();
            let result = (self.func)(guard_a.value(), guard_b.value());
            drop(guard_a);
            drop(guard_b);
            self.cached = Some(result);
        }
        self.cached.as_ref().expect("cache populated above")
    }
}

/// A column computed from three upstream columns.
pub struct Computed3<A, B, C, R> {
    input_a: SharedColumn<A>,
    input_b: SharedColumn<B>,
    input_c: SharedColumn<C>,
    func: Arc<dyn Fn(&A, &B, &C) -> R + Send + Sync>,
    cached: Option<R>,
}

impl<A, B, C, R> Computed3<A, B, C, R> {
    pub fn new(
        input_a: SharedColumn<A>,
        input_b: SharedColumn<B>,
        input_c: SharedColumn<C>,
        func: Arc<dyn Fn(&A, &B, &C) -> R + Send + Sync>,
    ) -> Self {
        Computed3 { input_a, input_b, input_c, func, cached: None }
    }
}

impl<A: ColumnValue, B: ColumnValue, C: ColumnValue, R: ColumnValue> AnyNode for Computed3<A, B, C, R> {
    fn execute(&mut self, _range: &Range, _entry: u64) {
        self.cached = None;
    }
}

impl<A: ColumnValue, B: ColumnValue, C: ColumnValue, R: ColumnValue> ColumnNode<R> for Computed3<A, B, C, R> {
    fn value(&mut self) -> &R {
        if self.cached.is_none() {
            let mut guard_a = self.input_a.lock();
            let mut guard_b = self.input_b.lock();
            let mut guard_c = self.input_c.lock();
            let result = (self.func)(guard_a.value(), guard_b.value(), guard_c.value());
            drop(guard_a);
            drop(guard_b);
            drop(guard_c);
            self.cached = Some(result);
        }
        self.cached.as_ref().expect("cache populated above")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter<T> {
        calls: Arc<AtomicUsize>,
        value: T,
    }
    impl<T: ColumnValue> AnyNode for Counter<T> {
        fn execute(&mut self, _range: &Range, _entry: u64) {}
    }
    impl<T: ColumnValue> ColumnNode<T> for Counter<T> {
        fn value(&mut self) -> &T {
            self.calls.fetch_add(1, Ordering::SeqCst);
            &self.value
        }
    }

    #[test]
    fn computed_column_caches_within_a_row() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Counter { calls: Arc::clone(&calls), value: 41i64 };
        let boxed: Box<dyn ColumnNode<i64> + Send> = Box::new(counter);
        let input: SharedColumn<i64> = Arc::new(Mutex::new(boxed));
        let mut computed = Computed1::new(input, Arc::new(|a: &i64| a + 1));
        let range = Range { slot: 0, begin: 0, end: 1 };
        computed.execute(&range, 0);
        assert_eq!(*computed.value(), 42);
        assert_eq!(*computed.value(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "input should only be read once per row");
    }
}
