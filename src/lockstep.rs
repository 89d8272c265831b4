//! The model+slots container every node family in this crate is built on.

use crate::error::{GraphError, GraphResult};
use std::fmt::Debug;

/// One "model" instance plus N "slot" instances of the same logical node.
///
/// The model never participates in per-row execution; it exists so that
/// graph-shape invariants (e.g. every slot agrees on a selection's name) can
/// be asserted once against a single representative, and so that merged
/// query results have a stable home independent of slot count.
pub struct Lockstep<T> {
    model: T,
    slots: Vec<T>,
}

impl<T> Lockstep<T> {
    pub fn from_parts(model: T, slots: Vec<T>) -> Self {
        Lockstep { model, slots }
    }

    pub fn concurrency(&self) -> usize {
        self.slots.len()
    }

    pub fn model(&self) -> &T {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut T {
        &mut self.model
    }

    pub fn slot(&self, index: usize) -> &T {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut T {
        &mut self.slots[index]
    }

    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [T] {
        &mut self.slots
    }

    /// Reads a derived value off the model, debug-asserting every slot
    /// agrees. In release builds the per-slot check is compiled out and the
    /// model's value is trusted.
    pub fn get_model_value<F, R>(&self, f: F) -> R
    where
        F: Fn(&T) -> R,
        R: PartialEq + Debug,
    {
        let value = f(&self.model);
        #[cfg(debug_assertions)]
        for (i, slot) in self.slots.iter().enumerate() {
            let slot_value = f(slot);
            debug_assert_eq!(
                value, slot_value,
                "lockstep model/slot[{i}] disagree on a value that should be shape-invariant"
            );
        }
        value
    }

    /// Builds a new `Lockstep<U>` by applying `f` to the model and each slot
    /// independently (no cross-slot communication).
    pub fn get_concurrent_result<F, U>(&self, f: F) -> Lockstep<U>
    where
        F: Fn(&T) -> U,
    {
        let model = f(&self.model);
        let slots = self.slots.iter().map(&f).collect();
        Lockstep { model, slots }
    }

    /// Like [`Lockstep::get_concurrent_result`], but zipped against a second
    /// lockstep of matching concurrency. Returns
    /// [`GraphError::SlotConcurrencyMismatch`] if the slot counts differ.
    pub fn get_concurrent_result_with<F, U, A>(&self, args: &Lockstep<A>, f: F) -> GraphResult<Lockstep<U>>
    where
        F: Fn(&T, &A) -> U,
    {
        if self.concurrency() != args.concurrency() {
            return Err(GraphError::SlotConcurrencyMismatch {
                expected: self.concurrency(),
                found: args.concurrency(),
            });
        }
        let model = f(&self.model, &args.model);
        let slots = self
            .slots
            .iter()
            .zip(args.slots.iter())
            .map(|(s, a)| f(s, a))
            .collect();
        Ok(Lockstep { model, slots })
    }

    /// Applies `f` to the model and every slot, in that order.
    pub fn call_all<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        f(&mut self.model);
        for slot in &mut self.slots {
            f(slot);
        }
    }

    /// Runs `f` against every slot. Sequential at concurrency 1; otherwise
    /// dispatched across a scoped `rayon` thread pool sized to the slot
    /// count, so a panic in one slot does not leak threads into the next
    /// `run_slots` call.
    pub fn run_slots<F>(&mut self, f: F) -> GraphResult<()>
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        if self.slots.len() <= 1 {
            for slot in &mut self.slots {
                f(slot);
            }
            return Ok(());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.slots.len())
            .build()
            .map_err(|e| GraphError::ThreadPoolInit(e.to_string()))?;
        pool.scope(|scope| {
            for slot in &mut self.slots {
                let f = &f;
                scope.spawn(move |_| f(slot));
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_concurrent_result_applies_independently() {
        let lockstep = Lockstep::from_parts(0i32, vec![1, 2, 3]);
        let doubled = lockstep.get_concurrent_result(|v| v * 2);
        assert_eq!(*doubled.model(), 0);
        assert_eq!(doubled.slots(), &[2, 4, 6]);
    }

    #[test]
    fn mismatched_concurrency_is_a_graph_error() {
        let a = Lockstep::from_parts(0i32, vec![1, 2, 3]);
        let b = Lockstep::from_parts(0i32, vec![1, 2]);
        let result = a.get_concurrent_result_with(&b, |x, y| x + y);
        assert!(matches!(result, Err(GraphError::SlotConcurrencyMismatch { expected: 3, found: 2 })));
    }

    #[test]
    fn run_slots_visits_every_slot_at_any_concurrency() {
        for concurrency in 1..=4 {
            let mut lockstep = Lockstep::from_parts(0i32, vec![0; concurrency]);
            lockstep.run_slots(|slot| *slot += 1).unwrap();
            assert!(lockstep.slots().iter().all(|&v| v == 1));
        }
    }
}
