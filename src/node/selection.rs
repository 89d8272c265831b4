//! Selection nodes: cuts (filters) and weights, chained into paths.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{AnyNode, Range, SharedColumn};

/// Whether a selection filters rows (`Cut`) or scales their weight (`Weight`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Cut,
    Weight,
}

/// A single node in a selection chain.
///
/// `passed`/`weight` compose with the parent selection (if any) the moment
/// this selection's own decision column is read for the current row:
/// - `Cut`: `passed = parent.passed && (decision != 0)`, `weight = parent.weight`
/// - `Weight`: `passed = parent.passed`, `weight = parent.weight * decision`
///
/// A selection with no parent is the root of its chain: an unparented `Cut`
/// starts from `passed = true, weight = 1`; an unparented `Weight` starts
/// from `passed = true, weight = decision`.
pub struct SelectionNode {
    kind: SelectionKind,
    decision: SharedColumn<f64>,
    parent: Option<Arc<Mutex<SelectionNode>>>,
    /// Name used to build this selection's path. Only contributes to the
    /// path string when `channel` is set on an ancestor or on self.
    name: String,
    channel: bool,
    passed: bool,
    weight: f64,
}

impl SelectionNode {
    pub fn new(
        kind: SelectionKind,
        decision: SharedColumn<f64>,
        parent: Option<Arc<Mutex<SelectionNode>>>,
        name: impl Into<String>,
        channel: bool,
    ) -> Self {
        SelectionNode {
            kind,
            decision,
            parent,
            name: name.into(),
            channel,
            passed: false,
            weight: 1.0,
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> bool {
        self.channel
    }

    pub fn parent(&self) -> Option<&Arc<Mutex<SelectionNode>>> {
        self.parent.as_ref()
    }

    /// Chained path formed from ancestor channel names, root-to-leaf, with
    /// this selection's own name appended last.
    pub fn path(&self) -> String {
        let mut channels = Vec::new();
        let mut cur = self.parent.clone();
        while let Some(p) = cur {
            let guard = p.lock();
            if guard.channel {
                channels.push(guard.name.clone());
            }
            cur = guard.parent.clone();
        }
        channels.reverse();
        if channels.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", channels.join("/"), self.name)
        }
    }
}

impl AnyNode for SelectionNode {
    // The decision column is independently registered (and executed) as a
    // plain column node by the processor; only its current value is read
    // here.
    fn execute(&mut self, _range: &Range, _entry: u64) {
        let decision_value = *self.decision.lock().value();
        let parent = self.parent.as_ref().map(|p| {
            let guard = p.lock();
            (guard.passed, guard.weight)
        });
        match (self.kind, parent) {
            (SelectionKind::Cut, Some((p_passed, p_weight))) => {
                self.passed = p_passed && decision_value != 0.0;
                self.weight = p_weight;
            }
            (SelectionKind::Cut, None) => {
                self.passed = decision_value != 0.0;
                self.weight = 1.0;
            }
            (SelectionKind::Weight, Some((p_passed, p_weight))) => {
                self.passed = p_passed;
                self.weight = p_weight * decision_value;
            }
            (SelectionKind::Weight, None) => {
                self.passed = true;
                self.weight = decision_value;
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::column::Constant;

    fn decision(v: f64) -> SharedColumn<f64> {
        let boxed: Box<dyn crate::node::column::ColumnNode<f64> + Send> = Box::new(Constant::new(v));
        Arc::new(Mutex::new(boxed))
    }

    #[test]
    fn root_cut_passes_on_nonzero_decision() {
        let mut cut = SelectionNode::new(SelectionKind::Cut, decision(1.0), None, "pt_cut", false);
        let range = Range { slot: 0, begin: 0, end: 1 };
        cut.execute(&range, 0);
        assert!(cut.passed());
        assert_eq!(cut.weight(), 1.0);
    }

    #[test]
    fn weight_does_not_gate_passed() {
        let mut w = SelectionNode::new(SelectionKind::Weight, decision(0.0), None, "sf", false);
        let range = Range { slot: 0, begin: 0, end: 1 };
        w.execute(&range, 0);
        assert!(w.passed(), "a weight node never fails its own row");
        assert_eq!(w.weight(), 0.0);
    }

    #[test]
    fn cut_chains_through_parent_and_builds_channel_path() {
        let mut root = SelectionNode::new(SelectionKind::Cut, decision(1.0), None, "baseline", true);
        let range = Range { slot: 0, begin: 0, end: 1 };
        root.execute(&range, 0);
        let root = Arc::new(Mutex::new(root));

        let mut child = SelectionNode::new(SelectionKind::Cut, decision(1.0), Some(Arc::clone(&root)), "tight", false);
        child.execute(&range, 0);
        assert!(child.passed());
        assert_eq!(child.path(), "baseline/tight");
    }

    use proptest::prelude::*;

    proptest! {
        /// The cascade law: a cut `B` chained under cut `A` chained under the
        /// unparented root cut only passes when the root, `A`, and `B` all
        /// individually decide truthy, and its weight is just the root's
        /// weight carried through unchanged (cuts never scale weight).
        #[test]
        fn cascade_law_for_chained_cuts(
            root_decision in -10.0f64..10.0,
            a_decision in -10.0f64..10.0,
            b_decision in -10.0f64..10.0,
        ) {
            let range = Range { slot: 0, begin: 0, end: 1 };

            let mut root = SelectionNode::new(SelectionKind::Cut, decision(root_decision), None, "root", true);
            root.execute(&range, 0);
            let root_passed = root.passed();
            let root_weight = root.weight();
            let root = Arc::new(Mutex::new(root));

            let mut a = SelectionNode::new(SelectionKind::Cut, decision(a_decision), Some(Arc::clone(&root)), "a", false);
            a.execute(&range, 0);
            let a_self = a_decision != 0.0;
            prop_assert_eq!(a.passed(), root_passed && a_self);
            let a = Arc::new(Mutex::new(a));

            let mut b = SelectionNode::new(SelectionKind::Cut, decision(b_decision), Some(Arc::clone(&a)), "b", false);
            b.execute(&range, 0);
            let b_self = b_decision != 0.0;

            prop_assert_eq!(b.passed(), root_passed && a_self && b_self);
            prop_assert_eq!(b.weight(), root_weight);
        }

        /// A weight chained under a cut never gates `passed`, and its weight
        /// is the parent's weight times its own decision value.
        #[test]
        fn cascade_law_for_weight_under_cut(
            root_decision in -10.0f64..10.0,
            scale in -5.0f64..5.0,
        ) {
            let range = Range { slot: 0, begin: 0, end: 1 };

            let mut root = SelectionNode::new(SelectionKind::Cut, decision(root_decision), None, "root", true);
            root.execute(&range, 0);
            let root_passed = root.passed();
            let root = Arc::new(Mutex::new(root));

            let mut w = SelectionNode::new(SelectionKind::Weight, decision(scale), Some(Arc::clone(&root)), "sf", false);
            w.execute(&range, 0);

            prop_assert_eq!(w.passed(), root_passed);
            prop_assert_eq!(w.weight(), scale);
        }
    }
}
