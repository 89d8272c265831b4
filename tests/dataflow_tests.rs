//! End-to-end scenarios (S1-S6 of the design spec) plus the testable
//! properties that are only observable through the public `Dataflow` API
//! (unit-level properties — row-caching, selection-cascade arithmetic, path
//! construction — live alongside their node implementations).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use queryosity::dataset::{ColumnSource, Dataset, Partition, RowReader};
use queryosity::datasets::InMemoryDataset;
use queryosity::node::{ColumnValue, Range};
use queryosity::queries::{Count, Sum};
use queryosity::{Dataflow, GraphError, GraphResult};

fn xdataset() -> InMemoryDataset {
    InMemoryDataset::new(4).with_column("x", vec![1i32, 2, 3, 4])
}

#[test]
fn s1_sum_at_root_is_concurrency_independent() {
    for concurrency in 1..=4 {
        let flow = Dataflow::with_concurrency(xdataset(), concurrency, None).unwrap();
        let x = flow.read::<i32>("x").unwrap();
        let root = flow.root().unwrap();
        let total = flow.book0(Sum::new).fill1(&x).at(&root);
        assert_eq!(total.result().unwrap(), 10.0, "concurrency {concurrency}");
    }
}

#[test]
fn s2_cut_restricts_sum_to_passing_rows() {
    let flow = Dataflow::with_concurrency(xdataset(), 2, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let root = flow.root().unwrap();
    let gt2 = flow.filter1("gt2", |v: &i32| *v > 2).apply(Some(&root), &x).unwrap();
    let total = flow.book0(Sum::new).fill1(&x).at(&gt2);
    assert_eq!(total.result().unwrap(), 7.0);
}

#[test]
fn s3_weight_scales_sum() {
    let dataset = InMemoryDataset::new(4)
        .with_column("x", vec![1i32, 2, 3, 4])
        .with_column("w", vec![0.5f64, 0.5, 2.0, 0.5]);
    let flow = Dataflow::with_concurrency(dataset, 2, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let w = flow.read::<f64>("w").unwrap();
    let root = flow.root().unwrap();
    let weighted = flow.weight1("w_sel", |v: &f64| *v).apply(Some(&root), &w).unwrap();
    let total = flow.book0(Sum::new).fill1(&x).at(&weighted);
    assert_eq!(total.result().unwrap(), 9.5);
}

#[test]
fn s4_variation_broadcasts_over_a_varied_fill_column() {
    let flow = Dataflow::with_concurrency(xdataset(), 1, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let shifted = flow.define1(|v: &i32| v + 1).evaluate(&x);
    let x_varied = x.vary("shift", shifted);
    let root = flow.root().unwrap();

    let total = flow.book0(Sum::new).fill1_varied(&x_varied).at(&root);
    assert_eq!(total.result().unwrap(), 10.0);
    assert_eq!(total.variation_result("shift").unwrap(), 14.0);
}

#[test]
fn dataset_normalize_scales_every_descendant_of_root() {
    let dataset = InMemoryDataset::new(4).with_column("x", vec![1i32, 2, 3, 4]).with_weight(2.5);
    let flow = Dataflow::with_concurrency(dataset, 2, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let root = flow.root().unwrap();
    let gt2 = flow.filter1("gt2", |v: &i32| *v > 2).apply(Some(&root), &x).unwrap();

    let root_sum = flow.book0(Sum::new).fill1(&x).at(&root);
    let cut_sum = flow.book0(Sum::new).fill1(&x).at(&gt2);
    assert_eq!(root_sum.result().unwrap(), 25.0, "root sum scaled by normalize()");
    assert_eq!(cut_sum.result().unwrap(), 17.5, "sum past a cut is still scaled by normalize()");
}

#[test]
fn s5_two_channels_get_distinct_paths_and_counts() {
    let flow = Dataflow::with_concurrency(xdataset(), 1, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let root = flow.root().unwrap();
    let ch_a = flow.channel_filter1("chA", |v: &i32| *v > 1).apply(Some(&root), &x).unwrap();
    let ch_b = flow.channel_filter1("chB", |v: &i32| *v > 2).apply(Some(&root), &x).unwrap();

    assert_eq!(ch_a.path(), "chA");
    assert_eq!(ch_b.path(), "chB");

    let count_a = flow.book0(Count::new).at(&ch_a);
    let count_b = flow.book0(Count::new).at(&ch_b);
    assert_eq!(count_a.result().unwrap(), 3);
    assert_eq!(count_b.result().unwrap(), 2);
}

#[test]
fn s6_two_weight_variations_broadcast_over_a_varied_selection() {
    use queryosity::Varied;

    let dataset = InMemoryDataset::new(4)
        .with_column("x", vec![1i32, 2, 3, 4])
        .with_column("w", vec![0.5f64, 0.5, 2.0, 0.5]);
    let flow = Dataflow::with_concurrency(dataset, 1, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let w = flow.read::<f64>("w").unwrap();

    let up = flow.define1(|v: &f64| v * 2.0).evaluate(&w);
    let dn = flow.define1(|v: &f64| v * 0.5).evaluate(&w);
    let w_varied = w.vary("up", up).with_variation("dn", dn);

    let root = Varied::new(flow.root().unwrap());
    let weighted = flow.weight1("w_sel", |v: &f64| *v).apply_varied(Some(&root), &w_varied).unwrap();

    let total = flow.book0(Sum::new).fill1(&x).at_varied(&weighted);
    assert_eq!(total.result().unwrap(), 9.5);
    assert_eq!(total.variation_result("up").unwrap(), 19.0);
    assert_eq!(total.variation_result("dn").unwrap(), 4.75);
}

#[test]
fn duplicate_selection_path_is_rejected() {
    let flow = Dataflow::with_concurrency(xdataset(), 1, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let root = flow.root().unwrap();
    let _first = flow.channel_filter1("dup", |v: &i32| *v > 1).apply(Some(&root), &x).unwrap();
    let second = flow.channel_filter1("dup", |v: &i32| *v > 2).apply(Some(&root), &x);
    assert!(matches!(second, Err(GraphError::DuplicateSelectionPath(path)) if path == "dup"));
}

/// A thin `Dataset` wrapper counting `initialize()` calls, to observe how
/// many single-pass sweeps `analyze()` actually performs.
struct CountingDataset {
    inner: InMemoryDataset,
    passes: Arc<AtomicUsize>,
}

impl Dataset for CountingDataset {
    fn parallelize(&self, requested_concurrency: usize) -> Partition {
        self.inner.parallelize(requested_concurrency)
    }

    fn row_count(&self) -> u64 {
        self.inner.row_count()
    }

    fn open_reader(&self, range: &Range) -> Box<dyn RowReader> {
        self.inner.open_reader(range)
    }

    fn read_column<T: ColumnValue>(&self, name: &str, range: &Range) -> GraphResult<Box<dyn ColumnSource<T>>> {
        self.inner.read_column(name, range)
    }

    fn initialize(&self) {
        self.passes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn idempotent_analyze_does_not_rerun_without_new_bookings() {
    let passes = Arc::new(AtomicUsize::new(0));
    let dataset = CountingDataset { inner: xdataset(), passes: Arc::clone(&passes) };
    let flow = Dataflow::with_concurrency(dataset, 1, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let root = flow.root().unwrap();
    let total = flow.book0(Sum::new).fill1(&x).at(&root);

    assert_eq!(total.result().unwrap(), 10.0);
    assert_eq!(total.result().unwrap(), 10.0);
    assert_eq!(passes.load(Ordering::SeqCst), 1, "a second result() must not re-run the dataset");
}

#[test]
fn booking_after_result_triggers_exactly_one_more_pass() {
    let passes = Arc::new(AtomicUsize::new(0));
    let dataset = CountingDataset { inner: xdataset(), passes: Arc::clone(&passes) };
    let flow = Dataflow::with_concurrency(dataset, 1, None).unwrap();
    let x = flow.read::<i32>("x").unwrap();
    let root = flow.root().unwrap();

    let sum = flow.book0(Sum::new).fill1(&x).at(&root);
    assert_eq!(sum.result().unwrap(), 10.0);
    assert_eq!(passes.load(Ordering::SeqCst), 1);

    let count = flow.book0(Count::new).at(&root);
    assert_eq!(count.result().unwrap(), 4);
    assert_eq!(passes.load(Ordering::SeqCst), 2, "a booking made after result() must trigger exactly one more pass");
}

#[test]
fn empty_dataset_partition_is_a_graph_error() {
    let dataset = InMemoryDataset::new(0);
    let result = Dataflow::with_concurrency(dataset, 4, None);
    assert!(matches!(result, Err(GraphError::EmptyPartition)));
}

#[test]
fn row_limit_exceeding_dataset_is_a_graph_error() {
    let result = Dataflow::with_concurrency(xdataset(), 1, Some(100));
    assert!(matches!(result, Err(GraphError::RowLimitExceedsDataset { limit: 100, available: 4 })));
}
