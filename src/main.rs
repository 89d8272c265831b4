//! # queryosity demo
//!
//! A small end-to-end walkthrough of building and running a dataflow graph
//! over an in-memory dataset.
//!
//! ```bash
//! cargo run --bin queryosity-demo
//! ```

use queryosity::config::Config;
use queryosity::datasets::InMemoryDataset;
use queryosity::queries::{Count, Sum};
use queryosity::{init_tracing, Dataflow};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().unwrap_or_default();
    let _guard = init_tracing(&config.logging, None);

    println!("queryosity demo\n===============\n");

    let dataset = InMemoryDataset::new(6)
        .with_column("pt", vec![12.5f64, 30.0, 5.5, 45.0, 8.0, 60.0])
        .with_column("is_muon", vec![true, true, false, true, false, true]);

    let flow = Dataflow::with_concurrency(dataset, config.concurrency.resolved(), None)?;
    println!("running with {} slot(s)\n", flow.concurrency());

    let pt = flow.read::<f64>("pt")?;
    let is_muon = flow.read::<bool>("is_muon")?;

    let root = flow.root()?;
    let muons = flow.channel_filter1("muons", |m: &bool| *m).apply(Some(&root), &is_muon)?;
    let high_pt = flow.filter1("pt_gt_20", |pt: &f64| *pt > 20.0).apply(Some(&muons), &pt)?;

    let muon_count = flow.book0(Count::new).at(&muons);
    let high_pt_sum = flow.book0(Sum::new).fill1(&pt).at(&high_pt);

    println!("selection '{}': {} muons", muons.path(), muon_count.result()?);
    println!("selection '{}': sum(pt) = {}", high_pt.path(), high_pt_sum.result()?);

    Ok(())
}
