//! # queryosity
//!
//! A lockstep, record-at-a-time dataflow graph engine in the style of
//! ROOT's `RDataFrame` and the C++ `queryosity` library: columns, cuts and
//! weights chained into selections, and associative queries booked at those
//! selections, all evaluated in a single pass over a dataset split across
//! `N` concurrent slots.
//!
//! ## Building a graph
//!
//! ```rust,ignore
//! use queryosity::{Dataflow, datasets::InMemoryDataset, queries::Sum};
//!
//! let dataset = InMemoryDataset::new(3)
//!     .with_column("pt", vec![1.0f64, 2.0, 3.0])
//!     .with_column("is_good", vec![true, false, true]);
//!
//! let flow = Dataflow::with_concurrency(dataset, 1, None)?;
//! let pt = flow.read::<f64>("pt")?;
//! let good = flow.read::<bool>("is_good")?;
//! let root = flow.root()?;
//! let selected = flow.filter1("good", |g: &bool| *g).apply(Some(&root), &good)?;
//! let total = flow.book0(Sum::new).fill1(&pt).at(&selected);
//! assert_eq!(total.result()?, 4.0);
//! # Ok::<(), queryosity::GraphError>(())
//! ```
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |---|---|
//! | [`node`] | Per-row node lifecycle: columns, selections, queries |
//! | [`dataset`] | The `Dataset`/`ColumnSource`/`RowReader` traits datasets implement |
//! | [`datasets`] | The in-memory reference `Dataset` |
//! | [`lockstep`] | Model+slots container query/merge machinery builds on |
//! | [`processor`] | Per-slot driver of the three node lists over a row range |
//! | [`driver`] | Object-safe façade hiding a dataflow's dataset type from handles |
//! | [`handles`] | User-facing `Column`/`Selection`/`Query`/`Booker*` types |
//! | [`dataflow`] | [`Dataflow`], the entry point for building a graph |
//! | [`variation`] | Systematic-variation broadcasting over the handle layer |
//! | [`queries`] | Built-in query kinds (`Count`, `Sum`) |
//! | [`config`] | Layered configuration ([`Config`]) |
//! | [`error`] | [`GraphError`]/[`GraphResult`] |

pub mod config;
pub mod dataflow;
pub mod dataset;
pub mod datasets;
pub(crate) mod driver;
pub mod error;
pub mod handles;
pub mod lockstep;
pub mod node;
pub mod processor;
pub mod queries;
pub mod variation;

pub use config::Config;
pub use dataflow::Dataflow;
pub use error::{GraphError, GraphResult};
pub use handles::{Booker0, Booker1, Bookkeeper, Column, DelayedColumn1, DelayedColumn2, DelayedColumn3, DelayedFilter1, Query, Selection};
pub use variation::{Varied, VariedBooker1};

/// Installs a `tracing` subscriber per `config.logging`: pretty/JSON text to
/// stderr, plus a daily-rolling file sink under `directory` when one is
/// given. Intended for binaries embedding this crate; library code never
/// calls this on its own.
pub fn init_tracing(config: &config::LoggingConfig, directory: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(dir) = directory {
        let file_appender = tracing_appender::rolling::daily(dir, "queryosity.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let builder = fmt::Subscriber::builder().with_env_filter(filter).with_writer(non_blocking);
        if config.format == "json" {
            builder.json().init();
        } else {
            builder.init();
        }
        Some(guard)
    } else {
        let builder = fmt::Subscriber::builder().with_env_filter(filter);
        if config.format == "json" {
            builder.json().init();
        } else {
            builder.init();
        }
        None
    }
}
