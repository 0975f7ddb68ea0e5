#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod sink;
pub mod snapshot;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use graph::{GraphBuilder, GraphSnapshot, Resolver};
pub use pipeline::{run, run_stream, NoProgress, Phase, Progress, RunOptions, RunSummary};
pub use sink::{CsvSink, GraphSink, MemorySink, Record, Stream};
pub use snapshot::{DocumentStream, PackageDocument, SnapshotClient};
pub use version::VERSION;
