//! End-to-end run: ingest, freeze, resolve, finish.

use crate::config::Config;
use crate::error::Error;
use crate::graph::{codes, BuildStats, GraphBuilder, Issue, ResolveStats, Resolver};
use crate::sink::{GraphSink, Record, Stream};
use crate::snapshot::{DocumentStream, Row};
use crate::version::OUTPUT_SCHEMA_VERSION;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

/// Stage of a run, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Download,
    Ingest,
    Resolve,
}

impl Phase {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Ingest => "ingest",
            Self::Resolve => "resolve",
        }
    }
}

/// Receives progress updates. Every method defaults to doing nothing.
pub trait Progress {
    /// A phase began. `total` is the expected number of units, if known.
    fn start(&self, _phase: Phase, _total: Option<u64>) {}

    /// The expected total became known after the phase started.
    fn set_total(&self, _phase: Phase, _total: u64) {}

    fn advance(&self, _phase: Phase, _delta: u64) {}

    fn finish(&self, _phase: Phase) {}
}

/// Discards progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Options for [`run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Rows buffered between the parser thread and the builder.
    pub channel_capacity: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            channel_capacity: crate::config::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            channel_capacity: config.channel_capacity,
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub schema_version: u32,
    /// Rows read from the snapshot, with or without a document.
    pub rows: u64,
    pub build: BuildStats,
    pub resolve: ResolveStats,
    /// Records written, keyed by stream name.
    pub records: BTreeMap<&'static str, u64>,
    /// Issues reported, keyed by code.
    pub issues: BTreeMap<&'static str, u64>,
}

impl RunSummary {
    /// Records written to `stream`.
    #[must_use]
    pub fn records(&self, stream: Stream) -> u64 {
        self.records.get(stream.name()).copied().unwrap_or(0)
    }

    /// Issues reported with `code`.
    #[must_use]
    pub fn issues(&self, code: &str) -> u64 {
        self.issues.get(code).copied().unwrap_or(0)
    }
}

/// Counts records on their way to the real sink.
struct CountingSink<'s, S: ?Sized> {
    inner: &'s mut S,
    counts: [u64; Stream::ALL.len()],
}

impl<'s, S: GraphSink + ?Sized> CountingSink<'s, S> {
    fn new(inner: &'s mut S) -> Self {
        Self {
            inner,
            counts: [0; Stream::ALL.len()],
        }
    }

    fn counts(&self) -> BTreeMap<&'static str, u64> {
        Stream::ALL
            .iter()
            .map(|stream| (stream.name(), self.counts[stream.index()]))
            .collect()
    }
}

impl<S: GraphSink + ?Sized> GraphSink for CountingSink<'_, S> {
    fn write(&mut self, record: Record<'_>) -> Result<(), Error> {
        self.counts[record.stream().index()] += 1;
        self.inner.write(record)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.inner.finish()
    }
}

/// Convert the snapshot read from `reader` into graph records on `sink`.
///
/// # Errors
/// Returns an error if the snapshot cannot be parsed or the sink fails.
/// Problems with individual records are counted in the summary instead.
pub fn run<R, S, P>(
    reader: R,
    sink: &mut S,
    options: &RunOptions,
    progress: &P,
) -> Result<RunSummary, Error>
where
    R: Read + Send + 'static,
    S: GraphSink + ?Sized,
    P: Progress + ?Sized,
{
    let stream = DocumentStream::spawn(reader, options.channel_capacity)?;
    run_stream(stream, sink, progress)
}

/// Like [`run`], for an already opened [`DocumentStream`].
///
/// # Errors
/// Returns an error if the snapshot cannot be parsed or the sink fails.
pub fn run_stream<S, P>(
    mut stream: DocumentStream,
    sink: &mut S,
    progress: &P,
) -> Result<RunSummary, Error>
where
    S: GraphSink + ?Sized,
    P: Progress + ?Sized,
{
    let mut sink = CountingSink::new(sink);
    let mut builder = GraphBuilder::new();

    // Phase 1: ingest every document
    tracing::info!("Ingesting snapshot");
    progress.start(Phase::Ingest, None);
    let mut total_reported = false;
    // total_rows becomes known between rows
    #[allow(clippy::while_let_on_iterator)]
    while let Some(row) = stream.next() {
        if !total_reported {
            if let Some(total) = stream.total_rows() {
                progress.set_total(Phase::Ingest, total);
                total_reported = true;
            }
        }
        match row? {
            Row::Document(doc) => builder.add_document(&mut sink, doc)?,
            Row::WithoutDoc { id } => builder.report(Issue::new(
                codes::ROW_WITHOUT_DOC,
                id.as_deref().unwrap_or("<unknown>"),
                "row has no document",
            )),
        }
        progress.advance(Phase::Ingest, 1);
    }
    progress.finish(Phase::Ingest);

    let rows = stream.rows_read();
    let build = builder.stats();
    tracing::info!(
        rows,
        documents = build.documents,
        packages = build.packages,
        versions = build.versions,
        users = build.users,
        requirements = build.requirements,
        "Ingestion complete"
    );

    // Phase 2: resolve against the frozen catalog
    let graph = builder.finish();
    let mut resolver = Resolver::new(&graph);
    progress.start(Phase::Resolve, Some(resolver.total() as u64));
    let resolve = resolver.resolve_all(&mut sink, |_| progress.advance(Phase::Resolve, 1))?;
    progress.finish(Phase::Resolve);
    tracing::info!(
        requirements = resolve.requirements,
        resolved = resolve.resolved,
        via_tag = resolve.via_tag,
        unresolved = resolve.unresolved,
        "Resolution complete"
    );

    sink.finish()?;

    let mut issues = graph.issues().clone();
    issues.merge(resolver.issues());
    if issues.total() > 0 {
        tracing::info!(total = issues.total(), "Skipped records with issues");
    }

    Ok(RunSummary {
        schema_version: OUTPUT_SCHEMA_VERSION,
        rows,
        build,
        resolve,
        records: sink.counts(),
        issues: issues.counts().clone(),
    })
}
