use crate::progress::BarProgress;
use miette::{IntoDiagnostic, Result};
use npmgraph_core::{run_stream, Config, CsvSink, DocumentStream, RunSummary, Stream};
use std::io::{self, Write};

/// Convert the snapshot into CSV import files.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let input = config.snapshot_path();
    let output = config.output_path();

    // Open the input first so a missing snapshot does not leave empty output behind
    let stream = DocumentStream::open(&input, config.channel_capacity).into_diagnostic()?;
    let mut sink = CsvSink::create(&output).into_diagnostic()?;
    tracing::info!(input = %input.display(), output = %output.display(), "Building graph");

    let progress = BarProgress::new(json);
    let summary = run_stream(stream, &mut sink, &progress).into_diagnostic()?;

    if json {
        print_json(&summary)
    } else {
        print_human(&summary).into_diagnostic()
    }
}

fn print_json(summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn print_human(summary: &RunSummary) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let build = &summary.build;
    let resolve = &summary.resolve;

    writeln!(out, "Rows read:      {}", summary.rows)?;
    writeln!(out, "Packages:       {}", build.packages)?;
    writeln!(out, "Versions:       {}", build.versions)?;
    writeln!(out, "Users:          {}", build.users)?;
    writeln!(out, "Requirements:   {}", build.requirements)?;
    writeln!(
        out,
        "Resolved:       {} ({} via dist-tag, {} unresolved)",
        resolve.resolved, resolve.via_tag, resolve.unresolved
    )?;

    writeln!(out)?;
    for stream in Stream::ALL {
        writeln!(out, "  {:<22}{}", stream.name(), summary.records(stream))?;
    }

    let skipped: u64 = summary.issues.values().sum();
    if skipped > 0 {
        writeln!(out)?;
        writeln!(out, "Skipped records ({skipped}):")?;
        for (code, count) in &summary.issues {
            writeln!(out, "  {code:<28}{count}")?;
        }
    }
    Ok(())
}
