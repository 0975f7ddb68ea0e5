#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::fn_params_excessive_bools)]

mod commands;
mod logging;
mod progress;

use clap::Parser;
use miette::Result;
use npmgraph_core::config::DEFAULT_CHANNEL_CAPACITY;
use npmgraph_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "npmgraph")]
#[command(author, version, about = "Turn an npm registry snapshot into a graph import", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON logs on stderr and a JSON report on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Directory holding the snapshot and, by default, the output
    #[arg(long, global = true, value_name = "PATH", env = "NPMGRAPH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Download the full registry snapshot
    Download {
        /// Replication endpoint (defaults to $NPMGRAPH_REPLICATE_URL or the public registry)
        #[arg(long)]
        url: Option<String>,

        /// Replace an existing snapshot
        #[arg(long)]
        force: bool,
    },

    /// Convert a snapshot into CSV files for `neo4j-admin import`
    Build {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Download the snapshot if it is missing, then build
    Run {
        #[command(flatten)]
        build: BuildArgs,
    },
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Snapshot to read (plain or gzip JSON; defaults to <data-dir>/all_docs.json)
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output directory (defaults to <data-dir>)
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Documents buffered between parsing and graph building
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,
}

impl BuildArgs {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(input) = &self.input {
            config = config.with_snapshot(input);
        }
        if let Some(out) = &self.out {
            config = config.with_output_dir(out);
        }
        config.with_channel_capacity(self.channel_capacity)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);
    if let Some(data_dir) = &cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    if matches!(cli.command, Some(Commands::Version) | None) {
        return commands::version::run();
    }

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Download { url, force }) => {
            commands::download::run(&config, url.as_deref(), force, cli.json)
        }
        Some(Commands::Build { build }) => commands::build::run(&build.apply(config), cli.json),
        Some(Commands::Run { build }) => commands::run::run(&build.apply(config), cli.json),
    }
}
