use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a settings file without contacting the endpoint.
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show how request files and topics are split over workers.
    Plan {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        workers: WorkerArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Convert a saved XML response to its record value.
    Map {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Poll the endpoint and write records as JSON lines.
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        workers: WorkerArgs,
        /// Stop after this many poll cycles. Runs until interrupted when omitted.
        #[arg(long)]
        cycles: Option<usize>,
        /// Append records to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
}
