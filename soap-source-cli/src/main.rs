use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "soap-source", version, about = "Scheduled SOAP polling into JSON records")]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

// Logs go to stderr; stdout is reserved for results and records.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { config, output } => cmd::validate::validate_cmd(config, output).await,
        Command::Plan {
            config,
            workers,
            output,
        } => cmd::plan::plan_cmd(config, workers, output).await,
        Command::Map { path, output } => cmd::map::map_cmd(&path, output).await,
        Command::Run {
            config,
            workers,
            cycles,
            out,
            output,
        } => cmd::run::run_cmd(config, workers, cycles, out, output).await,
    }
}
