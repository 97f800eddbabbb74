#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "fo: offline analysis for faceoff score snapshots",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Correlate the checkpoint snapshots of a run",
        long_about = "Discover the numbered checkpoints of a base snapshot, order them by \
                      comparison count, and report the Spearman correlation between successive \
                      checkpoints (and optionally against a model-prediction snapshot).",
        after_help = "EXAMPLES:\n    # Rank drift across one run\n    fo compare -d ./output\n\n    \
                      # Against a model's predicted scores, without the chart\n    \
                      fo compare -d ./output --model predictions.json --no-plot"
    )]
    Compare(cmd::compare::CompareArgs),

    #[command(
        about = "Copy the records above a score threshold",
        long_about = "Load a snapshot, drop every record scoring below the threshold, and copy \
                      the surviving backing files into a target directory.",
        after_help = "EXAMPLES:\n    fo best -d ./output --save-in ./keepers --threshold 0.5"
    )]
    Best(cmd::best::BestArgs),

    #[command(
        about = "Summarize one snapshot",
        after_help = "EXAMPLES:\n    fo stats -d ./output\n    fo stats -d ./output --top 25 --json"
    )]
    Stats(cmd::stats::StatsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match &cli.command {
        Commands::Compare(args) => cmd::compare::run(args, output),
        Commands::Best(args) => cmd::best::run(args, output),
        Commands::Stats(args) => cmd::stats::run(args, output),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FACEOFF_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
