use crate::demo::{
    run_demo, run_ingest, run_lookup, run_report, run_standings, DemoArgs, IngestArgs,
    LookupArgs, ReportArgs, StandingsArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use exam_results::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Exam Result Portal",
    about = "Compute, rank and publish examination results from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Apply a marks CSV to a batch and print the upload summary
    Ingest(IngestArgs),
    /// Print the ranked results of a batch
    Standings(StandingsArgs),
    /// Print the result card of one registration number
    Lookup(LookupArgs),
    /// Print batch statistics as JSON
    Report(ReportArgs),
    /// Walk through ingestion, ranking and lookup on the seeded batch
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Catalog JSON with batches, subjects and students (defaults to the seeded batch)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Load the seeded sample marks before serving
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Ingest(args) => run_ingest(args),
        Command::Standings(args) => run_standings(args),
        Command::Lookup(args) => run_lookup(args),
        Command::Report(args) => run_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
