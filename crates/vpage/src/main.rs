//! vpage CLI - file-based page routing with server rendering.
//!
//! Provides commands for:
//! - `dev`: Render pages on demand while developing
//! - `build`: Write one static HTML file per page
//! - `serve`: Serve a finished build
//! - `routes`: Print the route table
//! - `entries`: Print the HTML entries registered with the bundler

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, DevArgs, EntriesArgs, RoutesArgs, ServeArgs};
use error::CliError;
use output::Output;

/// vpage - file-based page routing with server rendering.
#[derive(Parser)]
#[command(name = "vpage", version, about)]
struct Cli {
    /// Enable verbose output (info-level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development server.
    Dev(DevArgs),
    /// Render every page to static HTML.
    Build(BuildArgs),
    /// Serve a finished build.
    Serve(ServeArgs),
    /// Print the route of every discovered page.
    Routes(RoutesArgs),
    /// Print the HTML entries registered with the bundler.
    Entries(EntriesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Routes(args) => args.execute(),
        Commands::Entries(args) => args.execute(),
        Commands::Dev(args) => runtime()?.block_on(args.execute()),
        Commands::Build(args) => runtime()?.block_on(args.execute()),
        Commands::Serve(args) => runtime()?.block_on(args.execute()),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Runtime::new()?)
}
