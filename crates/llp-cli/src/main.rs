//! # llp CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use llp_cli::buildinfo::{run_buildinfo, BuildinfoArgs};
use llp_cli::resolve::{run_ls, run_resolve, LsArgs, ResolveArgs};

/// Download portal operator tool.
///
/// Inspects BUILD-INFO files and reports which licenses govern the files
/// of a served tree. Output is JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "llp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a BUILD-INFO.txt and print its records.
    Buildinfo(BuildinfoArgs),

    /// Resolve the licenses governing a path under a served root.
    Resolve(ResolveArgs),

    /// List a directory with per-file license digests.
    Ls(LsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Buildinfo(args) => run_buildinfo(args),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Ls(args) => run_ls(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
