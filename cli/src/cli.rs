//! # CLI Interface
//!
//! Command-line definition for `token-vault`, using `clap` derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Token vault scenario runner.
///
/// Replays a JSON scenario (init, deposit, activate, combine, withdraw, ...)
/// against an in-memory ledger and prints the resulting vault as JSON.
#[derive(Parser, Debug)]
#[command(
    name = "token-vault",
    about = "Token vault scenario runner",
    version,
    propagate_version = true
)]
pub struct TokenVaultCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario file and print the report.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the scenario file (JSON).
    pub scenario: PathBuf,

    /// Log output format.
    #[arg(long, env = "TOKEN_VAULT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Exit with an error if any step's outcome differs from its expectation.
    #[arg(long, env = "TOKEN_VAULT_STRICT")]
    pub strict: bool,

    /// Print the report as a single JSON line.
    #[arg(long)]
    pub compact: bool,
}
