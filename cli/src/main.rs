// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # token-vault
//!
//! Command-line entry point for the token vault. Replays JSON scenarios
//! against an in-memory ledger and prints the resulting vault state.
//!
//! ## Usage
//!
//! ```bash
//! # Run a scenario with default settings
//! token-vault run cli/scenarios/two_deposits.json
//!
//! # JSON logs, fail when a step does not behave as the scenario expects
//! token-vault run scenario.json --log-format json --strict
//!
//! # Print version information
//! token-vault version
//! ```

mod cli;
mod logging;
mod scenario;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info};

use crate::cli::{Commands, RunArgs, TokenVaultCli};
use crate::logging::init_logging;

fn main() -> Result<()> {
    let cli = TokenVaultCli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    init_logging("token_vault=info,token_vault_cli=info", args.log_format);

    let report = scenario::run_file(&args.scenario)?;

    let rendered = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{rendered}");

    let mismatched: Vec<_> = report.mismatches().collect();
    for step in &mismatched {
        error!(
            index = step.index,
            action = step.action,
            expected = ?step.expected_error,
            actual = ?step.error,
            "step outcome differs from expectation"
        );
    }
    if args.strict && !mismatched.is_empty() {
        bail!("{} step(s) did not behave as expected", mismatched.len());
    }

    info!(steps = report.steps.len(), slot = report.slot, "scenario complete");
    Ok(())
}

fn print_version() {
    println!("token-vault {}", env!("CARGO_PKG_VERSION"));
    println!("program id: {}", token_vault::config::PROGRAM_ID);
}
