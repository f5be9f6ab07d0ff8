//! Tallyflow CLI - Statement classification and income allocation
//!
//! Usage:
//!   tallyflow classify --input stmt.csv          Classify rows, show provenance
//!   tallyflow consistency --input stmt.csv       Probable transfers, mislabeled rows
//!   tallyflow allocation --input stmt.csv        Income → savings / expenses / unallocated
//!   tallyflow flow --input stmt.csv              Income flow graph
//!   tallyflow analyze --input stmt.json          Everything as one JSON document
//!   tallyflow rules test "SHELL OIL 1234"        Try the rule table

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so --json output on stdout stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Classify {
            input,
            remote,
            output,
        } => commands::cmd_classify(config, &input, remote.as_deref(), output.as_deref()),
        Commands::Refine {
            input,
            remote,
            output,
        } => commands::cmd_refine(config, &input, &remote, output.as_deref()),
        Commands::Consistency { input } => commands::cmd_consistency(config, &input),
        Commands::Allocation {
            input,
            uncategorized,
        } => commands::cmd_allocation(config, &input, uncategorized),
        Commands::Flow {
            input,
            expand_savings,
            monthly,
        } => commands::cmd_flow(config, &input, expand_savings, monthly),
        Commands::Stats { input, top } => commands::cmd_stats(&input, top),
        Commands::Analyze {
            input,
            remote,
            expand_savings,
            monthly,
        } => commands::cmd_analyze(config, &input, remote.as_deref(), expand_savings, monthly),
        Commands::Rules { action } => match action {
            None => commands::cmd_rules_list(config, None),
            Some(RulesAction::List { category }) => {
                commands::cmd_rules_list(config, category.as_deref())
            }
            Some(RulesAction::Test {
                description,
                amount,
                account_type,
            }) => commands::cmd_rules_test(config, &description, amount, account_type.as_deref()),
            Some(RulesAction::Add {
                category,
                regex,
                prepend,
                save,
            }) => commands::cmd_rules_add(config, &category, &regex, prepend, save.as_deref()),
        },
    }
}
