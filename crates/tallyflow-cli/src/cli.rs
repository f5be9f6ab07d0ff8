//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tallyflow - See where statement money goes
#[derive(Parser)]
#[command(name = "tallyflow")]
#[command(about = "Classify bank statement transactions and break down income allocation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine config file (rule table, custom rules, thresholds)
    ///
    /// Defaults to $TALLYFLOW_CONFIG, then ~/.local/share/tallyflow/config/engine.toml,
    /// then the built-in configuration.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input selection shared by every analysis command
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Transaction file (.json array or .csv with a header row)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: Option<String>,

    /// Print JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify transactions and show category + provenance
    Classify {
        #[command(flatten)]
        input: InputArgs,

        /// Remote categories aligned with the input rows (JSON)
        #[arg(long)]
        remote: Option<PathBuf>,

        /// Write the enriched transaction list to this file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply refinement results to rows that only have heuristic categories
    Refine {
        #[command(flatten)]
        input: InputArgs,

        /// Refinement results aligned with the input rows (JSON)
        #[arg(long)]
        remote: PathBuf,

        /// Write the enriched transaction list to this file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check for probable transfers and labeling problems
    Consistency {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Show how income splits into savings, expenses and unallocated
    Allocation {
        #[command(flatten)]
        input: InputArgs,

        /// Skip classification (allocation is reported as disabled)
        #[arg(long)]
        uncategorized: bool,
    },

    /// Show the income flow graph (nodes and links)
    Flow {
        #[command(flatten)]
        input: InputArgs,

        /// One node per savings account
        #[arg(long)]
        expand_savings: bool,

        /// Show per-month averages
        #[arg(long)]
        monthly: bool,
    },

    /// Show amount statistics
    Stats {
        #[command(flatten)]
        input: InputArgs,

        /// Number of top descriptions to list
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Run every analysis and print one JSON document
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Remote categories aligned with the input rows (JSON)
        #[arg(long)]
        remote: Option<PathBuf>,

        /// One node per savings account
        #[arg(long)]
        expand_savings: bool,

        /// Show per-month averages in the flow graph
        #[arg(long)]
        monthly: bool,
    },

    /// Inspect, test and extend the category rule table
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List {
        /// Only rules for this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show how a description would be classified
    Test {
        /// Transaction description
        description: String,

        /// Signed amount (enables numeric override rules)
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<f64>,

        /// Account type: checking, savings, credit_card
        #[arg(long)]
        account_type: Option<String>,
    },

    /// Add a custom rule
    Add {
        /// Category (must exist in the rule table)
        category: String,

        /// Regex pattern (case-insensitive)
        regex: String,

        /// Evaluate before the built-in rules instead of after
        #[arg(long)]
        prepend: bool,

        /// Save the updated config to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}
