//! Shared command utilities
//!
//! This module contains:
//! - `open_engine` - Build the engine from the resolved config
//! - `load_input` - Read the transaction file
//! - `date_range` - Validate --from/--to
//! - `print_json` - Pretty JSON to stdout

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tallyflow_core::input::{load_remote_categories, load_transactions};
use tallyflow_core::{Engine, RemoteCategory, Transaction};
use tracing::debug;

use crate::cli::InputArgs;

/// Load the engine with the config override (if any)
pub fn open_engine(config: Option<&Path>) -> Result<Engine> {
    Engine::load(config).context("Failed to load engine config")
}

pub fn load_input(args: &InputArgs) -> Result<Vec<Transaction>> {
    let transactions = load_transactions(&args.input)
        .with_context(|| format!("Failed to read transactions from {}", args.input.display()))?;
    debug!(
        "Loaded {} transactions from {}",
        transactions.len(),
        args.input.display()
    );
    Ok(transactions)
}

pub fn load_remote(path: Option<&Path>) -> Result<Vec<Option<RemoteCategory>>> {
    match path {
        Some(p) => load_remote_categories(p)
            .with_context(|| format!("Failed to read remote categories from {}", p.display())),
        None => Ok(Vec::new()),
    }
}

fn parse_date_arg(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

/// Resolve --from/--to into an inclusive range
pub fn date_range(args: &InputArgs) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let from = args
        .from
        .as_deref()
        .map(|f| parse_date_arg(f, "--from"))
        .transpose()?;
    let to = args
        .to
        .as_deref()
        .map(|t| parse_date_arg(t, "--to"))
        .transpose()?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            anyhow::bail!("--from ({}) is after --to ({})", f, t);
        }
    }
    Ok((from, to))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Write the enriched transaction list to a JSON file
pub fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let json =
        serde_json::to_string_pretty(transactions).context("Failed to serialize transactions")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
