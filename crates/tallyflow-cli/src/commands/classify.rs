//! Classification command implementations

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tallyflow_core::{filter_by_date, ClassificationSummary, Transaction};

use super::{
    date_range, format_amount, load_input, load_remote, open_engine, print_json, truncate,
    write_transactions,
};
use crate::cli::InputArgs;

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    summary: &'a ClassificationSummary,
    transactions: &'a [Transaction],
}

fn print_transactions(transactions: &[Transaction]) {
    println!(
        "   {:10} │ {:32} │ {:>12} │ {:16} │ {:12}",
        "Date", "Description", "Amount", "Category", "Source"
    );
    println!("   ───────────┼──────────────────────────────────┼──────────────┼──────────────────┼─────────────");
    for tx in transactions {
        println!(
            "   {:10} │ {:32} │ {:>12} │ {:16} │ {:12}",
            truncate(tx.date.as_deref().unwrap_or("-"), 10),
            truncate(&tx.description, 32),
            tx.amount_value()
                .map(format_amount)
                .unwrap_or_else(|| "-".to_string()),
            truncate(tx.category.as_deref().unwrap_or(""), 16),
            tx.category_source.map(|s| s.as_str()).unwrap_or("-"),
        );
    }
}

fn print_summary(summary: &ClassificationSummary) {
    println!();
    println!(
        "   Classified {} of {} transactions",
        summary.transactions_classified, summary.transactions_processed
    );
    println!(
        "   regex: {}  fallback: {}  income rule: {}  savings rule: {}  amount rule: {}",
        summary.by_regex,
        summary.by_fallback,
        summary.by_income_rule,
        summary.by_savings_rule,
        summary.by_amount_rule
    );
    if summary.by_override + summary.by_ai > 0 {
        println!(
            "   override: {}  ai: {}",
            summary.by_override, summary.by_ai
        );
    }
    if summary.skipped_balance_rows > 0 {
        println!("   Balance rows left blank: {}", summary.skipped_balance_rows);
    }
    if summary.preserved_overrides > 0 {
        println!("   User overrides preserved: {}", summary.preserved_overrides);
    }
}

fn emit(
    args: &InputArgs,
    transactions: &[Transaction],
    summary: &ClassificationSummary,
    output: Option<&Path>,
    title: &str,
) -> Result<()> {
    let (from, to) = date_range(args)?;
    if let Some(path) = output {
        write_transactions(path, transactions)?;
    }

    let shown = filter_by_date(transactions, from, to);

    if args.json {
        return print_json(&ClassifyOutput {
            summary,
            transactions: &shown,
        });
    }

    println!();
    println!("🏷️  {}", title);
    println!("   ─────────────────────────────────────────────────────────────");
    print_transactions(&shown);
    print_summary(summary);
    if let Some(path) = output {
        println!("   Saved to {}", path.display());
    }
    Ok(())
}

pub fn cmd_classify(
    config: Option<&Path>,
    args: &InputArgs,
    remote: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let engine = open_engine(config)?;
    let mut transactions = load_input(args)?;
    let remote = load_remote(remote)?;

    let summary = engine.classify(&mut transactions, &remote);
    emit(args, &transactions, &summary, output, "Classified Transactions")
}

pub fn cmd_refine(
    config: Option<&Path>,
    args: &InputArgs,
    remote: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let engine = open_engine(config)?;
    let mut transactions = load_input(args)?;
    let refined = load_remote(Some(remote))?;

    let summary = engine.classifier().refine_all(&mut transactions, &refined);
    emit(args, &transactions, &summary, output, "Refined Transactions")
}
