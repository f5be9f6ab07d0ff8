//! Rule table command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tallyflow_core::config::default_config_path;
use tallyflow_core::Transaction;

use super::{format_amount, open_engine, truncate};

pub fn cmd_rules_list(config: Option<&Path>, category: Option<&str>) -> Result<()> {
    let engine = open_engine(config)?;
    let rules = engine.classifier().rules();

    let wanted = match category {
        Some(name) => Some(
            rules
                .canonical_category(name)
                .with_context(|| format!("Unknown category: {}", name))?,
        ),
        None => None,
    };

    println!();
    println!("📋 Category rules (first match wins):");
    println!("   ─────────────────────────────────────────────────────────────");

    let mut shown = 0;
    for (i, rule) in rules.rules().enumerate() {
        if wanted.is_some_and(|w| w != rule.category) {
            continue;
        }
        let marker = if rule.custom { " (custom)" } else { "" };
        println!(
            "   {:>3}. {:20} {}{}",
            i + 1,
            truncate(&rule.category, 20),
            rule.pattern.as_str(),
            marker
        );
        shown += 1;
    }

    if shown == 0 {
        println!("   No rules.");
    }
    println!();
    println!(
        "   Neutral category: {}",
        engine.classifier().settings().neutral_category
    );

    Ok(())
}

pub fn cmd_rules_test(
    config: Option<&Path>,
    description: &str,
    amount: Option<f64>,
    account_type: Option<&str>,
) -> Result<()> {
    let engine = open_engine(config)?;

    let transaction = Transaction {
        description: description.to_string(),
        amount,
        account_type: account_type.map(str::to_string),
        ..Default::default()
    };
    let detail = engine.classifier().explain(&transaction, None);

    println!();
    println!("🔍 Classifying \"{}\"", description);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Normalized:   {}", detail.normalized_description);
    if let Some(a) = amount {
        println!("   Amount:       {}", format_amount(a));
    }
    if let Some(t) = account_type {
        println!("   Account type: {}", t);
    }
    match &detail.matched_pattern {
        Some(p) => println!("   Matched:      {}", p),
        None => println!("   Matched:      (no rule)"),
    }
    println!("   Base:         {}", detail.base_category);
    println!(
        "   Final:        {} ({})",
        detail.final_category,
        detail.source.as_str()
    );
    if let Some(reason) = &detail.override_reason {
        println!("   Reason:       {}", reason);
    }
    if detail.skipped {
        println!("   ℹ️  Balance row, category left blank");
    }
    if detail.transfer {
        println!("   ℹ️  Transfer description, amount rules do not apply");
    }

    Ok(())
}

pub fn cmd_rules_add(
    config: Option<&Path>,
    category: &str,
    regex: &str,
    prepend: bool,
    save: Option<&Path>,
) -> Result<()> {
    let mut engine = open_engine(config)?;
    engine
        .add_custom_rule(category, regex, prepend)
        .context("Failed to add rule")?;

    let target: PathBuf = match save.or(config) {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("Could not determine config directory")?,
    };
    engine.save_config(&target)?;

    println!(
        "✅ Added rule {} → {} ({})",
        regex,
        category,
        if prepend { "checked first" } else { "checked last" }
    );
    println!("   Saved to {}", target.display());

    Ok(())
}
