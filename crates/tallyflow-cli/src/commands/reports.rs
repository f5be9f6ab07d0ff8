//! Report command implementations

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tallyflow_core::stats::{
    account_type_totals, daily_totals, top_descriptions, DailyTotal, LabeledTotal,
};
use tallyflow_core::{
    calculate_allocation, compute_statistics, filter_by_date, AllocationResult, Analysis,
    AnalysisOptions, ConsistencyReport, FlowGraph, FlowOptions, IssueLevel, RemoteCategory,
    Statistics,
};

use super::{
    date_range, format_amount, load_input, load_remote, open_engine, print_json, truncate,
};
use crate::cli::InputArgs;

/// Load, classify and analyze the input file
fn run_analysis(
    config: Option<&Path>,
    args: &InputArgs,
    flow: FlowOptions,
    remote: Vec<Option<RemoteCategory>>,
) -> Result<Analysis> {
    let engine = open_engine(config)?;
    let mut transactions = load_input(args)?;
    let (from, to) = date_range(args)?;
    let options = AnalysisOptions {
        categorize: true,
        from,
        to,
        flow,
        remote,
    };
    Ok(engine.analyze(&mut transactions, &options))
}

fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

// ========== Consistency ==========

pub fn cmd_consistency(config: Option<&Path>, args: &InputArgs) -> Result<()> {
    let analysis = run_analysis(config, args, FlowOptions::default(), Vec::new())?;
    let report = &analysis.consistency;

    if args.json {
        return print_json(report);
    }
    print_consistency(report);
    Ok(())
}

fn print_consistency(report: &ConsistencyReport) {
    println!();
    println!("🔎 Consistency Report");
    println!("   ─────────────────────────────────────────────────────────────");

    let types: Vec<String> = report
        .account_type_counts
        .iter()
        .map(|(t, n)| format!("{} {}", t, n))
        .collect();
    if types.is_empty() {
        println!("   Account types:           (none)");
    } else {
        println!("   Account types:           {}", types.join(", "));
    }
    println!("   Probable transfers:      {}", report.probable_transfers);
    println!(
        "   Same-day opposite sign:  {}",
        report.duplicate_amount_same_day_opposite_sign
    );
    println!("   Credit card payments:    {}", report.credit_card_payment_pairs);
    println!("   Suspicious income:       {}", report.suspicious_income_positives);
    println!("   Inconsistent categories: {}", report.inconsistent_categories);

    if report.issues.is_empty() {
        println!();
        println!("   ✅ No issues found");
        return;
    }

    println!();
    for issue in &report.issues {
        let icon = match issue.level {
            IssueLevel::Error => "❌",
            IssueLevel::Warn => "⚠️ ",
            IssueLevel::Info => "ℹ️ ",
        };
        println!("   {} {}", icon, issue.message);
    }
}

// ========== Allocation ==========

pub fn cmd_allocation(config: Option<&Path>, args: &InputArgs, uncategorized: bool) -> Result<()> {
    let allocation = if uncategorized {
        let transactions = load_input(args)?;
        let (from, to) = date_range(args)?;
        calculate_allocation(&filter_by_date(&transactions, from, to), false)
    } else {
        run_analysis(config, args, FlowOptions::default(), Vec::new())?.allocation
    };

    if args.json {
        return print_json(&allocation);
    }
    print_allocation(&allocation);
    Ok(())
}

fn print_allocation(alloc: &AllocationResult) {
    println!();
    println!("💰 Income Allocation");
    println!("   ─────────────────────────────────────────────────────────────");

    if alloc.disabled {
        println!("   Allocation is unavailable until transactions are categorized.");
        return;
    }

    println!("   {:12} │ {:>14} │ {:>7}", "", "Amount", "Share");
    println!("   ─────────────┼────────────────┼────────");
    println!("   {:12} │ {:>14} │ {:>7}", "Income", format_amount(alloc.income), percent(alloc.p_income));
    println!("   {:12} │ {:>14} │ {:>7}", "Savings", format_amount(alloc.savings), percent(alloc.p_savings));
    println!("   {:12} │ {:>14} │ {:>7}", "Expenses", format_amount(alloc.expenses), percent(alloc.p_expenses));
    println!(
        "   {:12} │ {:>14} │ {:>7}",
        "Unallocated",
        format_amount(alloc.unallocated),
        percent(alloc.p_unallocated)
    );

    if alloc.credit_card_only {
        println!();
        println!("   ℹ️  Credit card transactions only: no income in this slice,");
        println!("      shares are relative to observed totals.");
    }
    if alloc.overspend {
        println!();
        println!(
            "   ⚠️  Expenses exceed income by {}",
            format_amount(alloc.expenses - alloc.income)
        );
    }
}

// ========== Flow ==========

pub fn cmd_flow(
    config: Option<&Path>,
    args: &InputArgs,
    expand_savings: bool,
    monthly: bool,
) -> Result<()> {
    let options = FlowOptions {
        expand_savings,
        monthly_average: monthly,
    };
    let analysis = run_analysis(config, args, options, Vec::new())?;

    if args.json {
        return print_json(&analysis.flow);
    }
    print_flow(analysis.flow.as_ref());
    Ok(())
}

fn print_flow(graph: Option<&FlowGraph>) {
    println!();
    println!("🌊 Income Flow");
    println!("   ─────────────────────────────────────────────────────────────");

    let Some(graph) = graph else {
        println!("   No income, savings or spending to show.");
        return;
    };

    if graph.monthly_average && graph.months > 1 {
        println!("   Monthly average over {} months", graph.months);
        println!();
    }

    for link in &graph.links {
        println!(
            "   {:>14} → {:24} {:>14}",
            truncate(&graph.nodes[link.source].label, 14),
            truncate(&graph.nodes[link.target].label, 24),
            format_amount(link.value)
        );
    }
}

// ========== Stats ==========

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    statistics: Option<Statistics>,
    daily: Vec<DailyTotal>,
    account_types: Vec<LabeledTotal>,
    top_descriptions: Vec<LabeledTotal>,
}

pub fn cmd_stats(args: &InputArgs, top: usize) -> Result<()> {
    let transactions = load_input(args)?;
    let (from, to) = date_range(args)?;
    let slice = filter_by_date(&transactions, from, to);

    let output = StatsOutput {
        statistics: compute_statistics(&slice),
        daily: daily_totals(&slice),
        account_types: account_type_totals(&slice),
        top_descriptions: top_descriptions(&slice, top),
    };

    if args.json {
        return print_json(&output);
    }

    println!();
    println!("📈 Statistics");
    println!("   ─────────────────────────────────────────────────────────────");

    let Some(stats) = &output.statistics else {
        println!("   No statistics available.");
        return Ok(());
    };

    println!("   Transactions:     {}", stats.count);
    println!("   Net total:        {}", format_amount(stats.total));
    println!("   Credits:          {}", format_amount(stats.credits));
    println!("   Charges:          {}", format_amount(stats.charges));
    println!("   Average (abs):    {}", format_amount(stats.avg));
    println!("   Median (abs):     {}", format_amount(stats.median));
    if let Some(inflow) = stats.largest_inflow {
        println!("   Largest inflow:   {}", format_amount(inflow));
    }
    if let Some(outflow) = stats.largest_outflow {
        println!("   Largest outflow:  {}", format_amount(outflow));
    }

    if !output.account_types.is_empty() {
        println!();
        println!("   By account type:");
        for total in &output.account_types {
            println!("     {:16} {:>14}", total.label, format_amount(total.total));
        }
    }

    if !output.top_descriptions.is_empty() {
        println!();
        println!("   Top descriptions:");
        for total in &output.top_descriptions {
            println!(
                "     {:32} {:>14}",
                truncate(&total.label, 32),
                format_amount(total.total)
            );
        }
    }

    Ok(())
}

// ========== Analyze ==========

pub fn cmd_analyze(
    config: Option<&Path>,
    args: &InputArgs,
    remote: Option<&Path>,
    expand_savings: bool,
    monthly: bool,
) -> Result<()> {
    let remote = load_remote(remote)?;
    let options = FlowOptions {
        expand_savings,
        monthly_average: monthly,
    };
    let analysis = run_analysis(config, args, options, remote)?;
    print_json(&analysis)
}
