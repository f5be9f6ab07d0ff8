//! Income flow graph
//!
//! Builds a layered node/link structure describing how income fans out:
//!
//! ```text
//! Income ─┬─> Spending ──> per-category nodes (long tail folded into "Other")
//!         ├─> Savings (or one node per savings account)
//!         └─> Unallocated (only when the residual is material)
//! ```
//!
//! Every link out of a node is capped so a node never emits more than it
//! receives: savings are capped at income, spending at what income has left
//! after savings, and per-category spending is scaled down to the capped
//! spending total when the slice overspends.

use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::allocation::is_transfer_like;
use crate::config::FlowSettings;
use crate::models::{Transaction, INCOME, OTHER, SAVINGS, UNCATEGORIZED};

pub const INCOME_NODE: &str = "Income";
pub const SPENDING_NODE: &str = "Spending";
pub const SAVINGS_NODE: &str = "Savings";
pub const UNALLOCATED_NODE: &str = "Unallocated";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub label: String,
    pub value: f64,
}

/// Directed edge between two nodes (indices into `FlowGraph::nodes`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    /// Calendar months spanned by the dated rows (at least 1)
    pub months: u32,
    /// Values are per-month averages
    pub monthly_average: bool,
}

impl FlowGraph {
    pub fn node_index(&self, label: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.label == label)
    }

    pub fn inbound(&self, node: usize) -> f64 {
        self.links
            .iter()
            .filter(|l| l.target == node)
            .map(|l| l.value)
            .sum()
    }

    pub fn outbound(&self, node: usize) -> f64 {
        self.links
            .iter()
            .filter(|l| l.source == node)
            .map(|l| l.value)
            .sum()
    }

    /// Labels of nodes fed by `node`
    pub fn children(&self, node: usize) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| l.source == node)
            .map(|l| self.nodes[l.target].label.as_str())
            .collect()
    }

    fn add_node(&mut self, label: impl Into<String>, value: f64) -> usize {
        self.nodes.push(FlowNode {
            label: label.into(),
            value,
        });
        self.nodes.len() - 1
    }

    fn add_link(&mut self, source: usize, target: usize, value: f64) {
        self.links.push(FlowLink {
            source,
            target,
            value,
        });
    }

    fn scale(&mut self, divisor: f64) {
        for node in &mut self.nodes {
            node.value /= divisor;
        }
        for link in &mut self.links {
            link.value /= divisor;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowOptions {
    /// One savings node per account instead of a single Savings node
    pub expand_savings: bool,
    /// Divide every value by the number of months spanned
    pub monthly_average: bool,
}

/// Per-slice sums feeding the graph
#[derive(Debug, Default)]
struct FlowTotals {
    income: f64,
    savings: f64,
    /// (account label, total) in first-seen order
    savings_by_account: Vec<(String, f64)>,
    spending_by_category: HashMap<String, f64>,
}

impl FlowTotals {
    fn spending(&self) -> f64 {
        self.spending_by_category.values().sum()
    }
}

fn collect_totals(transactions: &[Transaction]) -> FlowTotals {
    let mut totals = FlowTotals::default();
    for tx in transactions {
        if tx.is_balance_marker() || is_transfer_like(tx) {
            continue;
        }
        let Some(amount) = tx.amount_value() else {
            continue;
        };

        if tx.category_is(INCOME) && amount > 0.0 && !tx.is_credit_card() {
            totals.income += amount;
        }
        if tx.category_is(SAVINGS) && amount > 0.0 {
            totals.savings += amount;
            let account = tx
                .account_number
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or("unknown")
                .to_string();
            match totals.savings_by_account.iter_mut().find(|(a, _)| *a == account) {
                Some((_, sum)) => *sum += amount,
                None => totals.savings_by_account.push((account, amount)),
            }
        }
        if amount < 0.0 {
            let category = tx
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(UNCATEGORIZED)
                .to_string();
            *totals.spending_by_category.entry(category).or_insert(0.0) += amount.abs();
        }
    }
    totals
}

/// Keep the largest categories with a material share; fold the rest into "Other"
fn cap_categories(spending: &HashMap<String, f64>, settings: &FlowSettings) -> Vec<(String, f64)> {
    let total: f64 = spending.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut sorted: Vec<(&String, f64)> = spending
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(k, v)| (k, *v))
        .collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut kept: Vec<(String, f64)> = Vec::new();
    let mut other = 0.0;
    for (category, value) in sorted {
        if category != OTHER
            && kept.len() < settings.max_categories
            && value / total >= settings.min_category_share
        {
            kept.push((category.clone(), value));
        } else {
            other += value;
        }
    }
    if other > 0.0 {
        kept.push((OTHER.to_string(), other));
    }
    kept
}

/// Number of calendar months touched by the dated rows
pub fn month_span(transactions: &[Transaction]) -> u32 {
    let mut dates = transactions.iter().filter_map(Transaction::parsed_date);
    let Some(first) = dates.next() else {
        return 1;
    };
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    let months = (max.year() - min.year()) * 12 + max.month() as i32 - min.month() as i32 + 1;
    months.max(1) as u32
}

/// Build the flow graph for a classified slice.
///
/// Returns `None` when there is nothing to draw: no rows, or no income for
/// savings and spending to flow from.
pub fn build_flow_graph(
    transactions: &[Transaction],
    options: &FlowOptions,
    settings: &FlowSettings,
) -> Option<FlowGraph> {
    let totals = collect_totals(transactions);
    let total_spending = totals.spending();
    if totals.income <= 0.0 && totals.savings <= 0.0 && total_spending <= 0.0 {
        return None;
    }

    let alloc_savings = totals.savings.min(totals.income);
    let alloc_spending = total_spending.min(totals.income - alloc_savings);
    let residual = totals.income - alloc_savings - alloc_spending;

    let mut graph = FlowGraph {
        nodes: Vec::new(),
        links: Vec::new(),
        months: month_span(transactions),
        monthly_average: options.monthly_average,
    };
    let income = graph.add_node(INCOME_NODE, totals.income);

    if alloc_spending > 0.0 {
        let spending = graph.add_node(SPENDING_NODE, alloc_spending);
        graph.add_link(income, spending, alloc_spending);

        let ratio = if total_spending > 0.0 {
            (alloc_spending / total_spending).min(1.0)
        } else {
            0.0
        };
        for (category, value) in cap_categories(&totals.spending_by_category, settings) {
            let capped = value * ratio;
            let node = graph.add_node(category, capped);
            graph.add_link(spending, node, capped);
        }
    }

    if alloc_savings > 0.0 {
        if options.expand_savings && totals.savings_by_account.len() > 1 {
            let mut accounts = totals.savings_by_account.clone();
            accounts.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            let mut remaining = alloc_savings;
            for (account, value) in accounts {
                let share = value.min(remaining);
                if share <= 0.0 {
                    break;
                }
                remaining -= share;
                let node = graph.add_node(format!("{} ({})", SAVINGS_NODE, account), share);
                graph.add_link(income, node, share);
            }
        } else {
            let node = graph.add_node(SAVINGS_NODE, alloc_savings);
            graph.add_link(income, node, alloc_savings);
        }
    }

    let threshold = (totals.income * settings.unallocated_ratio).max(settings.unallocated_floor);
    if residual > threshold {
        let node = graph.add_node(UNALLOCATED_NODE, residual);
        graph.add_link(income, node, residual);
    }

    if graph.links.is_empty() {
        debug!("Flow graph has no income to distribute");
        return None;
    }

    if options.monthly_average && graph.months > 1 {
        graph.scale(f64::from(graph.months));
    }

    debug!(
        "Flow graph: {} nodes, {} links over {} month(s)",
        graph.nodes.len(),
        graph.links.len(),
        graph.months
    );
    Some(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn row(date: &str, amount: f64, account: &str, number: &str, category: &str) -> Transaction {
        Transaction::new(date, "", amount)
            .with_account(account, Some(number))
            .with_category(category)
    }

    fn income(amount: f64) -> Transaction {
        row("2025-07-01", amount, "checking", "1", "Income")
    }

    fn spend(amount: f64, category: &str) -> Transaction {
        row("2025-07-02", -amount, "credit_card", "9", category)
    }

    fn build(txns: &[Transaction], options: FlowOptions) -> Option<FlowGraph> {
        build_flow_graph(txns, &options, &FlowSettings::default())
    }

    fn assert_conserves(graph: &FlowGraph) {
        for i in 0..graph.nodes.len() {
            let inbound = graph.inbound(i);
            if inbound > 0.0 {
                assert!(
                    graph.outbound(i) <= inbound + EPS,
                    "node {} emits more than it receives",
                    graph.nodes[i].label
                );
            }
        }
        let root = graph.node_index(INCOME_NODE).unwrap();
        assert!(graph.outbound(root) <= graph.nodes[root].value + EPS);
    }

    #[test]
    fn test_empty_returns_none() {
        assert!(build(&[], FlowOptions::default()).is_none());

        let txns = vec![Transaction::new("2025-07-01", "note", 0.0)];
        assert!(build(&txns, FlowOptions::default()).is_none());
    }

    #[test]
    fn test_no_income_returns_none() {
        let txns = vec![spend(40.0, "Food"), spend(10.0, "Recreation")];
        assert!(build(&txns, FlowOptions::default()).is_none());
    }

    #[test]
    fn test_basic_layers() {
        let txns = vec![
            income(3000.0),
            row("2025-07-03", 500.0, "savings", "2", "Savings"),
            spend(1000.0, "Housing"),
            spend(400.0, "Food"),
            spend(100.0, ""),
        ];
        let graph = build(&txns, FlowOptions::default()).unwrap();

        let root = graph.node_index(INCOME_NODE).unwrap();
        let mut children = graph.children(root);
        children.sort();
        assert_eq!(children, vec![SAVINGS_NODE, SPENDING_NODE, UNALLOCATED_NODE]);

        let spending = graph.node_index(SPENDING_NODE).unwrap();
        assert!((graph.nodes[spending].value - 1500.0).abs() < EPS);
        assert_eq!(graph.children(spending), vec!["Housing", "Food", UNCATEGORIZED]);

        let unallocated = graph.node_index(UNALLOCATED_NODE).unwrap();
        assert!((graph.nodes[unallocated].value - 1000.0).abs() < EPS);
        assert_conserves(&graph);
    }

    #[test]
    fn test_small_residual_has_no_unallocated_node() {
        let txns = vec![income(1000.0), spend(999.5, "Housing")];
        let graph = build(&txns, FlowOptions::default()).unwrap();
        assert!(graph.node_index(UNALLOCATED_NODE).is_none());
    }

    #[test]
    fn test_overspend_caps_spending() {
        let txns = vec![
            income(1000.0),
            row("2025-07-03", 200.0, "savings", "2", "Savings"),
            spend(900.0, "Housing"),
            spend(300.0, "Food"),
        ];
        let graph = build(&txns, FlowOptions::default()).unwrap();
        let spending = graph.node_index(SPENDING_NODE).unwrap();

        assert!((graph.inbound(spending) - 800.0).abs() < EPS);
        assert!(graph.outbound(spending) <= graph.inbound(spending) + EPS);
        // Proportions are kept
        let housing = graph.node_index("Housing").unwrap();
        assert!((graph.nodes[housing].value - 600.0).abs() < EPS);
        assert_conserves(&graph);
    }

    #[test]
    fn test_category_cap_folds_long_tail() {
        let mut txns = vec![income(20000.0), spend(10000.0, "Housing")];
        for i in 0..11 {
            txns.push(spend(20.0, &format!("Tiny {}", i)));
        }
        let graph = build(&txns, FlowOptions::default()).unwrap();
        let spending = graph.node_index(SPENDING_NODE).unwrap();
        let categories = graph.children(spending);

        assert_eq!(categories, vec!["Housing", OTHER]);
        assert!(categories.len() <= 9);
        let other = graph.node_index(OTHER).unwrap();
        assert!((graph.nodes[other].value - 220.0).abs() < EPS);
        assert_conserves(&graph);
    }

    #[test]
    fn test_category_cap_limits_count() {
        let mut txns = vec![income(100000.0)];
        for i in 0..12 {
            txns.push(spend(1000.0 + i as f64, &format!("Category {:02}", i)));
        }
        let graph = build(&txns, FlowOptions::default()).unwrap();
        let spending = graph.node_index(SPENDING_NODE).unwrap();
        let categories = graph.children(spending);
        assert_eq!(categories.len(), 9);
        assert_eq!(*categories.last().unwrap(), OTHER);
        // Largest first
        assert_eq!(categories[0], "Category 11");
    }

    #[test]
    fn test_expand_savings_caps_per_account() {
        let txns = vec![
            income(1000.0),
            row("2025-07-03", 700.0, "savings", "A", "Savings"),
            row("2025-07-03", 600.0, "savings", "B", "Savings"),
        ];
        let options = FlowOptions {
            expand_savings: true,
            ..Default::default()
        };
        let graph = build(&txns, options).unwrap();
        let root = graph.node_index(INCOME_NODE).unwrap();

        let a = graph.node_index("Savings (A)").unwrap();
        let b = graph.node_index("Savings (B)").unwrap();
        assert!((graph.nodes[a].value - 700.0).abs() < EPS);
        assert!((graph.nodes[b].value - 300.0).abs() < EPS);
        assert!(graph.outbound(root) <= 1000.0 + EPS);
        assert!(graph.node_index(SAVINGS_NODE).is_none());
    }

    #[test]
    fn test_single_savings_account_not_expanded() {
        let txns = vec![
            income(1000.0),
            row("2025-07-03", 100.0, "savings", "A", "Savings"),
        ];
        let options = FlowOptions {
            expand_savings: true,
            ..Default::default()
        };
        let graph = build(&txns, options).unwrap();
        assert!(graph.node_index(SAVINGS_NODE).is_some());
    }

    #[test]
    fn test_transfers_excluded_from_spending() {
        let txns = vec![
            income(1000.0),
            row("2025-07-02", -400.0, "checking", "1", "Account Transfer"),
            spend(100.0, "Food"),
        ];
        let graph = build(&txns, FlowOptions::default()).unwrap();
        let spending = graph.node_index(SPENDING_NODE).unwrap();
        assert!((graph.nodes[spending].value - 100.0).abs() < EPS);
    }

    #[test]
    fn test_monthly_average() {
        let txns = vec![
            row("2025-01-15", 3000.0, "checking", "1", "Income"),
            row("2025-03-20", -600.0, "checking", "1", "Housing"),
        ];
        let options = FlowOptions {
            monthly_average: true,
            ..Default::default()
        };
        let graph = build(&txns, options).unwrap();
        assert_eq!(graph.months, 3);
        assert!(graph.monthly_average);
        let root = graph.node_index(INCOME_NODE).unwrap();
        assert!((graph.nodes[root].value - 1000.0).abs() < EPS);
        let housing = graph.node_index("Housing").unwrap();
        assert!((graph.nodes[housing].value - 200.0).abs() < EPS);
    }

    #[test]
    fn test_month_span() {
        assert_eq!(month_span(&[]), 1);
        let txns = vec![
            Transaction::new("2024-11-30", "", 1.0),
            Transaction::new("bad", "", 1.0),
            Transaction::new("2025-02-01", "", 1.0),
        ];
        assert_eq!(month_span(&txns), 4);
    }

    #[test]
    fn test_month_span_two_digit_year() {
        let txns = vec![
            Transaction::new("07/01/25", "", 1.0),
            Transaction::new("2025-07-31", "", 1.0),
        ];
        assert_eq!(month_span(&txns), 1);
    }
}
