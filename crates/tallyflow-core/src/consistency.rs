//! Data-quality checks over a transaction list
//!
//! Detects:
//! - Probable transfers: same day, same absolute amount, opposite sign, different account
//! - Credit card payments: probable transfers where one side is a credit card
//! - Suspicious income: positive checking rows that look like the other half of a transfer
//! - Category/sign mismatches
//!
//! The report is derived from scratch on every call and never mutates input.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::models::{AccountType, Transaction};

fn income_keywords_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)interest|payroll|salary|deposit").expect("invalid income keyword regex")
    })
}

/// Severity level of a consistency issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    Info,
    Warn,
    Error,
}

impl IssueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueLevel::Info => "info",
            IssueLevel::Warn => "warn",
            IssueLevel::Error => "error",
        }
    }

    /// Numeric priority for sorting (higher = more severe)
    pub fn priority(&self) -> u8 {
        match self {
            IssueLevel::Info => 0,
            IssueLevel::Warn => 1,
            IssueLevel::Error => 2,
        }
    }
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(IssueLevel::Info),
            "warn" => Ok(IssueLevel::Warn),
            "error" => Ok(IssueLevel::Error),
            _ => Err(format!("Unknown issue level: {}", s)),
        }
    }
}

/// A detected anomaly surfaced for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub level: IssueLevel,
    pub message: String,
}

impl ConsistencyIssue {
    fn info(message: String) -> Self {
        Self {
            level: IssueLevel::Info,
            message,
        }
    }

    fn warn(message: String) -> Self {
        Self {
            level: IssueLevel::Warn,
            message,
        }
    }
}

/// One inferred transfer: indexes into the analyzed slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPair {
    pub inflow_index: usize,
    pub outflow_index: usize,
    pub date: NaiveDate,
    pub amount: f64,
    pub credit_card: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    /// Row count per lower-cased account type; untyped rows are not counted
    pub account_type_counts: BTreeMap<String, usize>,
    pub probable_transfers: usize,
    pub duplicate_amount_same_day_opposite_sign: usize,
    pub credit_card_payment_pairs: usize,
    pub suspicious_income_positives: usize,
    pub inconsistent_categories: usize,
    /// Sorted by severity, most severe first
    pub issues: Vec<ConsistencyIssue>,
    pub transfer_pairs: Vec<TransferPair>,
}

impl ConsistencyReport {
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.level.priority() >= IssueLevel::Warn.priority())
    }
}

/// Pairing key: calendar day and absolute amount in cents
type PairKey = (NaiveDate, i64);

#[derive(Default)]
struct Bucket {
    pos: Vec<usize>,
    neg: Vec<usize>,
}

fn pair_key(tx: &Transaction) -> Option<(PairKey, f64)> {
    let date = tx.parsed_date()?;
    let amount = tx.amount_value()?;
    Some(((date, (amount.abs() * 100.0).round() as i64), amount))
}

fn normalized_account_type(tx: &Transaction) -> Option<String> {
    tx.account_type
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
}

/// Whether two rows come from distinguishable accounts
fn different_accounts(a: &Transaction, b: &Transaction) -> bool {
    normalized_account_type(a) != normalized_account_type(b)
        || a.account_number.as_deref().map(str::trim) != b.account_number.as_deref().map(str::trim)
}

/// Analyze a transaction list for transfers and labeling problems.
///
/// Pairing within a `(date, amount)` bucket is greedy in input order: each
/// inflow takes the first unused outflow from a different account.
pub fn analyze_consistency(transactions: &[Transaction]) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    for key in transactions.iter().filter_map(normalized_account_type) {
        *report.account_type_counts.entry(key).or_insert(0) += 1;
    }

    let mut buckets: BTreeMap<PairKey, Bucket> = BTreeMap::new();
    for (i, tx) in transactions.iter().enumerate() {
        let Some((key, amount)) = pair_key(tx) else {
            continue;
        };
        let bucket = buckets.entry(key).or_default();
        if amount > 0.0 {
            bucket.pos.push(i);
        } else if amount < 0.0 {
            bucket.neg.push(i);
        }
    }

    for (&(date, _), bucket) in &buckets {
        if bucket.pos.is_empty() || bucket.neg.is_empty() {
            continue;
        }
        report.duplicate_amount_same_day_opposite_sign += bucket.pos.len().min(bucket.neg.len());

        let mut used = vec![false; bucket.neg.len()];
        for &p in &bucket.pos {
            let inflow = &transactions[p];
            let candidate = bucket
                .neg
                .iter()
                .enumerate()
                .find(|&(slot, &n)| !used[slot] && different_accounts(inflow, &transactions[n]));
            let Some((slot, &n)) = candidate else {
                continue;
            };
            used[slot] = true;

            let outflow = &transactions[n];
            let credit_card = inflow.is_credit_card() || outflow.is_credit_card();
            report.probable_transfers += 1;
            if credit_card {
                report.credit_card_payment_pairs += 1;
            }
            debug!(
                "Probable transfer on {}: '{}' <- '{}'",
                date, inflow.description, outflow.description
            );
            report.transfer_pairs.push(TransferPair {
                inflow_index: p,
                outflow_index: n,
                date,
                amount: inflow.amount_value().unwrap_or_default(),
                credit_card,
            });
        }
    }

    report.suspicious_income_positives = transactions
        .iter()
        .filter(|tx| {
            tx.account_kind() == Some(AccountType::Checking)
                && tx.amount_value().is_some_and(|a| a > 0.0)
                && !income_keywords_re().is_match(&tx.description)
                && pair_key(tx)
                    .and_then(|(key, _)| buckets.get(&key))
                    .is_some_and(|b| !b.neg.is_empty())
        })
        .count();

    report.inconsistent_categories = transactions
        .iter()
        .filter(|tx| {
            let Some(amount) = tx.amount_value() else {
                return false;
            };
            (tx.category_is("income") && amount <= 0.0)
                || (tx.category_is("savings") && amount <= 0.0)
                || (tx.category_is("expense") && amount >= 0.0)
        })
        .count();

    report.issues = build_issues(&report);

    info!(
        "Consistency analysis complete: {} transfers, {} same-day opposite amounts, {} credit card payments, {} suspicious income, {} inconsistent categories",
        report.probable_transfers,
        report.duplicate_amount_same_day_opposite_sign,
        report.credit_card_payment_pairs,
        report.suspicious_income_positives,
        report.inconsistent_categories
    );

    report
}

fn build_issues(report: &ConsistencyReport) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if report.probable_transfers > 0 {
        issues.push(ConsistencyIssue::info(format!(
            "{} probable transfer pair(s) between accounts (same day, same amount, opposite sign)",
            report.probable_transfers
        )));
    }
    if report.duplicate_amount_same_day_opposite_sign > 0 {
        issues.push(ConsistencyIssue::info(format!(
            "{} same-day amount(s) appear with both signs",
            report.duplicate_amount_same_day_opposite_sign
        )));
    }
    if report.credit_card_payment_pairs > 0 {
        issues.push(ConsistencyIssue::info(format!(
            "{} credit card payment pair(s) detected",
            report.credit_card_payment_pairs
        )));
    }
    if report.suspicious_income_positives > 0 {
        issues.push(ConsistencyIssue::warn(format!(
            "{} positive checking transaction(s) mirror a same-day outflow and may be transfers, not income",
            report.suspicious_income_positives
        )));
    }
    if report.inconsistent_categories > 0 {
        issues.push(ConsistencyIssue::warn(format!(
            "{} transaction(s) have a category that contradicts the amount sign",
            report.inconsistent_categories
        )));
    }
    if report.account_type_counts.len() > 1 {
        let types: Vec<&str> = report.account_type_counts.keys().map(String::as_str).collect();
        issues.push(ConsistencyIssue::info(format!(
            "Multiple account types present: {}",
            types.join(", ")
        )));
    }

    // Stable: equal levels keep emission order
    issues.sort_by(|a, b| b.level.priority().cmp(&a.level.priority()));
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: &str, amount: f64, account: &str) -> Transaction {
        Transaction::new(date, "", amount).with_account(account, None)
    }

    #[test]
    fn test_empty_list() {
        let report = analyze_consistency(&[]);
        assert_eq!(report, ConsistencyReport::default());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_simple_transfer_pair() {
        let txns = vec![
            tx("2025-07-03", -300.0, "checking"),
            tx("2025-07-03", 300.0, "savings"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.probable_transfers, 1);
        assert_eq!(report.duplicate_amount_same_day_opposite_sign, 1);
        assert_eq!(report.credit_card_payment_pairs, 0);
        assert_eq!(report.transfer_pairs.len(), 1);
        assert_eq!(report.transfer_pairs[0].inflow_index, 1);
        assert_eq!(report.transfer_pairs[0].outflow_index, 0);
        assert_eq!(report.account_type_counts.get("checking"), Some(&1));
        assert_eq!(report.account_type_counts.get("savings"), Some(&1));
    }

    #[test]
    fn test_same_account_not_a_transfer() {
        let txns = vec![
            tx("2025-07-03", -42.0, "checking"),
            tx("2025-07-03", 42.0, "checking"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.duplicate_amount_same_day_opposite_sign, 1);
        assert_eq!(report.probable_transfers, 0);
    }

    #[test]
    fn test_account_number_distinguishes_same_type() {
        let txns = vec![
            Transaction::new("2025-07-03", "", -50.0).with_account("checking", Some("1111")),
            Transaction::new("2025-07-03", "", 50.0).with_account("checking", Some("2222")),
        ];
        assert_eq!(analyze_consistency(&txns).probable_transfers, 1);
    }

    #[test]
    fn test_credit_card_payment_pair() {
        let txns = vec![
            tx("2025-07-10", -500.0, "checking"),
            tx("2025-07-10", 500.0, "credit_card"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.probable_transfers, 1);
        assert_eq!(report.credit_card_payment_pairs, 1);
        assert!(report.transfer_pairs[0].credit_card);
    }

    #[test]
    fn test_greedy_pairing_uses_each_outflow_once() {
        let txns = vec![
            tx("2025-07-03", 100.0, "savings"),
            tx("2025-07-03", 100.0, "credit_card"),
            tx("2025-07-03", -100.0, "checking"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.duplicate_amount_same_day_opposite_sign, 1);
        assert_eq!(report.probable_transfers, 1);
        // First inflow in input order wins
        assert_eq!(report.transfer_pairs[0].inflow_index, 0);
        assert_eq!(report.credit_card_payment_pairs, 0);
    }

    #[test]
    fn test_rows_without_date_or_amount_skip_pairing() {
        let mut no_amount = tx("2025-07-03", 0.0, "savings");
        no_amount.amount = None;
        let txns = vec![
            tx("2025-07-03", -300.0, "checking"),
            no_amount,
            tx("garbage", 300.0, "savings"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.probable_transfers, 0);
        assert_eq!(report.account_type_counts.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_different_date_formats_pair() {
        let txns = vec![
            tx("2025-07-03", -300.0, "checking"),
            tx("07/03/2025", 300.0, "savings"),
        ];
        assert_eq!(analyze_consistency(&txns).probable_transfers, 1);
    }

    #[test]
    fn test_two_digit_year_pairs_with_iso_date() {
        let txns = vec![
            tx("07/03/25", -300.0, "checking"),
            tx("2025-07-03", 300.0, "savings"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.probable_transfers, 1);
        assert_eq!(report.duplicate_amount_same_day_opposite_sign, 1);
    }

    #[test]
    fn test_untyped_rows_not_tallied() {
        let txns = vec![
            tx("2025-07-03", -20.0, "checking"),
            Transaction::new("2025-07-04", "", -5.0),
            tx("2025-07-05", -8.0, "Checking"),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.account_type_counts.len(), 1);
        assert_eq!(report.account_type_counts.get("checking"), Some(&2));
        assert!(!report
            .issues
            .iter()
            .any(|i| i.message.starts_with("Multiple account types")));
    }

    #[test]
    fn test_suspicious_income_positive() {
        let txns = vec![
            Transaction::new("2025-07-03", "MOBILE XFER", 300.0).with_account("checking", Some("1")),
            Transaction::new("2025-07-03", "PAYROLL ACME", 300.0).with_account("checking", Some("1")),
            Transaction::new("2025-07-03", "TO CHECKING", -300.0).with_account("savings", Some("2")),
            Transaction::new("2025-07-04", "VENMO", 80.0).with_account("checking", Some("1")),
        ];
        let report = analyze_consistency(&txns);
        assert_eq!(report.suspicious_income_positives, 1);
        assert!(report.has_warnings());
        assert_eq!(report.issues[0].level, IssueLevel::Warn);
    }

    #[test]
    fn test_inconsistent_categories() {
        let txns = vec![
            Transaction::new("2025-07-03", "", -10.0).with_category("Income"),
            Transaction::new("2025-07-03", "", 0.0).with_category("savings"),
            Transaction::new("2025-07-03", "", 10.0).with_category("expense"),
            Transaction::new("2025-07-03", "", 10.0).with_category("Income"),
            Transaction::new("2025-07-03", "", -10.0).with_category("Food"),
        ];
        assert_eq!(analyze_consistency(&txns).inconsistent_categories, 3);
    }

    #[test]
    fn test_issues_sorted_by_severity() {
        let txns = vec![
            tx("2025-07-03", -300.0, "checking"),
            tx("2025-07-03", 300.0, "savings"),
            Transaction::new("2025-07-04", "", -5.0)
                .with_account("checking", None)
                .with_category("Income"),
        ];
        let report = analyze_consistency(&txns);
        let levels: Vec<IssueLevel> = report.issues.iter().map(|i| i.level).collect();
        assert_eq!(levels[0], IssueLevel::Warn);
        assert!(levels[1..].iter().all(|l| *l == IssueLevel::Info));
        // Info issues keep emission order
        assert!(report.issues[1].message.contains("probable transfer"));
        assert!(report.issues.last().unwrap().message.starts_with("Multiple account types"));
    }

    #[test]
    fn test_idempotent() {
        let txns = vec![
            tx("2025-07-03", -300.0, "checking"),
            tx("2025-07-03", 300.0, "savings"),
            tx("2025-07-03", 300.0, "credit_card"),
            tx("2025-07-05", -12.5, "credit_card"),
        ];
        assert_eq!(analyze_consistency(&txns), analyze_consistency(&txns));
    }

    #[test]
    fn test_issue_level_parsing() {
        assert_eq!("warn".parse::<IssueLevel>(), Ok(IssueLevel::Warn));
        assert!("fatal".parse::<IssueLevel>().is_err());
        assert!(IssueLevel::Error.priority() > IssueLevel::Warn.priority());
    }
}
