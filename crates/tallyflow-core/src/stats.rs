//! Numeric summaries over a transaction list
//!
//! Rows without a usable amount are ignored. Nothing here looks at categories.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Rows that contributed (had a finite amount)
    pub count: usize,
    /// Signed sum
    pub total: f64,
    /// Mean of absolute amounts
    pub avg: f64,
    /// Median of absolute amounts
    pub median: f64,
    /// Sum of positive amounts
    pub credits: f64,
    /// Sum of negative amounts (negative or zero)
    pub charges: f64,
    pub largest_inflow: Option<f64>,
    pub largest_outflow: Option<f64>,
}

/// Summarize the amounts of a slice; `None` means "no statistics available"
pub fn compute_statistics(transactions: &[Transaction]) -> Option<Statistics> {
    let amounts: Vec<f64> = transactions
        .iter()
        .filter_map(Transaction::amount_value)
        .collect();
    if amounts.is_empty() {
        return None;
    }

    let count = amounts.len();
    let total: f64 = amounts.iter().sum();
    let credits: f64 = amounts.iter().filter(|a| **a > 0.0).sum();
    let charges: f64 = amounts.iter().filter(|a| **a < 0.0).sum();

    let mut magnitudes: Vec<f64> = amounts.iter().map(|a| a.abs()).collect();
    magnitudes.sort_by(f64::total_cmp);
    let avg = magnitudes.iter().sum::<f64>() / count as f64;
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (magnitudes[mid - 1] + magnitudes[mid]) / 2.0
    } else {
        magnitudes[mid]
    };

    let largest_inflow = amounts
        .iter()
        .copied()
        .filter(|a| *a > 0.0)
        .max_by(f64::total_cmp);
    let largest_outflow = amounts
        .iter()
        .copied()
        .filter(|a| *a < 0.0)
        .min_by(f64::total_cmp);

    Some(Statistics {
        count,
        total,
        avg,
        median,
        credits,
        charges,
        largest_inflow,
        largest_outflow,
    })
}

/// Net amount for one calendar day plus the running total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub amount: f64,
    pub cumulative: f64,
}

/// Net amount per day in date order; rows missing a date or amount are dropped
pub fn daily_totals(transactions: &[Transaction]) -> Vec<DailyTotal> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for tx in transactions {
        if let (Some(date), Some(amount)) = (tx.parsed_date(), tx.amount_value()) {
            *by_day.entry(date).or_insert(0.0) += amount;
        }
    }

    let mut cumulative = 0.0;
    by_day
        .into_iter()
        .map(|(date, amount)| {
            cumulative += amount;
            DailyTotal {
                date,
                amount,
                cumulative,
            }
        })
        .collect()
}

/// A labeled sum (account type or description)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledTotal {
    pub label: String,
    pub total: f64,
}

/// Signed sum per account type, largest absolute contribution first
pub fn account_type_totals(transactions: &[Transaction]) -> Vec<LabeledTotal> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    for tx in transactions {
        let (Some(kind), Some(amount)) = (tx.account_type.as_deref(), tx.amount_value()) else {
            continue;
        };
        let kind = kind.trim().to_lowercase();
        if kind.is_empty() {
            continue;
        }
        *sums.entry(kind).or_insert(0.0) += amount;
    }
    sorted_totals(sums, |t| t.abs())
}

/// Top `n` descriptions by summed amount (largest first)
pub fn top_descriptions(transactions: &[Transaction], n: usize) -> Vec<LabeledTotal> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    for tx in transactions {
        let Some(amount) = tx.amount_value() else {
            continue;
        };
        let desc = tx.description.trim();
        if desc.is_empty() {
            continue;
        }
        *sums.entry(desc.to_string()).or_insert(0.0) += amount;
    }
    let mut totals = sorted_totals(sums, |t| t);
    totals.truncate(n);
    totals
}

fn sorted_totals(sums: HashMap<String, f64>, key: impl Fn(f64) -> f64) -> Vec<LabeledTotal> {
    let mut totals: Vec<LabeledTotal> = sums
        .into_iter()
        .map(|(label, total)| LabeledTotal { label, total })
        .collect();
    totals.sort_by(|a, b| {
        key(b.total)
            .total_cmp(&key(a.total))
            .then_with(|| a.label.cmp(&b.label))
    });
    totals
}
