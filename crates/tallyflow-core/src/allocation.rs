//! Income allocation
//!
//! Splits a period's income into savings, expenses and an unexplained
//! remainder. Transfers between the user's own accounts are excluded so money
//! moved from checking to savings is not counted as spending.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{Transaction, ACCOUNT_TRANSFER, INCOME, SAVINGS};

fn transfer_keywords_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(internal transfer|online transfer|xfer|move to savings|between accounts|transfer to|transfer from|to savings|from savings)\b",
        )
        .expect("invalid transfer keyword regex")
    })
}

/// Whether a row moves money between the user's own accounts.
///
/// Savings and Income rows are only transfer-like when explicitly categorized
/// as Account Transfer.
pub fn is_transfer_like(tx: &Transaction) -> bool {
    if tx.category_is(ACCOUNT_TRANSFER) {
        return true;
    }
    if tx.category_is(SAVINGS) || tx.category_is(INCOME) {
        return false;
    }
    transfer_keywords_re().is_match(&tx.description)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    /// Classification has not run; every figure is zero
    pub disabled: bool,
    pub income: f64,
    pub expenses: f64,
    pub savings: f64,
    pub unallocated: f64,
    pub p_income: f64,
    pub p_savings: f64,
    pub p_expenses: f64,
    pub p_unallocated: f64,
    /// Every row is a credit card row; percentages use the fallback total
    pub credit_card_only: bool,
    /// Expenses exceed income (informational, totals are not clamped)
    pub overspend: bool,
}

impl AllocationResult {
    fn disabled() -> Self {
        Self {
            disabled: true,
            ..Default::default()
        }
    }

    /// Sum of the three allocation shares
    pub fn allocated_share(&self) -> f64 {
        self.p_savings + self.p_expenses + self.p_unallocated
    }
}

/// Raw income / savings / expense sums over non-transfer rows
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Totals {
    pub income: f64,
    pub savings: f64,
    pub expenses: f64,
}

pub(crate) fn accumulate(transactions: &[Transaction]) -> Totals {
    let mut totals = Totals::default();
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
        }
        if amount < 0.0 {
            totals.expenses += amount.abs();
        }
    }
    totals
}

/// Compute the allocation for a classified slice.
///
/// `categories_applied` is false when classification has not run yet; the
/// result is then disabled.
pub fn calculate_allocation(
    transactions: &[Transaction],
    categories_applied: bool,
) -> AllocationResult {
    if !categories_applied {
        return AllocationResult::disabled();
    }

    let Totals {
        income,
        savings,
        expenses,
    } = accumulate(transactions);
    let unallocated = (income - savings - expenses).max(0.0);
    let credit_card_only =
        !transactions.is_empty() && transactions.iter().all(Transaction::is_credit_card);

    let mut result = AllocationResult {
        income,
        expenses,
        savings,
        unallocated,
        credit_card_only,
        ..Default::default()
    };

    if income > 0.0 {
        result.p_income = 1.0;
        result.p_savings = (savings / income).min(1.0);
        result.p_expenses = (expenses / income).min(1.0 - result.p_savings);
        result.p_unallocated = (1.0 - result.p_savings - result.p_expenses).max(0.0);
        result.overspend = expenses > income;
    } else {
        let total = income + savings + expenses + unallocated;
        if total > 0.0 {
            result.p_income = income / total;
            result.p_savings = savings / total;
            result.p_expenses = expenses / total;
            result.p_unallocated = unallocated / total;
        }
    }

    debug!(
        "Allocation: income {:.2}, savings {:.2}, expenses {:.2}, unallocated {:.2}{}",
        income,
        savings,
        expenses,
        unallocated,
        if result.overspend { " (overspend)" } else { "" }
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn row(desc: &str, amount: f64, account: &str, category: &str) -> Transaction {
        Transaction::new("2025-07-01", desc, amount)
            .with_account(account, None)
            .with_category(category)
    }

    #[test]
    fn test_disabled_before_classification() {
        let txns = vec![row("PAYROLL", 1000.0, "checking", "Income")];
        let result = calculate_allocation(&txns, false);
        assert!(result.disabled);
        assert_eq!(result.income, 0.0);
        assert_eq!(result.allocated_share(), 0.0);
    }

    #[test]
    fn test_empty_list() {
        let result = calculate_allocation(&[], true);
        assert!(!result.disabled);
        assert!(!result.credit_card_only);
        assert_eq!(result, AllocationResult::default());
    }

    #[test]
    fn test_basic_allocation_conserves() {
        let txns = vec![
            row("PAYROLL", 3000.0, "checking", "Income"),
            row("INTEREST", 500.0, "savings", "Savings"),
            row("RENT", -1500.0, "checking", "Housing"),
            row("GROCERY", -250.0, "credit_card", "Food"),
        ];
        let result = calculate_allocation(&txns, true);
        assert!((result.income - 3000.0).abs() < EPS);
        assert!((result.savings - 500.0).abs() < EPS);
        assert!((result.expenses - 1750.0).abs() < EPS);
        assert!((result.unallocated - 750.0).abs() < EPS);
        assert!((result.allocated_share() - 1.0).abs() < EPS);
        assert!(!result.overspend);
        assert!(!result.credit_card_only);
    }

    #[test]
    fn test_overspend() {
        let txns = vec![
            row("PAYROLL", 1000.0, "checking", "Income"),
            row("RENT", -1200.0, "checking", "Housing"),
        ];
        let result = calculate_allocation(&txns, true);
        assert!(result.overspend);
        assert_eq!(result.p_savings, 0.0);
        assert!((result.p_expenses - 1.0).abs() < EPS);
        assert_eq!(result.p_unallocated, 0.0);
        assert_eq!(result.unallocated, 0.0);
        // Totals are not clamped
        assert!((result.expenses - 1200.0).abs() < EPS);
    }

    #[test]
    fn test_savings_capped_at_income() {
        let txns = vec![
            row("PAYROLL", 1000.0, "checking", "Income"),
            row("BONUS", 1500.0, "savings", "Savings"),
            row("CAFE", -100.0, "checking", "Food"),
        ];
        let result = calculate_allocation(&txns, true);
        assert!((result.p_savings - 1.0).abs() < EPS);
        assert_eq!(result.p_expenses, 0.0);
        assert!((result.allocated_share() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_transfers_excluded() {
        let txns = vec![
            row("PAYROLL", 2000.0, "checking", "Income"),
            row("ONLINE TRANSFER TO SAV", -500.0, "checking", "Account Transfer"),
            row("XFER 8812", -200.0, "checking", "Finance"),
            row("MOVE TO SAVINGS", 500.0, "savings", "Savings"),
            row("CAFE", -100.0, "checking", "Food"),
        ];
        let result = calculate_allocation(&txns, true);
        assert!((result.expenses - 100.0).abs() < EPS);
        // Savings rows are not excluded by description keywords
        assert!((result.savings - 500.0).abs() < EPS);
        assert!((result.unallocated - 1400.0).abs() < EPS);
    }

    #[test]
    fn test_credit_card_only_slice() {
        let txns = vec![
            row("PAYMENT THANK YOU", 400.0, "credit_card", "Income"),
            row("AMAZON", -150.0, "credit_card", "Recreation"),
            row("GAS", -50.0, "credit_card", "Transportation"),
        ];
        let result = calculate_allocation(&txns, true);
        assert!(result.credit_card_only);
        assert_eq!(result.income, 0.0);
        assert!((result.expenses - 200.0).abs() < EPS);
        // Fallback mode: shares over observed totals
        assert!((result.p_expenses - 1.0).abs() < EPS);
        assert!(result.allocated_share() <= 1.0 + EPS);
    }

    #[test]
    fn test_missing_amounts_skipped() {
        let mut broken = row("PAYROLL", 0.0, "checking", "Income");
        broken.amount = None;
        let txns = vec![broken, row("PAYROLL", 800.0, "checking", "Income")];
        let result = calculate_allocation(&txns, true);
        assert!((result.income - 800.0).abs() < EPS);
    }

    #[test]
    fn test_is_transfer_like() {
        assert!(is_transfer_like(&row("anything", -1.0, "checking", "account transfer")));
        assert!(is_transfer_like(&row("Transfer to Savings", -1.0, "checking", "Finance")));
        assert!(!is_transfer_like(&row("Transfer from Checking", 1.0, "savings", "Savings")));
        assert!(!is_transfer_like(&row("Transfer from Checking", 1.0, "checking", "Income")));
        assert!(!is_transfer_like(&row("STARBUCKS", -1.0, "checking", "Food")));
    }
}
