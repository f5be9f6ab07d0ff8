//! Category classifier for statement transactions
//!
//! Classification is deterministic and ordered:
//! remote category (if supplied) → rule table → finance keyword fallback →
//! neutral default, followed by numeric override rules driven by the amount
//! sign and account type.
//!
//! Override rules never touch transfers: a row whose category or description
//! says "Account Transfer" is never turned into Income or Savings.
//!
//! Rows whose provenance is `override` are user decisions and are skipped by
//! batch passes; only [`set_user_category`] changes them.

mod normalize;
mod rules;

pub use normalize::{normalize_description, NormalizedDescription};
pub use rules::{CategoryRule, RuleSet};

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::config::{ClassifierSettings, EngineConfig};
use crate::error::Result;
use crate::models::{
    AccountType, CategorySource, RemoteCategory, Transaction, ACCOUNT_TRANSFER, HOUSING, INCOME,
    SAVINGS,
};

pub const REASON_POSITIVE_CHECKING: &str = "positive_inflow_checking";
pub const REASON_POSITIVE_SAVINGS: &str = "positive_inflow_savings";
pub const REASON_LARGE_OUTFLOW: &str = "large_checking_outflow";

/// Balance roll-forward marker rows (not real transactions)
fn balance_skip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b((BEGINNING|OPENING) BALANCE|(ENDING|CLOSING) BALANCE|BALANCE FORWARD|NEW BALANCE)\b",
        )
        .expect("invalid balance regex")
    })
}

/// Generic financial keywords used when no table rule matched
fn finance_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(ACH|TRANSFER|XFER|FEE|REFUND|INTEREST|DIVIDEND|DEPOSIT|PAYROLL)\b")
            .expect("invalid finance fallback regex")
    })
}

/// The `(category, source, reason)` triple written back into a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: String,
    pub source: CategorySource,
    pub override_reason: Option<String>,
}

/// Full account of how a category was reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationDetail {
    pub description: String,
    pub normalized_description: String,
    /// Category before numeric override rules
    pub base_category: String,
    pub final_category: String,
    pub source: CategorySource,
    pub matched_pattern: Option<String>,
    /// Balance roll-forward row left blank
    pub skipped: bool,
    /// Description looks like a transfer between own accounts
    pub transfer: bool,
    pub override_applied: bool,
    pub override_reason: Option<String>,
}

impl ClassificationDetail {
    pub fn classification(&self) -> Classification {
        Classification {
            category: self.final_category.clone(),
            source: self.source,
            override_reason: self.override_reason.clone(),
        }
    }
}

/// Result of a batch classification pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub transactions_processed: usize,
    pub transactions_classified: usize,
    pub by_regex: usize,
    pub by_fallback: usize,
    pub by_override: usize,
    pub by_income_rule: usize,
    pub by_savings_rule: usize,
    pub by_amount_rule: usize,
    pub by_ai: usize,
    pub skipped_balance_rows: usize,
    /// Rows left alone because the user had overridden them
    pub preserved_overrides: usize,
}

impl ClassificationSummary {
    fn record(&mut self, source: CategorySource) {
        self.transactions_classified += 1;
        match source {
            CategorySource::Regex => self.by_regex += 1,
            CategorySource::Fallback => self.by_fallback += 1,
            CategorySource::Override => self.by_override += 1,
            CategorySource::IncomeRule => self.by_income_rule += 1,
            CategorySource::SavingsRule => self.by_savings_rule += 1,
            CategorySource::AmountRule => self.by_amount_rule += 1,
            CategorySource::Ai => self.by_ai += 1,
            CategorySource::Skip => self.skipped_balance_rows += 1,
        }
    }
}

/// Local heuristic result for a description
struct Heuristic {
    category: String,
    source: CategorySource,
    matched_pattern: Option<String>,
    skipped: bool,
}

/// Rule-based classifier with numeric override rules
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
    settings: ClassifierSettings,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(RuleSet::default_rules(), ClassifierSettings::default())
    }
}

impl Classifier {
    pub fn new(rules: RuleSet, settings: ClassifierSettings) -> Self {
        Self { rules, settings }
    }

    /// Build the classifier (rule table + custom rules + thresholds) from config
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(
            RuleSet::from_config(config)?,
            config.classifier.clone(),
        ))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Whether a description matches one of the Account Transfer rules
    pub fn is_transfer_description(&self, description: &str) -> bool {
        if description.trim().is_empty() {
            return false;
        }
        let normalized = normalize_description(description);
        let raw_upper = description.to_uppercase();
        self.rules.category_matches(
            ACCOUNT_TRANSFER,
            &[normalized.for_rules.as_str(), raw_upper.as_str()],
        )
    }

    /// Classify a single transaction, returning the triple to store
    pub fn classify(
        &self,
        transaction: &Transaction,
        remote: Option<&RemoteCategory>,
    ) -> Classification {
        self.explain(transaction, remote).classification()
    }

    /// Classify a single transaction with full metadata
    pub fn explain(
        &self,
        transaction: &Transaction,
        remote: Option<&RemoteCategory>,
    ) -> ClassificationDetail {
        let description = &transaction.description;
        let normalized = normalize_description(description);
        let raw_upper = description.to_uppercase();
        let texts = [normalized.for_rules.as_str(), raw_upper.as_str()];
        let transfer = self.is_transfer_description(description);

        // 1. Remote category wins when supplied; otherwise local heuristics
        let remote = remote.filter(|r| !r.category.trim().is_empty() || r.override_applied);
        let base = match remote {
            Some(r) => {
                let source = r
                    .source
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(CategorySource::Ai);
                let category = self
                    .rules
                    .canonical_category(&r.category)
                    .map(str::to_string)
                    .unwrap_or_else(|| r.category.trim().to_string());
                Heuristic {
                    skipped: category.is_empty() && source == CategorySource::Skip,
                    category,
                    source,
                    matched_pattern: None,
                }
            }
            None => self.heuristic(description, &normalized, &texts),
        };

        let override_applied = remote.is_some_and(|r| r.override_applied);
        let mut override_reason = if override_applied {
            remote.and_then(|r| r.override_reason.clone())
        } else {
            None
        };
        let mut final_category = base.category.clone();
        let mut source = base.source;

        // 2. Numeric override rules (never for transfers or balance rows)
        let is_transfer = transfer || base.category.eq_ignore_ascii_case(ACCOUNT_TRANSFER);
        if !base.skipped && !base.category.is_empty() && !is_transfer {
            let amount = transaction.amount_value();
            let account = transaction.account_kind();

            match (amount, account) {
                (Some(a), Some(AccountType::Checking)) if a > 0.0 => {
                    final_category = INCOME.to_string();
                    source = CategorySource::IncomeRule;
                    override_reason.get_or_insert_with(|| REASON_POSITIVE_CHECKING.to_string());
                }
                (Some(a), Some(AccountType::Savings)) if a > 0.0 && !override_applied => {
                    final_category = SAVINGS.to_string();
                    source = CategorySource::SavingsRule;
                    override_reason = Some(REASON_POSITIVE_SAVINGS.to_string());
                }
                _ => {}
            }

            if !override_applied
                && amount.is_some_and(|a| a < -self.settings.large_outflow_threshold)
                && account == Some(AccountType::Checking)
                && final_category.eq_ignore_ascii_case(&self.settings.neutral_category)
            {
                final_category = HOUSING.to_string();
                source = CategorySource::AmountRule;
                override_reason = Some(REASON_LARGE_OUTFLOW.to_string());
            }
        }

        if override_applied {
            source = CategorySource::Override;
        }

        debug!(
            "Classified '{}' as '{}' ({}{})",
            description,
            final_category,
            source,
            override_reason
                .as_deref()
                .map(|r| format!(", {}", r))
                .unwrap_or_default()
        );

        ClassificationDetail {
            description: description.clone(),
            normalized_description: normalized.display,
            base_category: base.category,
            final_category,
            source,
            matched_pattern: base.matched_pattern,
            skipped: base.skipped,
            transfer,
            override_applied,
            override_reason,
        }
    }

    /// Rule table → finance keyword fallback → neutral default
    fn heuristic(
        &self,
        description: &str,
        normalized: &NormalizedDescription,
        texts: &[&str],
    ) -> Heuristic {
        if description.trim().is_empty() {
            return Heuristic {
                category: self.settings.neutral_category.clone(),
                source: CategorySource::Fallback,
                matched_pattern: None,
                skipped: false,
            };
        }

        if balance_skip_re().is_match(&normalized.for_rules) {
            return Heuristic {
                category: String::new(),
                source: CategorySource::Skip,
                matched_pattern: None,
                skipped: true,
            };
        }

        if let Some(rule) = self.rules.first_match(texts) {
            return Heuristic {
                category: rule.category.clone(),
                source: CategorySource::Regex,
                matched_pattern: Some(rule.pattern.as_str().to_string()),
                skipped: false,
            };
        }

        let category = if finance_fallback_re().is_match(&normalized.for_rules) {
            self.settings.fallback_category.clone()
        } else {
            self.settings.neutral_category.clone()
        };
        Heuristic {
            category,
            source: CategorySource::Fallback,
            matched_pattern: None,
            skipped: false,
        }
    }

    /// Classify every row and write the result back.
    ///
    /// `remote[i]` (if present) is the remote category for `transactions[i]`.
    /// Rows the user overrode are preserved as-is.
    pub fn classify_all(
        &self,
        transactions: &mut [Transaction],
        remote: &[Option<RemoteCategory>],
    ) -> ClassificationSummary {
        let mut summary = ClassificationSummary {
            transactions_processed: transactions.len(),
            ..Default::default()
        };

        for (i, tx) in transactions.iter_mut().enumerate() {
            if tx.is_user_override() {
                summary.preserved_overrides += 1;
                continue;
            }
            let remote_for_row = remote.get(i).and_then(Option::as_ref);
            let classification = self.classify(tx, remote_for_row);
            summary.record(classification.source);
            apply(tx, classification);
        }

        info!(
            "Classified {} of {} transactions ({} regex, {} fallback, {} numeric rules, {} overrides preserved)",
            summary.transactions_classified,
            summary.transactions_processed,
            summary.by_regex,
            summary.by_fallback,
            summary.by_income_rule + summary.by_savings_rule + summary.by_amount_rule,
            summary.preserved_overrides
        );
        summary
    }

    /// Apply refinement results to rows that still only carry local heuristics.
    ///
    /// Rows without a refinement result are left untouched; a result without a
    /// recognized provenance is stamped `ai` so the row is not attempted again.
    pub fn refine_all(
        &self,
        transactions: &mut [Transaction],
        refined: &[Option<RemoteCategory>],
    ) -> ClassificationSummary {
        let mut summary = ClassificationSummary {
            transactions_processed: transactions.len(),
            ..Default::default()
        };

        for (tx, result) in transactions.iter_mut().zip(refined.iter()) {
            if tx.is_user_override() {
                summary.preserved_overrides += 1;
                continue;
            }
            let Some(result) = result else { continue };
            if !Self::needs_refinement(tx) {
                continue;
            }
            let classification = self.classify(tx, Some(result));
            summary.record(classification.source);
            apply(tx, classification);
        }

        info!(
            "Refinement updated {} of {} transactions",
            summary.transactions_classified, summary.transactions_processed
        );
        summary
    }

    /// Whether a row should be offered to the refinement step
    pub fn needs_refinement(transaction: &Transaction) -> bool {
        match transaction.category_source {
            None => true,
            Some(source) => source.is_local_heuristic(),
        }
    }
}

fn apply(tx: &mut Transaction, classification: Classification) {
    tx.category = Some(classification.category);
    tx.category_source = Some(classification.source);
    tx.category_override_reason = classification.override_reason;
}

/// Explicit user action: set a category that later passes must not change
pub fn set_user_category(transaction: &mut Transaction, category: &str, reason: Option<&str>) {
    transaction.category = Some(category.to_string());
    transaction.category_source = Some(CategorySource::Override);
    transaction.category_override_reason = Some(reason.unwrap_or("user_override").to_string());
}
