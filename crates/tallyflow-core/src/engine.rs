//! Analysis pipeline
//!
//! `Engine` owns the configured classifier and runs the full pipeline over a
//! transaction list: classify, then derive statistics, the consistency report,
//! the allocation and the flow graph from the (optionally date-filtered) slice.

use chrono::NaiveDate;
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

use crate::allocation::{calculate_allocation, AllocationResult};
use crate::classify::{ClassificationSummary, Classifier};
use crate::config::EngineConfig;
use crate::consistency::{analyze_consistency, ConsistencyReport};
use crate::error::Result;
use crate::flow::{build_flow_graph, FlowGraph, FlowOptions};
use crate::models::{RemoteCategory, Transaction};
use crate::stats::{compute_statistics, Statistics};

/// What to run and over which date range
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Run the classifier before analysis
    pub categorize: bool,
    /// Inclusive date range; rows without a readable date fall outside any bound
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub flow: FlowOptions,
    /// Remote categories aligned by index with the transaction list
    pub remote: Vec<Option<RemoteCategory>>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            categorize: true,
            from: None,
            to: None,
            flow: FlowOptions::default(),
            remote: Vec::new(),
        }
    }
}

/// Everything derived from one transaction list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub transaction_count: usize,
    /// Rows inside the requested date range
    pub filtered_count: usize,
    pub categories_applied: bool,
    pub classification: Option<ClassificationSummary>,
    pub statistics: Option<Statistics>,
    pub consistency: ConsistencyReport,
    pub allocation: AllocationResult,
    pub flow: Option<FlowGraph>,
}

/// Rows whose date falls in `[from, to]`.
///
/// With no bounds every row is returned; with a bound, rows without a
/// readable date are excluded.
pub fn filter_by_date(
    transactions: &[Transaction],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<Transaction> {
    select_range(transactions, from, to).into_owned()
}

fn select_range(
    transactions: &[Transaction],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Cow<'_, [Transaction]> {
    if from.is_none() && to.is_none() {
        return Cow::Borrowed(transactions);
    }
    Cow::Owned(
        transactions
            .iter()
            .filter(|tx| {
                tx.parsed_date().is_some_and(|d| {
                    from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t)
                })
            })
            .cloned()
            .collect(),
    )
}

pub struct Engine {
    config: EngineConfig,
    classifier: Classifier,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let classifier = Classifier::from_config(&config)?;
        Ok(Self { config, classifier })
    }

    /// Build from the resolved config file (explicit path, env, data dir, embedded)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::new(EngineConfig::load(config_path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Register a custom rule and record it in the config for saving
    pub fn add_custom_rule(&mut self, category: &str, regex: &str, prepend: bool) -> Result<()> {
        self.classifier
            .rules_mut()
            .add_custom_rule(category, regex, prepend)?;
        self.config.custom_rules = self.classifier.rules().custom_rules();
        info!(
            "Added custom rule {} -> {} ({})",
            regex,
            category,
            if prepend { "prepend" } else { "append" }
        );
        Ok(())
    }

    /// Persist the config, including custom rules added at runtime
    pub fn save_config(&self, path: &Path) -> Result<()> {
        self.config.save(path)
    }

    /// Classify in place; user overrides are preserved
    pub fn classify(
        &self,
        transactions: &mut [Transaction],
        remote: &[Option<RemoteCategory>],
    ) -> ClassificationSummary {
        self.classifier.classify_all(transactions, remote)
    }

    /// Run the full pipeline.
    ///
    /// Classification writes back into `transactions`; every other result is
    /// derived from the date-filtered slice without mutating it.
    pub fn analyze(&self, transactions: &mut [Transaction], options: &AnalysisOptions) -> Analysis {
        let classification = options
            .categorize
            .then(|| self.classify(transactions, &options.remote));
        let categories_applied =
            classification.is_some() || transactions.iter().any(|t| t.category_source.is_some());

        let slice = select_range(transactions, options.from, options.to);

        let analysis = Analysis {
            transaction_count: transactions.len(),
            filtered_count: slice.len(),
            categories_applied,
            classification,
            statistics: compute_statistics(&slice),
            consistency: analyze_consistency(&slice),
            allocation: calculate_allocation(&slice, categories_applied),
            flow: build_flow_graph(&slice, &options.flow, &self.config.flow),
        };

        info!(
            "Analyzed {} transactions ({} in range), {} consistency issues",
            analysis.transaction_count,
            analysis.filtered_count,
            analysis.consistency.issues.len()
        );
        analysis
    }
}
