//! Tallyflow Core Library
//!
//! Classification and allocation engine for parsed bank statement transactions:
//! - Rule-based category classifier with provenance tags and numeric override rules
//! - Consistency analyzer (transfer pairing, category/sign mismatches)
//! - Income allocation into savings, expenses and unallocated
//! - Capped, layered income flow graph for Sankey-style presentation
//! - Amount statistics
//! - Configurable rule tables and custom rules (TOML)

pub mod allocation;
pub mod classify;
pub mod config;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod flow;
pub mod input;
pub mod models;
pub mod parse;
pub mod stats;

pub use allocation::{calculate_allocation, is_transfer_like, AllocationResult};
pub use classify::{
    normalize_description, set_user_category, CategoryRule, Classification,
    ClassificationDetail, ClassificationSummary, Classifier, RuleSet,
};
pub use config::{ClassifierSettings, EngineConfig, FlowSettings};
pub use consistency::{analyze_consistency, ConsistencyIssue, ConsistencyReport, IssueLevel};
pub use engine::{filter_by_date, Analysis, AnalysisOptions, Engine};
pub use error::{Error, Result};
pub use flow::{build_flow_graph, FlowGraph, FlowLink, FlowNode, FlowOptions};
pub use models::{AccountType, CategorySource, RemoteCategory, Transaction};
pub use stats::{compute_statistics, Statistics};
