//! Engine configuration
//!
//! Holds the ordered category rule table, user custom rules and the numeric
//! thresholds used by the classifier and the flow graph builder.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path, `TALLYFLOW_CONFIG`, or the override in the data dir
//!    (~/.local/share/tallyflow/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Environment variable naming an override config file
pub const CONFIG_ENV_VAR: &str = "TALLYFLOW_CONFIG";

/// One category and its patterns, in evaluation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatterns {
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// A user-supplied rule layered on top of the category table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    pub category: String,
    pub regex: String,
    /// Evaluate before every table rule instead of after
    #[serde(default)]
    pub prepend: bool,
}

/// Classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Checking outflows larger than this (in absolute value) that landed in
    /// the neutral category are reclassified as Housing
    pub large_outflow_threshold: f64,
    /// Category used when nothing matches
    pub neutral_category: String,
    /// Category used when only generic finance keywords match
    pub fallback_category: String,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            large_outflow_threshold: 1000.0,
            neutral_category: "Recreation".to_string(),
            fallback_category: "Finance".to_string(),
        }
    }
}

/// Flow graph thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Maximum spending categories kept before folding into "Other"
    pub max_categories: usize,
    /// Minimum share of total spending for a category to keep its own node
    pub min_category_share: f64,
    /// Residual income (as a share of income) above which an Unallocated node appears
    pub unallocated_ratio: f64,
    /// Absolute residual floor for the Unallocated node
    pub unallocated_floor: f64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_categories: 8,
            min_category_share: 0.03,
            unallocated_ratio: 0.005,
            unallocated_floor: 1.0,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub flow: FlowSettings,
    #[serde(default)]
    pub categories: Vec<CategoryPatterns>,
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Embedded defaults always parse (see test_embedded_config_parses)
        Self::from_toml(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            classifier: ClassifierSettings::default(),
            flow: FlowSettings::default(),
            categories: Vec::new(),
            custom_rules: Vec::new(),
        })
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration (override first, then embedded default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(override_path) {
            Some(path) => {
                info!("Loading engine config from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)
            }
            None => {
                debug!("Using embedded engine config");
                Self::from_toml(DEFAULT_CONFIG)
            }
        }
    }

    /// Write configuration (including custom rules) to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved engine config to {}", path.display());
        Ok(())
    }

    /// Category names in evaluation order
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    fn validate(&self) -> Result<()> {
        if self.flow.max_categories == 0 {
            return Err(Error::Config("flow.max_categories must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.flow.min_category_share) {
            return Err(Error::Config(
                "flow.min_category_share must be between 0 and 1".into(),
            ));
        }
        if self.classifier.large_outflow_threshold < 0.0 {
            return Err(Error::Config(
                "classifier.large_outflow_threshold must not be negative".into(),
            ));
        }
        for (i, cat) in self.categories.iter().enumerate() {
            if cat.name.trim().is_empty() {
                return Err(Error::Config(format!("categories[{}] has an empty name", i)));
            }
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tallyflow").join("config").join("engine.toml"))
}

/// Pick the config file to read: explicit path, env var, then data-dir override
fn resolve_config_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }
    default_config_path().filter(|p| p.exists())
}
