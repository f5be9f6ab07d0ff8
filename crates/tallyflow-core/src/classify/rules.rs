//! Ordered category rule table
//!
//! A `RuleSet` is an explicit list of `(category, pattern)` pairs evaluated in
//! order, first match wins. It is built from configuration so a user rules file
//! can replace the table without touching the classifier.
//!
//! Evaluation order: prepended custom rules, then the category table, then
//! appended custom rules.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::config::{CustomRuleConfig, EngineConfig};
use crate::error::{Error, Result};

/// A compiled rule mapping a pattern to a category
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: String,
    pub pattern: Regex,
    /// Whether the rule was user-supplied rather than part of the table
    pub custom: bool,
}

impl CategoryRule {
    /// Check if any of the given texts matches this rule
    pub fn matches_any(&self, texts: &[&str]) -> bool {
        texts.iter().any(|t| self.pattern.is_match(t))
    }
}

/// Ordered, compiled rule table
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    categories: Vec<String>,
    prepended: Vec<CategoryRule>,
    table: Vec<CategoryRule>,
    appended: Vec<CategoryRule>,
}

fn compile(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl RuleSet {
    /// Build from configuration.
    ///
    /// Invalid table patterns are skipped with a warning; invalid custom rules
    /// (bad regex or unknown category) are errors.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut set = Self {
            categories: config.categories.iter().map(|c| c.name.clone()).collect(),
            ..Default::default()
        };

        for cat in &config.categories {
            for pattern in &cat.patterns {
                match compile(pattern) {
                    Ok(re) => set.table.push(CategoryRule {
                        category: cat.name.clone(),
                        pattern: re,
                        custom: false,
                    }),
                    Err(e) => warn!(
                        "Skipping invalid pattern for '{}': {} ({})",
                        cat.name, pattern, e
                    ),
                }
            }
        }

        for rule in &config.custom_rules {
            set.add_custom_rule(&rule.category, &rule.regex, rule.prepend)?;
        }

        debug!(
            "Compiled {} table rules, {} custom rules across {} categories",
            set.table.len(),
            set.prepended.len() + set.appended.len(),
            set.categories.len()
        );
        Ok(set)
    }

    /// Rule table from the embedded default configuration
    pub fn default_rules() -> Self {
        let config = EngineConfig {
            custom_rules: Vec::new(),
            ..EngineConfig::default()
        };
        Self::from_config(&config).unwrap_or_default()
    }

    /// Register a custom rule at runtime.
    ///
    /// The category must be one of the table's categories.
    pub fn add_custom_rule(&mut self, category: &str, regex: &str, prepend: bool) -> Result<()> {
        let canonical = self
            .canonical_category(category)
            .ok_or_else(|| {
                Error::Rule(format!(
                    "Unknown category '{}'. Must be one of: {}",
                    category,
                    self.categories.join(", ")
                ))
            })?
            .to_string();

        let rule = CategoryRule {
            category: canonical,
            pattern: compile(regex)?,
            custom: true,
        };
        if prepend {
            self.prepended.insert(0, rule);
        } else {
            self.appended.push(rule);
        }
        Ok(())
    }

    /// Custom rules in evaluation order, ready to persist
    pub fn custom_rules(&self) -> Vec<CustomRuleConfig> {
        let to_config = |rule: &CategoryRule, prepend: bool| CustomRuleConfig {
            category: rule.category.clone(),
            regex: rule.pattern.as_str().to_string(),
            prepend,
        };
        // Prepended rules are stored newest-first; persist oldest-first so a
        // reload re-inserts them into the same order.
        self.prepended
            .iter()
            .rev()
            .map(|r| to_config(r, true))
            .chain(self.appended.iter().map(|r| to_config(r, false)))
            .collect()
    }

    /// Category names in table order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Table spelling of a category name (case-insensitive lookup)
    pub fn canonical_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }

    /// All rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.prepended
            .iter()
            .chain(self.table.iter())
            .chain(self.appended.iter())
    }

    pub fn len(&self) -> usize {
        self.prepended.len() + self.table.len() + self.appended.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First rule matching any of the texts
    pub fn first_match(&self, texts: &[&str]) -> Option<&CategoryRule> {
        self.rules().find(|r| r.matches_any(texts))
    }

    /// Every rule matching any of the texts, in evaluation order
    pub fn matching_rules(&self, texts: &[&str]) -> Vec<&CategoryRule> {
        self.rules().filter(|r| r.matches_any(texts)).collect()
    }

    /// Whether any rule for `category` matches the texts
    pub fn category_matches(&self, category: &str, texts: &[&str]) -> bool {
        self.rules()
            .filter(|r| r.category.eq_ignore_ascii_case(category))
            .any(|r| r.matches_any(texts))
    }
}
