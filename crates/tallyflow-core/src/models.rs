//! Domain models for Tallyflow

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::parse::{parse_amount, parse_date};

/// Category assigned to transfers between the user's own accounts
pub const ACCOUNT_TRANSFER: &str = "Account Transfer";
pub const INCOME: &str = "Income";
pub const SAVINGS: &str = "Savings";
pub const HOUSING: &str = "Housing";
/// Bucket for negative amounts that never received a category
pub const UNCATEGORIZED: &str = "Uncategorized";
/// Synthetic flow bucket for folded long-tail categories
pub const OTHER: &str = "Other";

/// Account types as reported by the statement parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    CreditCard,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::CreditCard => "credit_card",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit_card" | "credit card" | "credit" => Ok(Self::CreditCard),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

/// Provenance tag: how a transaction's category was assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// Matched a rule in the category table
    Regex,
    /// No rule matched; keyword fallback or the neutral default
    Fallback,
    /// Explicit override (backend flag or user action); sticky
    Override,
    /// Positive inflow to a checking account
    IncomeRule,
    /// Positive inflow to a savings account
    SavingsRule,
    /// Large unexplained checking outflow moved to Housing
    AmountRule,
    /// Visited by the external refinement step
    Ai,
    /// Balance roll-forward marker row, intentionally left blank
    Skip,
}

impl CategorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Fallback => "fallback",
            Self::Override => "override",
            Self::IncomeRule => "income_rule",
            Self::SavingsRule => "savings_rule",
            Self::AmountRule => "amount_rule",
            Self::Ai => "ai",
            Self::Skip => "skip",
        }
    }

    /// Whether the category came only from local heuristics
    pub fn is_local_heuristic(&self) -> bool {
        matches!(self, Self::Regex | Self::Fallback)
    }

    /// Whether one of the numeric override rules produced the category
    pub fn is_numeric_rule(&self) -> bool {
        matches!(self, Self::IncomeRule | Self::SavingsRule | Self::AmountRule)
    }
}

impl std::fmt::Display for CategorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CategorySource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regex" => Ok(Self::Regex),
            "fallback" => Ok(Self::Fallback),
            "override" => Ok(Self::Override),
            "income_rule" => Ok(Self::IncomeRule),
            "savings_rule" => Ok(Self::SavingsRule),
            "amount_rule" => Ok(Self::AmountRule),
            "ai" => Ok(Self::Ai),
            "skip" => Ok(Self::Skip),
            _ => Err(format!("Unknown category source: {}", s)),
        }
    }
}

/// A parsed statement row.
///
/// Every field except `description` is optional: the parser may fail to read an
/// amount or date, and such rows stay in the list untouched while numeric
/// aggregation skips them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_description")]
    pub description: String,
    /// Positive = inflow/credit, negative = outflow/charge
    #[serde(
        default,
        deserialize_with = "lenient_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub account_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub account_number: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_source",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_source: Option<CategorySource>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_override_reason: Option<String>,
}

impl Transaction {
    pub fn new(date: &str, description: &str, amount: f64) -> Self {
        Self {
            date: Some(date.to_string()),
            description: description.to_string(),
            amount: Some(amount),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account_type: &str, account_number: Option<&str>) -> Self {
        self.account_type = Some(account_type.to_string());
        self.account_number = account_number.map(str::to_string);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Amount if present and finite
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.filter(|a| a.is_finite())
    }

    /// Parsed calendar date, if the raw date is readable
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_date)
    }

    /// Recognized account type (checking, savings, credit card)
    pub fn account_kind(&self) -> Option<AccountType> {
        self.account_type.as_deref().and_then(|t| t.parse().ok())
    }

    pub fn is_credit_card(&self) -> bool {
        self.account_kind() == Some(AccountType::CreditCard)
    }

    /// Case-insensitive category comparison
    pub fn category_is(&self, name: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(name))
    }

    pub fn is_user_override(&self) -> bool {
        self.category_source == Some(CategorySource::Override)
    }

    /// Balance roll-forward row the classifier left blank
    pub fn is_balance_marker(&self) -> bool {
        self.category_source == Some(CategorySource::Skip)
    }
}

/// Category result supplied by the remote refinement service for one row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCategory {
    #[serde(default, alias = "final_category")]
    pub category: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub override_applied: bool,
    #[serde(default)]
    pub override_reason: Option<String>,
}

/// Accept a JSON number or a currency-like string; anything else is `None`
fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => parse_amount(&s),
        _ => None,
    })
}

/// Strings pass through, numbers become their text form, anything else is `None`
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_description<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// Unknown provenance strings are dropped rather than failing the whole file
fn lenient_source<'de, D>(deserializer: D) -> std::result::Result<Option<CategorySource>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("Checking".parse::<AccountType>(), Ok(AccountType::Checking));
        assert_eq!(
            "credit_card".parse::<AccountType>(),
            Ok(AccountType::CreditCard)
        );
        assert!("brokerage".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_category_source_roundtrip_names() {
        for source in [
            CategorySource::Regex,
            CategorySource::Fallback,
            CategorySource::Override,
            CategorySource::IncomeRule,
            CategorySource::SavingsRule,
            CategorySource::AmountRule,
            CategorySource::Ai,
            CategorySource::Skip,
        ] {
            assert_eq!(source.as_str().parse::<CategorySource>(), Ok(source));
        }
    }

    #[test]
    fn test_transaction_lenient_deserialize() {
        let json = r#"[
            {"date": "2025-07-03", "description": "PAYROLL", "amount": 1500.0, "account_type": "checking"},
            {"description": "bad amount", "amount": "n/a"},
            {"description": "string amount", "amount": "(42.10)"},
            {"description": "unknown source", "category_source": "magic"},
            {"amount": null}
        ]"#;
        let txns: Vec<Transaction> = serde_json::from_str(json).unwrap();
        assert_eq!(txns.len(), 5);
        assert_eq!(txns[0].amount_value(), Some(1500.0));
        assert_eq!(txns[0].account_kind(), Some(AccountType::Checking));
        assert_eq!(txns[1].amount, None);
        assert_eq!(txns[2].amount, Some(-42.1));
        assert_eq!(txns[3].category_source, None);
        assert_eq!(txns[4].description, "");
    }

    #[test]
    fn test_transaction_non_string_fields() {
        let json = r#"[
            {"date": 20250703, "description": 1043, "amount": -12.0,
             "account_type": true, "account_number": 1234, "category": ["Food"],
             "category_source": 7, "category_override_reason": {"why": 1}}
        ]"#;
        let txns: Vec<Transaction> = serde_json::from_str(json).unwrap();
        assert_eq!(txns.len(), 1);
        let tx = &txns[0];
        assert_eq!(tx.date.as_deref(), Some("20250703"));
        assert_eq!(tx.parsed_date(), None);
        assert_eq!(tx.description, "1043");
        assert_eq!(tx.amount_value(), Some(-12.0));
        assert_eq!(tx.account_type, None);
        assert_eq!(tx.account_number.as_deref(), Some("1234"));
        assert_eq!(tx.category, None);
        assert_eq!(tx.category_source, None);
        assert_eq!(tx.category_override_reason, None);
    }

    #[test]
    fn test_category_is_case_insensitive() {
        let tx = Transaction::new("2025-01-01", "x", 1.0).with_category("income");
        assert!(tx.category_is("Income"));
        assert!(!tx.category_is("Savings"));
    }

    #[test]
    fn test_parsed_date_invalid() {
        let mut tx = Transaction::new("not a date", "x", 1.0);
        assert_eq!(tx.parsed_date(), None);
        tx.date = None;
        assert_eq!(tx.parsed_date(), None);
    }
}
