//! Transaction and remote-category file loading
//!
//! Transactions come from the statement parser as either a JSON document or a
//! CSV export. Unreadable amounts and dates never drop a row; they load as
//! "no value" and are skipped by numeric aggregation.

use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{RemoteCategory, Transaction};
use crate::parse::parse_amount;

/// Accepted JSON shapes for a transaction list
#[derive(Deserialize)]
#[serde(untagged)]
enum TransactionDocument {
    List(Vec<Transaction>),
    /// Parser response: `{ "transactions": [...], ... }`
    Wrapped { transactions: Vec<Transaction> },
}

/// Accepted JSON shapes for remote categories
#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteDocument {
    List(Vec<Option<RemoteCategory>>),
    /// Categorize response: `{ "metadata": [...] }`
    Metadata { metadata: Vec<Option<RemoteCategory>> },
    /// Bare labels without provenance
    Categories { categories: Vec<Option<String>> },
}

/// Parse a JSON transaction list (bare array or `{ "transactions": [...] }`)
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let doc: TransactionDocument = serde_json::from_reader(reader)?;
    let transactions = match doc {
        TransactionDocument::List(t) | TransactionDocument::Wrapped { transactions: t } => t,
    };
    debug!("Parsed {} JSON transactions", transactions.len());
    Ok(transactions)
}

/// Case-insensitive header → column index lookup
struct Columns {
    date: Option<usize>,
    description: usize,
    amount: Option<usize>,
    account_type: Option<usize>,
    account_number: Option<usize>,
    category: Option<usize>,
    category_source: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Ok(Self {
            date: find("date"),
            description: find("description")
                .ok_or_else(|| Error::InvalidData("CSV is missing a description column".into()))?,
            amount: find("amount"),
            account_type: find("account_type"),
            account_number: find("account_number"),
            category: find("category"),
            category_source: find("category_source"),
        })
    }
}

fn field(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a CSV export with a header row.
///
/// Recognized columns: date, description, amount, account_type,
/// account_number, category, category_source. Only description is required.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::from_headers(&headers)?;
    let mut transactions = Vec::new();

    for result in rdr.records() {
        let record = result?;
        transactions.push(Transaction {
            date: field(&record, columns.date),
            description: field(&record, Some(columns.description)).unwrap_or_default(),
            amount: field(&record, columns.amount).and_then(|a| parse_amount(&a)),
            account_type: field(&record, columns.account_type),
            account_number: field(&record, columns.account_number),
            category: field(&record, columns.category),
            category_source: field(&record, columns.category_source).and_then(|s| s.parse().ok()),
            category_override_reason: None,
        });
    }

    debug!("Parsed {} CSV transactions", transactions.len());
    Ok(transactions)
}

/// Load transactions from a `.csv` or JSON file (chosen by extension)
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file = BufReader::new(File::open(path)?);
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        parse_csv(file)
    } else {
        parse_json(file)
    }
}

/// Parse remote categories aligned by index with a transaction list
pub fn parse_remote_categories<R: Read>(reader: R) -> Result<Vec<Option<RemoteCategory>>> {
    let doc: RemoteDocument = serde_json::from_reader(reader)?;
    Ok(match doc {
        RemoteDocument::List(r) | RemoteDocument::Metadata { metadata: r } => r,
        RemoteDocument::Categories { categories } => categories
            .into_iter()
            .map(|c| {
                c.map(|category| RemoteCategory {
                    category,
                    ..Default::default()
                })
            })
            .collect(),
    })
}

pub fn load_remote_categories(path: &Path) -> Result<Vec<Option<RemoteCategory>>> {
    parse_remote_categories(BufReader::new(File::open(path)?))
}
