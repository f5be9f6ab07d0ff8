//! Description normalization
//!
//! Statement descriptions carry processor noise ("POS PURCHASE", "DEBIT CARD
//! 1234", "CHECKCARD") that hides the merchant. Rules run against the cleaned,
//! upper-cased text.

use regex::Regex;
use std::sync::OnceLock;

/// Statement noise tokens removed before rule matching
const NOISE_PATTERNS: &[&str] = &[
    r"\bPOS\s+PURCHASE\b",
    r"\bPOS\s+PURCH\b",
    r"\bPOS\s+PUR\b",
    r"\bDBT\s+CRD\s+\d{4,}\b",
    r"\bDEBIT\s+CARD\s+PURCHASE\b",
    r"\bDEBIT\s+CARD\s+\d{4,}\b",
    r"\bCHECKCARD\b",
    r"\bCHECK\s+CARD\b",
    r"\bPURCHASE\s+AUTHORIZATION\b",
    r"\bONLINE\s+TRANSFER\s+TO\b",
    r"\bONLINE\s+TRANSFER\s+FROM\b",
    r"\bMOBILE\s+DEPOSIT\b",
    r"\bPENDING\s+TRANSACTION\b",
    r"\bELECTRONIC\s+PURCHASE\b",
    r"\bCARD\s+MEMBER\s+SERVICES\b",
    r"\bRECURRING\s+PAYMENT\b",
];

fn noise_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        NOISE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("invalid noise regex"))
            .collect()
    })
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

/// Cleaned forms of a transaction description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDescription {
    /// Lower-case, noise-free text for display
    pub display: String,
    /// Upper-case, noise-free text used for rule matching
    pub for_rules: String,
}

/// Upper-case, collapse whitespace, strip noise tokens, collapse again
pub fn normalize_description(desc: &str) -> NormalizedDescription {
    let upper = desc.to_uppercase();
    let mut working = ws_re().replace_all(&upper, " ").into_owned();
    for re in noise_res() {
        working = re.replace_all(&working, " ").into_owned();
    }
    let for_rules = ws_re().replace_all(&working, " ").trim().to_string();

    NormalizedDescription {
        display: for_rules.to_lowercase(),
        for_rules,
    }
}
