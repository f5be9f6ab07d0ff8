//! Lenient parsing of statement amounts and dates
//!
//! Parsed statements hand us amounts as numbers or as currency-like strings and
//! dates in whatever format the statement used. Anything that cannot be read
//! becomes `None` ("no numeric signal") instead of an error.

use chrono::NaiveDate;

/// Formats for dates whose leading segment is a four-digit year
const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
/// Month-first formats with a two-digit trailing year
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];
const LONG_YEAR_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];

/// Pick formats from the segment shape. chrono's `%Y` also accepts one or two
/// digits, so `07/03/25` must never reach a `%Y` format.
fn date_formats(raw: &str) -> &'static [&'static str] {
    let mut segments = raw.split(['-', '/']);
    let leading = segments.next().unwrap_or_default();
    if leading.len() == 4 {
        return YEAR_FIRST_FORMATS;
    }
    match segments.last() {
        Some(year) if year.len() == 2 => SHORT_YEAR_FORMATS,
        _ => LONG_YEAR_FORMATS,
    }
}

/// Largest absolute amount accepted from a statement row
const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// Parse a currency-like token into a signed amount.
///
/// Accepts `1234.56`, `$1,234.56`, `-12.00`, `(12.00)` and `12.00-` (the last two
/// are negative). Rejects more than two fractional digits, more than seven
/// integer digits without a decimal point, and magnitudes above one billion.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut token = raw.trim();
    if token.is_empty() {
        return None;
    }
    let mut negative = false;

    if token.ends_with('-') && token.matches('-').count() == 1 {
        negative = true;
        token = &token[..token.len() - 1];
    }
    if token.starts_with('(') && token.ends_with(')') && token.len() >= 2 {
        negative = true;
        token = &token[1..token.len() - 1];
    }

    let mut core: String = token.chars().filter(|c| *c != '$' && *c != ',').collect();
    if let Some(stripped) = core.strip_prefix('-') {
        negative = true;
        core = stripped.to_string();
    } else if let Some(stripped) = core.strip_prefix('+') {
        core = stripped.to_string();
    }

    let (int_part, frac_part) = match core.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (core.as_str(), None),
    };
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match frac_part {
        Some(f) => {
            if f.is_empty() || f.len() > 2 || !f.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
        }
        None => {
            if int_part.len() > 7 {
                return None;
            }
        }
    }

    let value: f64 = core.parse().ok()?;
    if value > MAX_AMOUNT {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Parse a statement date into a calendar date.
///
/// Tries the common statement formats, then falls back to the date portion of
/// an RFC 3339 / ISO timestamp (`2025-07-03T00:00:00Z`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in date_formats(trimmed) {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    // ISO timestamps: take the leading date
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
