//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (engine loading, input loading, date range, JSON output)
//! - `classify` - Classification and refinement commands
//! - `reports` - Consistency, allocation, flow, stats and full analysis
//! - `rules` - Rule table commands (list, test, add)

pub mod classify;
pub mod core;
pub mod reports;
pub mod rules;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use reports::*;
pub use rules::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format a signed amount with a thousands separator
pub fn format_amount(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", amount.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}.{}", sign, grouped, frac)
}
