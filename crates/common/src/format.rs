//! Display formatting for cards and tables. Kept here (not in the web crate)
//! so view models and tests share one implementation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

const THOUSAND: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Compact a number with K/M/B suffixes: `1234567` → `"1.23M"`.
pub fn format_number(value: Decimal, decimals: usize) -> String {
    let magnitude = value.abs();
    if magnitude >= BILLION {
        format!("{:.decimals$}B", value / BILLION)
    } else if magnitude >= MILLION {
        format!("{:.decimals$}M", value / MILLION)
    } else if magnitude >= THOUSAND {
        format!("{:.decimals$}K", value / THOUSAND)
    } else {
        format!("{value:.decimals$}")
    }
}

/// `$` + compact number, the card default.
pub fn format_usd(value: Decimal) -> String {
    format!("${}", format_number(value, 2))
}

/// Ratio to percent display: `0.123` → `"12.3%"`. Signed.
pub fn format_percent(ratio: Decimal, decimals: usize) -> String {
    let scaled = ratio * Decimal::ONE_HUNDRED;
    format!("{scaled:.decimals$}%")
}

/// `0xabcd..7890` for table cells; short strings pass through. Anything
/// non-ASCII is not an address and passes through untouched.
pub fn shorten_address(address: &str) -> String {
    if address.len() > 12 && address.is_ascii() {
        format!("{}..{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// Coarse relative time for "last synced" style columns. `now` is injected so
/// rendering stays deterministic under test.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let mins = elapsed.num_minutes();
    if mins < 1 {
        return "just now".to_string();
    }
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{days}d ago");
    }
    at.format("%b %e").to_string().replace("  ", " ")
}
