//! View models for dashboard templates.
//! These are the typed structs that templates render — derivation happens in
//! `common::metrics`, display formatting here, nothing else.

use chrono::{DateTime, Utc};
use common::format::{format_number, format_percent, format_usd, relative_time, shorten_address};
use common::metrics::DerivedSummary;
use common::types::{DailyMetric, DashboardSummary, TimeRange, WalletDetails, WalletRanking};
use rust_decimal::Decimal;

/// Summary cards for the analytics header.
pub struct SummaryView {
    pub range_label: String,
    pub avg_active_display: String,
    pub wau_display: String,
    pub mau_display: String,
    pub total_spot_display: String,
    pub total_perp_display: String,
    pub dau_change_display: String,
    pub dau_change_color: String,
    pub spot_change_display: String,
    pub spot_change_color: String,
    pub perp_change_display: String,
    pub perp_change_color: String,
}

fn change_cell(ratio: Decimal) -> (String, String) {
    let color = if ratio >= Decimal::ZERO {
        "text-green-400"
    } else {
        "text-red-400"
    };
    (format_percent(ratio, 1), color.to_string())
}

fn range_label(range: TimeRange) -> String {
    format!("last {} days", range.days())
}

pub fn summary_view(summary: &DerivedSummary, range: TimeRange) -> SummaryView {
    let (dau_change_display, dau_change_color) = change_cell(summary.active_wallets_change_ratio);
    let (spot_change_display, spot_change_color) = change_cell(summary.spot_volume_change_ratio);
    let (perp_change_display, perp_change_color) = change_cell(summary.perp_volume_change_ratio);
    SummaryView {
        range_label: range_label(range),
        avg_active_display: format_number(summary.average_active_wallets, 0),
        wau_display: format_number(Decimal::from(summary.weekly_active_wallets), 1),
        mau_display: format_number(Decimal::from(summary.monthly_active_wallets), 1),
        total_spot_display: format_usd(summary.total_spot_volume_usd),
        total_perp_display: format_usd(summary.total_perp_volume_usd),
        dau_change_display,
        dau_change_color,
        spot_change_display,
        spot_change_color,
        perp_change_display,
        perp_change_color,
    }
}

/// Per-user averages from the precomputed summary endpoint. These arrive
/// already derived by the API and are only formatted here.
pub struct PerUserView {
    pub avg_spot_display: String,
    pub avg_perp_display: String,
    pub as_of_display: String,
}

pub fn per_user_view(summary: &DashboardSummary) -> PerUserView {
    PerUserView {
        avg_spot_display: format_usd(summary.avg_spot_per_user),
        avg_perp_display: format_usd(summary.avg_perp_per_user),
        as_of_display: summary
            .day
            .format("%b %e, %Y")
            .to_string()
            .replace("  ", " "),
    }
}

/// Row in the daily trend table, latest day first.
pub struct TrendRow {
    pub day_display: String,
    pub dau_display: String,
    pub spot_display: String,
    pub perp_display: String,
}

pub fn trend_rows(series: &[DailyMetric], limit: usize) -> Vec<TrendRow> {
    series
        .iter()
        .rev()
        .take(limit)
        .map(|row| TrendRow {
            day_display: row.day.format("%b %e, %Y").to_string().replace("  ", " "),
            dau_display: row.active_wallets.to_string(),
            spot_display: format_usd(row.spot_volume_usd),
            perp_display: format_usd(row.perp_volume_usd),
        })
        .collect()
}

/// Row in the top-traders table.
pub struct TopWalletRow {
    pub address: String,
    pub address_short: String,
    pub spot_display: String,
    pub perp_display: String,
    pub total_display: String,
    pub trades: u64,
    pub last_trade_display: String,
}

pub fn top_wallet_rows(rankings: &[WalletRanking], now: DateTime<Utc>) -> Vec<TopWalletRow> {
    rankings
        .iter()
        .map(|r| TopWalletRow {
            address: r.address.clone(),
            address_short: shorten_address(&r.address),
            spot_display: format_usd(r.spot_volume_usd),
            perp_display: format_usd(r.perp_volume_usd),
            total_display: format_usd(r.spot_volume_usd + r.perp_volume_usd),
            trades: r.trades,
            last_trade_display: r
                .last_trade_at
                .map_or_else(|| "—".to_string(), |at| relative_time(at, now)),
        })
        .collect()
}

/// Header counts for the wallet console, derived from the loaded page.
pub struct WalletStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub errors: usize,
}

pub fn wallet_stats(wallets: &[WalletDetails]) -> WalletStats {
    WalletStats {
        total: wallets.len(),
        active: wallets.iter().filter(|w| w.is_active).count(),
        pending: wallets.iter().filter(|w| w.last_ingested_at.is_none()).count(),
        errors: wallets.iter().filter(|w| w.error_count > 0).count(),
    }
}

/// Row in the tracked-wallets table.
pub struct WalletRowView {
    pub wallet_id: i64,
    pub address: String,
    pub address_short: String,
    pub label: String,
    pub status_label: String,
    pub status_color: String,
    pub last_synced_display: String,
    pub added_display: String,
}

/// Status precedence: inactive, then errors, then synced cursor, then
/// never-ingested, then syncing.
fn status_badge(wallet: &WalletDetails) -> (String, String) {
    if !wallet.is_active {
        return ("Inactive".to_string(), "text-gray-400".to_string());
    }
    if wallet.error_count > 0 {
        return (
            format!("{} errors", wallet.error_count),
            "text-red-400".to_string(),
        );
    }
    if wallet.cursor_status.as_deref() == Some("ok") {
        return ("Synced".to_string(), "text-green-400".to_string());
    }
    if wallet.last_ingested_at.is_none() {
        return ("Pending".to_string(), "text-yellow-400".to_string());
    }
    ("Syncing".to_string(), "text-blue-400".to_string())
}

pub fn wallet_rows(wallets: &[WalletDetails], now: DateTime<Utc>) -> Vec<WalletRowView> {
    wallets
        .iter()
        .map(|w| {
            let (status_label, status_color) = status_badge(w);
            WalletRowView {
                wallet_id: w.wallet_id,
                address: w.address.clone(),
                address_short: shorten_address(&w.address),
                label: w.label.clone().unwrap_or_default(),
                status_label,
                status_color,
                last_synced_display: w
                    .last_ingested_at
                    .map_or_else(|| "Never".to_string(), |at| relative_time(at, now)),
                added_display: relative_time(w.added_at, now),
            }
        })
        .collect()
}
