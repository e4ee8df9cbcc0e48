//! Derived-metrics computations behind the dashboard and analytics views.
//!
//! Everything here is a pure function of its input rows: the web layer
//! fetches a window of raw rows, derives, renders, and throws the result
//! away on the next window change. Degenerate input (empty series, single
//! row, zero baselines) always produces zeros, never an error.

use rust_decimal::Decimal;

use crate::types::{DailyMetric, WalletDetails};

/// Sums and mean over a fetched window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTotals {
    pub total_spot_volume_usd: Decimal,
    pub total_perp_volume_usd: Decimal,
    pub average_active_wallets: Decimal,
}

/// Day-over-day relative change, latest vs second-to-latest row.
/// Dimensionless ratios; the view multiplies by 100 for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodChange {
    pub active_wallets_change_ratio: Decimal,
    pub spot_volume_change_ratio: Decimal,
    pub perp_volume_change_ratio: Decimal,
}

/// Everything the summary cards need, derived fresh per fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSummary {
    pub average_active_wallets: Decimal,
    pub total_spot_volume_usd: Decimal,
    pub total_perp_volume_usd: Decimal,
    pub active_wallets_change_ratio: Decimal,
    pub spot_volume_change_ratio: Decimal,
    pub perp_volume_change_ratio: Decimal,
    pub weekly_active_wallets: u64,
    pub monthly_active_wallets: u64,
}

pub fn compute_period_totals(series: &[DailyMetric]) -> PeriodTotals {
    let mut spot = Decimal::ZERO;
    let mut perp = Decimal::ZERO;
    let mut active: u64 = 0;
    for row in series {
        spot += row.spot_volume_usd;
        perp += row.perp_volume_usd;
        active += row.active_wallets;
    }

    let average_active_wallets = if series.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from(active) / Decimal::from(series.len() as u64)
    };

    PeriodTotals {
        total_spot_volume_usd: spot,
        total_perp_volume_usd: perp,
        average_active_wallets,
    }
}

/// `(latest - previous) / previous` per field. A zero previous value yields a
/// zero ratio rather than pretending any nonzero latest is infinite growth.
pub fn compute_period_change(series: &[DailyMetric]) -> PeriodChange {
    let (Some(latest), Some(previous)) = (
        series.last(),
        series.len().checked_sub(2).and_then(|i| series.get(i)),
    ) else {
        return PeriodChange {
            active_wallets_change_ratio: Decimal::ZERO,
            spot_volume_change_ratio: Decimal::ZERO,
            perp_volume_change_ratio: Decimal::ZERO,
        };
    };

    PeriodChange {
        active_wallets_change_ratio: change_ratio(
            Decimal::from(latest.active_wallets),
            Decimal::from(previous.active_wallets),
        ),
        spot_volume_change_ratio: change_ratio(latest.spot_volume_usd, previous.spot_volume_usd),
        perp_volume_change_ratio: change_ratio(latest.perp_volume_usd, previous.perp_volume_usd),
    }
}

fn change_ratio(latest: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        Decimal::ZERO
    } else {
        (latest - previous) / previous
    }
}

/// Max `active_wallets` over the trailing `window_days` rows (fewer if the
/// series is shorter). Empty input floors at 0.
///
/// With `window_days` 7/30 this approximates WAU/MAU from a daily series.
/// It is not a true distinct-wallet union across days and undercounts when
/// active wallets rotate; kept for compatibility with the displayed numbers.
pub fn compute_rolling_max(series: &[DailyMetric], window_days: usize) -> u64 {
    let start = series.len().saturating_sub(window_days);
    series[start..]
        .iter()
        .map(|row| row.active_wallets)
        .max()
        .unwrap_or(0)
}

/// One-shot derivation of the full summary shape for a fetched series.
pub fn derive_summary(series: &[DailyMetric]) -> DerivedSummary {
    let totals = compute_period_totals(series);
    let change = compute_period_change(series);
    DerivedSummary {
        average_active_wallets: totals.average_active_wallets,
        total_spot_volume_usd: totals.total_spot_volume_usd,
        total_perp_volume_usd: totals.total_perp_volume_usd,
        active_wallets_change_ratio: change.active_wallets_change_ratio,
        spot_volume_change_ratio: change.spot_volume_change_ratio,
        perp_volume_change_ratio: change.perp_volume_change_ratio,
        weekly_active_wallets: compute_rolling_max(series, 7),
        monthly_active_wallets: compute_rolling_max(series, 30),
    }
}

/// Case-insensitive substring search over address or label. Empty query
/// returns the input unchanged; order is always preserved.
pub fn filter_wallets(wallets: &[WalletDetails], query: &str) -> Vec<WalletDetails> {
    if query.is_empty() {
        return wallets.to_vec();
    }
    let needle = query.to_lowercase();
    wallets
        .iter()
        .filter(|w| {
            w.address.to_lowercase().contains(&needle)
                || w.label
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(u64::from(offset))
    }

    fn row(offset: u32, dau: u64, spot: &str, perp: &str) -> DailyMetric {
        DailyMetric {
            day: day(offset),
            active_wallets: dau,
            spot_volume_usd: spot.parse().unwrap(),
            perp_volume_usd: perp.parse().unwrap(),
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_totals_empty_series_all_zero() {
        let totals = compute_period_totals(&[]);
        assert_eq!(totals.total_spot_volume_usd, Decimal::ZERO);
        assert_eq!(totals.total_perp_volume_usd, Decimal::ZERO);
        assert_eq!(totals.average_active_wallets, Decimal::ZERO);
    }

    #[test]
    fn test_totals_sums_and_average() {
        let series = vec![
            row(0, 100, "10.50", "1"),
            row(1, 200, "0.25", "2"),
            row(2, 300, "5.25", "3"),
        ];
        let totals = compute_period_totals(&series);
        assert_eq!(totals.total_spot_volume_usd, dec("16.00"));
        assert_eq!(totals.total_perp_volume_usd, dec("6"));
        assert_eq!(totals.average_active_wallets, dec("200"));
    }

    #[test]
    fn test_totals_exact_over_thousand_rows() {
        // 0.1 summed 1000 times must be exactly 100, not 99.9999...
        let series: Vec<DailyMetric> = (0..1000).map(|i| row(i, 1, "0.1", "0.01")).collect();
        let totals = compute_period_totals(&series);
        assert_eq!(totals.total_spot_volume_usd, dec("100.0"));
        assert_eq!(totals.total_perp_volume_usd, dec("10.00"));
        assert_eq!(totals.average_active_wallets, dec("1"));
    }

    #[test]
    fn test_change_short_series_is_zero() {
        let empty = compute_period_change(&[]);
        assert_eq!(empty.active_wallets_change_ratio, Decimal::ZERO);

        let one = compute_period_change(&[row(0, 100, "5", "5")]);
        assert_eq!(one.spot_volume_change_ratio, Decimal::ZERO);
        assert_eq!(one.perp_volume_change_ratio, Decimal::ZERO);
    }

    #[test]
    fn test_change_latest_vs_previous() {
        let series = vec![row(0, 100, "200", "50"), row(1, 150, "100", "75")];
        let change = compute_period_change(&series);
        assert_eq!(change.active_wallets_change_ratio, dec("0.5"));
        assert_eq!(change.spot_volume_change_ratio, dec("-0.5"));
        assert_eq!(change.perp_volume_change_ratio, dec("0.5"));
    }

    #[test]
    fn test_change_uses_last_two_rows_only() {
        let series = vec![
            row(0, 1, "1", "1"),
            row(1, 100, "200", "50"),
            row(2, 150, "100", "75"),
        ];
        let change = compute_period_change(&series);
        assert_eq!(change.active_wallets_change_ratio, dec("0.5"));
    }

    #[test]
    fn test_change_zero_previous_is_zero_not_infinite() {
        let series = vec![row(0, 0, "0", "10"), row(1, 500, "9999", "20")];
        let change = compute_period_change(&series);
        assert_eq!(change.active_wallets_change_ratio, Decimal::ZERO);
        assert_eq!(change.spot_volume_change_ratio, Decimal::ZERO);
        assert_eq!(change.perp_volume_change_ratio, dec("1"));
    }

    #[test]
    fn test_rolling_max_empty_is_zero() {
        assert_eq!(compute_rolling_max(&[], 7), 0);
        assert_eq!(compute_rolling_max(&[], 0), 0);
    }

    #[test]
    fn test_rolling_max_window_shorter_than_series() {
        // 10 days of 1..=10; the last 7 are 4..=10, so the max is 10 even
        // though day 10 is also the global max. Make the early rows the
        // larger ones to show the window actually trims.
        let rising: Vec<DailyMetric> = (0..10).map(|i| row(i, u64::from(i) + 1, "0", "0")).collect();
        assert_eq!(compute_rolling_max(&rising, 7), 10);

        let falling: Vec<DailyMetric> =
            (0..10).map(|i| row(i, 10 - u64::from(i), "0", "0")).collect();
        assert_eq!(compute_rolling_max(&falling, 7), 7);
    }

    #[test]
    fn test_rolling_max_window_longer_than_series() {
        let series = vec![row(0, 5, "0", "0")];
        assert_eq!(compute_rolling_max(&series, 30), 5);
    }

    #[test]
    fn test_derive_summary_combines_all_fields() {
        let series: Vec<DailyMetric> =
            (0..40).map(|i| row(i, u64::from(i), "1.5", "0.5")).collect();
        let summary = derive_summary(&series);
        assert_eq!(summary.total_spot_volume_usd, dec("60.0"));
        assert_eq!(summary.total_perp_volume_usd, dec("20.0"));
        assert_eq!(summary.weekly_active_wallets, 39);
        assert_eq!(summary.monthly_active_wallets, 39);
        // 38 -> 39 actives
        assert_eq!(
            summary.active_wallets_change_ratio,
            Decimal::from(1) / Decimal::from(38)
        );
    }

    #[test]
    fn test_derive_summary_idempotent() {
        let series = vec![row(0, 3, "1.23", "4.56"), row(1, 9, "7.89", "0.12")];
        assert_eq!(derive_summary(&series), derive_summary(&series));
        assert_eq!(
            compute_period_totals(&series),
            compute_period_totals(&series)
        );
    }

    fn wallet(id: i64, address: &str, label: Option<&str>) -> WalletDetails {
        WalletDetails {
            wallet_id: id,
            address: address.to_string(),
            label: label.map(str::to_string),
            is_active: true,
            added_at: "2026-01-15T10:00:00Z".parse().unwrap(),
            last_ingested_at: None,
            cursor_status: None,
            error_count: 0,
        }
    }

    #[test]
    fn test_filter_empty_query_is_identity() {
        let wallets = vec![
            wallet(1, "0xaaaa567890abcdef1234567890abcdef12345678", Some("Main")),
            wallet(2, "0xbbbb567890abcdef1234567890abcdef12345678", None),
        ];
        let out = filter_wallets(&wallets, "");
        assert_eq!(out, wallets);
    }

    #[test]
    fn test_filter_matches_address_substring_case_insensitive() {
        let wallets = vec![
            wallet(1, "0xaaaa567890abcdef1234567890abcdef12345678", None),
            wallet(2, "0xbbbb567890abcdef1234567890abcdef12345678", None),
        ];
        let out = filter_wallets(&wallets, "BBBB");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].wallet_id, 2);
        // substring anywhere, not a prefix match
        let mid = filter_wallets(&wallets, "567890abc");
        assert_eq!(mid.len(), 2);
    }

    #[test]
    fn test_filter_matches_label() {
        let wallets = vec![
            wallet(1, "0xaaaa567890abcdef1234567890abcdef12345678", Some("Whale Tracker")),
            wallet(2, "0xbbbb567890abcdef1234567890abcdef12345678", Some("Bot Account")),
            wallet(3, "0xcccc567890abcdef1234567890abcdef12345678", None),
        ];
        let out = filter_wallets(&wallets, "whale");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].wallet_id, 1);
    }

    #[test]
    fn test_filter_preserves_input_order() {
        let wallets = vec![
            wallet(3, "0xcccc567890abcdef1234567890abcdef12345678", Some("x")),
            wallet(1, "0xaaaa567890abcdef1234567890abcdef12345678", Some("x")),
            wallet(2, "0xbbbb567890abcdef1234567890abcdef12345678", Some("x")),
        ];
        let out = filter_wallets(&wallets, "x");
        let ids: Vec<i64> = out.iter().map(|w| w.wallet_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
