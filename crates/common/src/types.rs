use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Caller-selected trailing time range for data fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Week,
    #[default]
    Month,
    Quarter,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            "90d" => Some(Self::Quarter),
            _ => None,
        }
    }
}

/// One row of the global daily series: distinct active wallets and traded
/// notional for a calendar day. The API serves these snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DailyMetric {
    pub day: NaiveDate,
    #[serde(rename = "dau", deserialize_with = "count_or_zero")]
    pub active_wallets: u64,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub spot_volume_usd: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub perp_volume_usd: Decimal,
}

/// One wallet in the ranking for a requested window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletRanking {
    pub wallet_id: i64,
    pub address: String,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub spot_volume_usd: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub perp_volume_usd: Decimal,
    #[serde(deserialize_with = "count_or_zero")]
    pub trades: u64,
    #[serde(default)]
    pub last_trade_at: Option<DateTime<Utc>>,
}

/// A registered wallet as listed by the wallet console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletDetails {
    pub wallet_id: i64,
    pub address: String,
    pub label: Option<String>,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
    pub last_ingested_at: Option<DateTime<Utc>>,
    pub cursor_status: Option<String>,
    #[serde(default)]
    pub error_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletPage {
    pub wallets: Vec<WalletDetails>,
    pub total: i64,
}

/// Latest-day headline card. This endpoint is camelCase upstream, unlike the
/// series and wallet rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub day: NaiveDate,
    #[serde(deserialize_with = "count_or_zero")]
    pub dau: u64,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub spot_volume_usd: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub perp_volume_usd: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub avg_spot_per_user: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub avg_perp_per_user: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterOutcome {
    pub wallet_id: i64,
    pub address: String,
    pub label: Option<String>,
    pub is_new: bool,
    #[serde(default)]
    pub backfill_job_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkRegisterOutcome {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub results: BulkRegisterResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkRegisterResults {
    pub successful: Vec<RegisterOutcome>,
    pub failed: Vec<BulkRegisterFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkRegisterFailure {
    pub address: String,
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveOutcome {
    pub success: bool,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOutcome {
    pub valid: bool,
    pub has_activity: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Lenient money boundary: the API sends decimals as strings or numbers,
/// and an unparseable value must enter the model as 0, not poison a sum.
fn decimal_or_zero<'de, D>(de: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(de)?;
    let parsed = match &raw {
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
        serde_json::Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        tracing::warn!(value = %raw, "unparseable decimal field, coerced to 0");
        Decimal::ZERO
    }))
}

/// Same boundary for integer counts.
fn count_or_zero<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(de)?;
    let parsed = match &raw {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        tracing::warn!(value = %raw, "unparseable count field, coerced to 0");
        0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_round_trip() {
        for r in [TimeRange::Week, TimeRange::Month, TimeRange::Quarter] {
            assert_eq!(TimeRange::parse(r.as_str()), Some(r));
        }
        assert_eq!(TimeRange::parse("14d"), None);
        assert_eq!(TimeRange::Quarter.days(), 90);
    }

    #[test]
    fn test_parse_daily_metric_numeric_volumes() {
        let json = r#"{"day":"2026-01-19","dau":1200,"spot_volume_usd":1500000.25,"perp_volume_usd":0}"#;
        let row: DailyMetric = serde_json::from_str(json).unwrap();
        assert_eq!(row.active_wallets, 1200);
        assert_eq!(row.spot_volume_usd, "1500000.25".parse::<Decimal>().unwrap());
        assert_eq!(row.perp_volume_usd, Decimal::ZERO);
    }

    #[test]
    fn test_parse_daily_metric_string_volumes() {
        // At scale the API serves money as strings to dodge float precision.
        let json = r#"{"day":"2026-01-19","dau":"850","spot_volume_usd":"98765432109876543210.99","perp_volume_usd":"12.5"}"#;
        let row: DailyMetric = serde_json::from_str(json).unwrap();
        assert_eq!(row.active_wallets, 850);
        assert_eq!(
            row.spot_volume_usd,
            "98765432109876543210.99".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_malformed_volume_coerces_to_zero() {
        let json = r#"{"day":"2026-01-19","dau":10,"spot_volume_usd":"not-a-number","perp_volume_usd":null}"#;
        let row: DailyMetric = serde_json::from_str(json).unwrap();
        assert_eq!(row.spot_volume_usd, Decimal::ZERO);
        assert_eq!(row.perp_volume_usd, Decimal::ZERO);
    }

    #[test]
    fn test_parse_wallet_ranking_without_last_trade() {
        let json = r#"{"wallet_id":7,"address":"0x1234567890abcdef1234567890abcdef12345678","spot_volume_usd":"100","perp_volume_usd":"200","trades":42}"#;
        let row: WalletRanking = serde_json::from_str(json).unwrap();
        assert_eq!(row.wallet_id, 7);
        assert!(row.last_trade_at.is_none());
    }

    #[test]
    fn test_parse_summary_camel_case() {
        let json = r#"{"day":"2026-01-19","dau":900,"spotVolumeUsd":"1000","perpVolumeUsd":"2000","avgSpotPerUser":"1.11","avgPerpPerUser":"2.22","updatedAt":"2026-01-19T12:00:00Z"}"#;
        let summary: DashboardSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.dau, 900);
        assert_eq!(summary.avg_perp_per_user, "2.22".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_parse_wallet_details_nullable_fields() {
        let json = r#"{"wallet_id":1,"address":"0x1234567890abcdef1234567890abcdef12345678","label":null,"is_active":true,"added_at":"2026-01-15T10:00:00Z","last_ingested_at":null,"cursor_status":null,"error_count":0}"#;
        let w: WalletDetails = serde_json::from_str(json).unwrap();
        assert!(w.label.is_none());
        assert!(w.last_ingested_at.is_none());
    }
}
