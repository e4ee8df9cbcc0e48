//! Seam between handlers and the remote API so the dashboard can be driven
//! by a canned source under test.

use common::client::{ApiError, BulkEntry, DashboardApi, Session};
use common::types::{
    BulkRegisterOutcome, DailyMetric, DashboardSummary, RegisterOutcome, RemoveOutcome, TimeRange,
    ValidateOutcome, WalletPage, WalletRanking,
};
use std::future::Future;

pub trait DataSource {
    fn summary(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<DashboardSummary, ApiError>> + Send;

    fn global_timeseries(
        &self,
        session: &Session,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<DailyMetric>, ApiError>> + Send;

    fn top_wallets(
        &self,
        session: &Session,
        window: TimeRange,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<WalletRanking>, ApiError>> + Send;

    fn list_wallets(
        &self,
        session: &Session,
        limit: u32,
        offset: u32,
    ) -> impl Future<Output = Result<WalletPage, ApiError>> + Send;

    fn register_wallet(
        &self,
        session: &Session,
        address: &str,
        label: Option<&str>,
    ) -> impl Future<Output = Result<RegisterOutcome, ApiError>> + Send;

    fn register_bulk(
        &self,
        session: &Session,
        wallets: Vec<BulkEntry>,
    ) -> impl Future<Output = Result<BulkRegisterOutcome, ApiError>> + Send;

    fn remove_wallet(
        &self,
        session: &Session,
        wallet_id: i64,
    ) -> impl Future<Output = Result<RemoveOutcome, ApiError>> + Send;

    fn validate_wallet(
        &self,
        session: &Session,
        address: &str,
    ) -> impl Future<Output = Result<ValidateOutcome, ApiError>> + Send;
}

impl DataSource for DashboardApi {
    fn summary(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<DashboardSummary, ApiError>> + Send {
        self.fetch_summary(session)
    }

    fn global_timeseries(
        &self,
        session: &Session,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<DailyMetric>, ApiError>> + Send {
        self.fetch_global_timeseries(session, range)
    }

    fn top_wallets(
        &self,
        session: &Session,
        window: TimeRange,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<WalletRanking>, ApiError>> + Send {
        self.fetch_top_wallets(session, window, limit)
    }

    fn list_wallets(
        &self,
        session: &Session,
        limit: u32,
        offset: u32,
    ) -> impl Future<Output = Result<WalletPage, ApiError>> + Send {
        DashboardApi::list_wallets(self, session, limit, offset)
    }

    fn register_wallet(
        &self,
        session: &Session,
        address: &str,
        label: Option<&str>,
    ) -> impl Future<Output = Result<RegisterOutcome, ApiError>> + Send {
        // New wallets always get a backfill so charts do not start empty.
        DashboardApi::register_wallet(self, session, address, label, true)
    }

    fn register_bulk(
        &self,
        session: &Session,
        wallets: Vec<BulkEntry>,
    ) -> impl Future<Output = Result<BulkRegisterOutcome, ApiError>> + Send {
        async move { DashboardApi::register_bulk(self, session, &wallets).await }
    }

    fn remove_wallet(
        &self,
        session: &Session,
        wallet_id: i64,
    ) -> impl Future<Output = Result<RemoveOutcome, ApiError>> + Send {
        DashboardApi::remove_wallet(self, session, wallet_id)
    }

    fn validate_wallet(
        &self,
        session: &Session,
        address: &str,
    ) -> impl Future<Output = Result<ValidateOutcome, ApiError>> + Send {
        DashboardApi::validate_wallet(self, session, address)
    }
}
