//! Market data provider capability.

use crate::error::{DataError, Result};
use crate::model::{HoldingEntry, NetAssetReport, PriceBar, ShareCountChange};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of raw market data.
///
/// Implementations adapt whatever the upstream returns into typed records. An
/// instrument with no data is reported as an empty vector; errors are reserved
/// for network, HTTP and decoding failures.
pub trait MarketDataProvider {
    /// Daily bars ordered by date ascending.
    fn fetch_prices(&self, code: &str) -> impl Future<Output = Result<Vec<PriceBar>>> + Send;

    /// Net-asset reports, in any order.
    fn fetch_net_assets(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Vec<NetAssetReport>>> + Send;

    /// Share capital change history, in any order.
    fn fetch_share_history(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Vec<ShareCountChange>>> + Send;

    /// Holdings disclosed by an ETF during `year`, across all quarters published.
    fn fetch_holdings(
        &self,
        etf_code: &str,
        year: i32,
    ) -> impl Future<Output = Result<Vec<HoldingEntry>>> + Send;

    /// Whether fetches reach a remote service. Batch pacing only applies to
    /// remote providers.
    fn is_remote(&self) -> bool {
        true
    }
}

/// Provider serving fixed records from memory.
///
/// With no records loaded it acts as an offline provider: every instrument
/// comes back empty, so only cached data can be used. It also counts calls,
/// which makes cache behaviour observable. It reports itself as local unless
/// built with [`StaticProvider::as_remote`].
#[derive(Debug, Default)]
pub struct StaticProvider {
    prices: HashMap<String, Vec<PriceBar>>,
    net_assets: HashMap<String, Vec<NetAssetReport>>,
    share_history: HashMap<String, Vec<ShareCountChange>>,
    holdings: HashMap<String, Vec<HoldingEntry>>,
    failing: HashSet<String>,
    remote: bool,
    calls: AtomicUsize,
}

impl StaticProvider {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bars` for `code`.
    pub fn with_prices(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.prices.insert(code.to_string(), bars);
        self
    }

    /// Serve `reports` for `code`.
    pub fn with_net_assets(mut self, code: &str, reports: Vec<NetAssetReport>) -> Self {
        self.net_assets.insert(code.to_string(), reports);
        self
    }

    /// Serve `history` for `code`.
    pub fn with_share_history(mut self, code: &str, history: Vec<ShareCountChange>) -> Self {
        self.share_history.insert(code.to_string(), history);
        self
    }

    /// Serve `entries` for `etf_code`; [`MarketDataProvider::fetch_holdings`]
    /// returns the entries whose quarter falls in the requested year.
    pub fn with_holdings(mut self, etf_code: &str, entries: Vec<HoldingEntry>) -> Self {
        self.holdings.insert(etf_code.to_string(), entries);
        self
    }

    /// Make every fetch for `code` fail with a provider error.
    pub fn failing_for(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    /// Report the provider as remote, so callers pace it like a network source.
    pub fn as_remote(mut self) -> Self {
        self.remote = true;
        self
    }

    /// Number of fetch calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn serve<T: Clone>(&self, code: &str, table: &HashMap<String, Vec<T>>) -> Result<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(code) {
            return Err(DataError::Provider(format!("no response for {}", code)));
        }
        Ok(table.get(code).cloned().unwrap_or_default())
    }
}

impl MarketDataProvider for StaticProvider {
    async fn fetch_prices(&self, code: &str) -> Result<Vec<PriceBar>> {
        self.serve(code, &self.prices)
    }

    async fn fetch_net_assets(&self, code: &str) -> Result<Vec<NetAssetReport>> {
        self.serve(code, &self.net_assets)
    }

    async fn fetch_share_history(&self, code: &str) -> Result<Vec<ShareCountChange>> {
        self.serve(code, &self.share_history)
    }

    async fn fetch_holdings(&self, etf_code: &str, year: i32) -> Result<Vec<HoldingEntry>> {
        let entries = self.serve(etf_code, &self.holdings)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.quarter.year() == year)
            .collect())
    }

    fn is_remote(&self) -> bool {
        self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32) -> PriceBar {
        PriceBar {
            code: "600000".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: 10.0,
            high: 10.5,
            low: 9.8,
            close: 10.2,
            volume: 1000.0,
            amount: 10_200.0,
        }
    }

    #[tokio::test]
    async fn test_static_provider_serves_and_counts() {
        let provider = StaticProvider::new().with_prices("600000", vec![bar(2), bar(3)]);

        let bars = provider.fetch_prices("600000").await.unwrap();
        assert_eq!(bars.len(), 2);

        let empty = provider.fetch_net_assets("600000").await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_static_provider_failure() {
        let provider = StaticProvider::new().failing_for("000001");
        let result = provider.fetch_prices("000001").await;
        assert!(matches!(result, Err(DataError::Provider(_))));
    }

    #[test]
    fn test_static_provider_is_local_by_default() {
        assert!(!StaticProvider::new().is_remote());
        assert!(StaticProvider::new().as_remote().is_remote());
    }
}
