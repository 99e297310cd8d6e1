//! Cache-first PB computation for a single instrument.

use crate::error::{DataKind, PbError, Result};
use crate::join::join_pb_series;
use pbval_data::{
    MarketDataProvider, NetAssetReport, PbRecord, PriceBar, RetentionWindow, ShareCountChange,
    SqliteCache,
};
use serde::Serialize;
use tracing::{debug, info};

/// Where a PB series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSource {
    /// Read back from the PB cache
    Cached,
    /// Computed from cached raw data without contacting the provider
    Computed,
    /// Computed after at least one provider request
    Fetched,
}

impl DataSource {
    /// Whether the provider was contacted.
    pub const fn used_network(&self) -> bool {
        matches!(self, Self::Fetched)
    }
}

/// Daily PB series of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PbSeries {
    /// Six-digit instrument code
    pub code: String,
    /// Records in ascending date order
    pub records: Vec<PbRecord>,
    /// Origin of the series
    pub source: DataSource,
}

impl PbSeries {
    /// Defined PB values in date order.
    pub fn pb_values(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.pb).collect()
    }

    /// Most recent record with a defined PB.
    pub fn latest(&self) -> Option<&PbRecord> {
        self.records.iter().rev().find(|r| r.pb.is_some())
    }

    /// Whether the series has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Computes PB series through a cache in front of a provider.
///
/// A cached PB series inside the retention window is returned as is. Otherwise
/// each raw input is read from the cache, fetched from the provider when the
/// cache has none, and the provider's answer is persisted before use. The
/// computed series is persisted too, so a second call never recomputes.
#[derive(Debug)]
pub struct PbService<'a, P> {
    cache: &'a SqliteCache,
    provider: &'a P,
    window: RetentionWindow,
}

impl<'a, P: MarketDataProvider> PbService<'a, P> {
    /// Create a service over `cache` and `provider`.
    pub const fn new(cache: &'a SqliteCache, provider: &'a P, window: RetentionWindow) -> Self {
        Self {
            cache,
            provider,
            window,
        }
    }

    /// Retention window in use.
    pub const fn window(&self) -> &RetentionWindow {
        &self.window
    }

    /// Compute or load the PB series of `code`.
    pub async fn compute_pb_series(&self, code: &str) -> Result<PbSeries> {
        let cached = self.cache.get_pb_series(code, &self.window)?;
        if !cached.is_empty() {
            debug!(code, records = cached.len(), "PB series served from cache");
            return Ok(PbSeries {
                code: code.to_string(),
                records: cached,
                source: DataSource::Cached,
            });
        }

        let mut fetched = false;

        let reports = self.load_net_assets(code, &mut fetched).await?;
        if reports.is_empty() {
            return Err(unavailable(code, DataKind::NetAssets));
        }

        let bars = self.load_prices(code, &mut fetched).await?;
        if bars.is_empty() {
            return Err(unavailable(code, DataKind::Prices));
        }

        let history = self.load_share_history(code, &mut fetched).await?;
        if history.is_empty() {
            return Err(unavailable(code, DataKind::ShareHistory));
        }

        let records = join_pb_series(code, &bars, &reports, &history);
        let written = self.cache.put_pb_series(&records, &self.window)?;
        info!(code, records = records.len(), written, "Computed PB series");

        Ok(PbSeries {
            code: code.to_string(),
            records,
            source: if fetched {
                DataSource::Fetched
            } else {
                DataSource::Computed
            },
        })
    }

    async fn load_prices(&self, code: &str, fetched: &mut bool) -> Result<Vec<PriceBar>> {
        let cached = self.cache.get_prices(code, &self.window)?;
        if !cached.is_empty() {
            return Ok(cached);
        }

        *fetched = true;
        let bars = self
            .provider
            .fetch_prices(code)
            .await
            .map_err(|source| provider_error(code, source))?;
        let bars = self.window.retain(&bars, |b| b.date);
        self.cache.put_prices(&bars, &self.window)?;
        debug!(code, bars = bars.len(), "Fetched prices");
        Ok(bars)
    }

    async fn load_net_assets(&self, code: &str, fetched: &mut bool) -> Result<Vec<NetAssetReport>> {
        let cached = self.cache.get_net_assets(code, &self.window)?;
        if !cached.is_empty() {
            return Ok(cached);
        }

        *fetched = true;
        let reports = self
            .provider
            .fetch_net_assets(code)
            .await
            .map_err(|source| provider_error(code, source))?;
        let reports = self.window.retain(&reports, |r| r.period_end);
        self.cache.put_net_assets(&reports, &self.window)?;
        debug!(code, reports = reports.len(), "Fetched net assets");
        Ok(reports)
    }

    async fn load_share_history(
        &self,
        code: &str,
        fetched: &mut bool,
    ) -> Result<Vec<ShareCountChange>> {
        let cached = self.cache.get_share_history(code)?;
        if !cached.is_empty() {
            return Ok(cached);
        }

        *fetched = true;
        let history = self
            .provider
            .fetch_share_history(code)
            .await
            .map_err(|source| provider_error(code, source))?;
        self.cache.put_share_history(&history)?;
        debug!(code, changes = history.len(), "Fetched share history");
        Ok(history)
    }
}

fn unavailable(code: &str, what: DataKind) -> PbError {
    PbError::DataUnavailable {
        code: code.to_string(),
        what,
    }
}

fn provider_error(code: &str, source: pbval_data::DataError) -> PbError {
    PbError::Provider {
        code: code.to_string(),
        source,
    }
}
