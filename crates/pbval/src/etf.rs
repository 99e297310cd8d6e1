//! ETF valuation workflow.
//!
//! Holdings come from `hold_<etf>.csv` when present, otherwise from the
//! provider, in which case they are saved for the next run. Every constituent
//! then goes through the batch runner and the composite is built with the
//! standard fallback policy.

use crate::batch::{BatchReport, BatchRunner, InstrumentOutcome};
use crate::config::PbConfig;
use crate::error::Result;
use pbval_data::{
    DataError, HoldingEntry, MarketDataProvider, RetentionWindow, SqliteCache, code, holdings,
};
use pbval_engine::{Aggregation, Composite, CompositeInput, FallbackPolicy};
use pbval_output::{EtfPriceProfile, ValuationSummary};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::{info, warn};

/// Where an ETF's holdings were loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingsSource {
    /// An existing holdings file
    File(PathBuf),
    /// The provider; the result was saved to the given file
    Provider(PathBuf),
}

/// Fetch an ETF's holdings for every year in `years`.
///
/// A year that fails or has no disclosure is logged and skipped.
pub async fn fetch_holdings_range<P: MarketDataProvider>(
    provider: &P,
    etf_code: &str,
    years: RangeInclusive<i32>,
) -> Vec<HoldingEntry> {
    let mut entries = Vec::new();
    for year in years {
        match provider.fetch_holdings(etf_code, year).await {
            Ok(found) if found.is_empty() => {
                info!(etf = etf_code, year, "No holdings disclosed");
            }
            Ok(found) => {
                info!(etf = etf_code, year, rows = found.len(), "Fetched holdings");
                entries.extend(found);
            }
            Err(e) => {
                warn!(etf = etf_code, year, error = %e, "Holdings fetch failed, skipping year");
            }
        }
    }
    entries
}

/// Fetch holdings across `years` and write them to the holdings file.
///
/// Returns the entries and the file written, or `None` for the path when
/// nothing was disclosed.
pub async fn refresh_holdings<P: MarketDataProvider>(
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    years: RangeInclusive<i32>,
) -> Result<(Vec<HoldingEntry>, Option<PathBuf>)> {
    let etf_code = code::validate(etf_code)?;
    let entries = fetch_holdings_range(provider, etf_code, years).await;
    if entries.is_empty() {
        return Ok((entries, None));
    }

    let path = holdings::holdings_path(&config.holdings_dir, etf_code);
    holdings::write_holdings(&path, &entries)?;
    info!(etf = etf_code, path = %path.display(), rows = entries.len(), "Saved holdings");
    Ok((entries, Some(path)))
}

/// Load an ETF's holdings from its file, falling back to the provider.
pub async fn load_holdings<P: MarketDataProvider>(
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    years: RangeInclusive<i32>,
) -> Result<(Vec<HoldingEntry>, HoldingsSource)> {
    let etf_code = code::validate(etf_code)?;
    let path = holdings::holdings_path(&config.holdings_dir, etf_code);

    if path.exists() {
        let entries = holdings::read_holdings(&path, etf_code)?;
        if !entries.is_empty() {
            info!(etf = etf_code, path = %path.display(), rows = entries.len(), "Loaded holdings");
            return Ok((entries, HoldingsSource::File(path)));
        }
        warn!(etf = etf_code, path = %path.display(), "Holdings file has no usable rows");
    }

    let (entries, written) = refresh_holdings(provider, config, etf_code, years).await?;
    Ok((entries, HoldingsSource::Provider(written.unwrap_or(path))))
}

/// Result of valuing an ETF.
#[derive(Debug)]
pub struct EtfValuation {
    /// ETF code
    pub etf_code: String,
    /// Holdings used
    pub holdings: Vec<HoldingEntry>,
    /// Where the holdings came from
    pub holdings_source: HoldingsSource,
    /// Constituent batch report
    pub batch: BatchReport,
    /// Composite and the strategy that produced it
    pub aggregation: Aggregation,
    /// Valuation summary of the composite history, when one was built
    pub summary: Option<ValuationSummary>,
}

/// Value an ETF end to end.
pub async fn value_etf<P: MarketDataProvider>(
    cache: &SqliteCache,
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    years: RangeInclusive<i32>,
) -> Result<EtfValuation> {
    value_etf_with(cache, provider, config, etf_code, years, |_, _, _| {}).await
}

/// Value an ETF, calling `on_constituent(total, code, outcome)` after each
/// constituent.
pub async fn value_etf_with<P, F>(
    cache: &SqliteCache,
    provider: &P,
    config: &PbConfig,
    etf_code: &str,
    years: RangeInclusive<i32>,
    mut on_constituent: F,
) -> Result<EtfValuation>
where
    P: MarketDataProvider,
    F: FnMut(usize, &str, &InstrumentOutcome),
{
    let (holdings, holdings_source) = load_holdings(provider, config, etf_code, years).await?;
    let constituents = holdings::constituent_codes(&holdings);
    info!(etf = etf_code, constituents = constituents.len(), "Valuing constituents");

    let total = constituents.len();
    let runner = BatchRunner::new(cache, provider, config.batch.clone());
    let batch = runner
        .run_with(&constituents, |code, outcome| on_constituent(total, code, outcome))
        .await?;

    let input = CompositeInput {
        etf_code,
        holdings: &holdings,
        series: &batch.series,
    };
    let aggregation = FallbackPolicy::standard().aggregate(&input)?;
    let summary = match &aggregation.composite {
        Composite::Series { points } => ValuationSummary::from_composite(etf_code, points),
        Composite::Snapshot(_) => None,
    };

    Ok(EtfValuation {
        etf_code: etf_code.to_string(),
        holdings,
        holdings_source,
        batch,
        aggregation,
        summary,
    })
}

/// Amplitude and turnover profile of an ETF, reading prices through the cache.
pub async fn profile_etf<P: MarketDataProvider>(
    cache: &SqliteCache,
    provider: &P,
    window: &RetentionWindow,
    etf_code: &str,
) -> Result<EtfPriceProfile> {
    let etf_code = code::validate(etf_code)?;

    let mut bars = cache.get_prices(etf_code, window)?;
    if bars.is_empty() {
        bars = window.retain(&provider.fetch_prices(etf_code).await?, |b| b.date);
        cache.put_prices(&bars, window)?;
    }

    EtfPriceProfile::from_bars(etf_code, &bars).ok_or_else(|| {
        DataError::MissingData {
            code: etf_code.to_string(),
            reason: "no usable daily bars".to_string(),
        }
        .into()
    })
}
