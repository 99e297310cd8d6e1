//! Sequential PB computation over a list of instruments.

use crate::config::BatchConfig;
use pbval_data::{CacheStats, MarketDataProvider, PbRecord, SqliteCache, code};
use pbval_engine::{PbError, PbSeries, PbService};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// Outcome of one instrument in a batch.
#[derive(Debug)]
pub enum InstrumentOutcome {
    /// PB series computed or loaded
    Succeeded(PbSeries),
    /// The instrument failed; the batch went on
    Failed(PbError),
    /// The code is not a six-digit instrument code
    Invalid(String),
}

impl InstrumentOutcome {
    /// Whether the provider may have been contacted.
    fn used_network(&self) -> bool {
        match self {
            Self::Succeeded(series) => series.source.used_network(),
            Self::Failed(PbError::Cache(_)) | Self::Invalid(_) => false,
            Self::Failed(_) => true,
        }
    }
}

/// A failed instrument and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Instrument code as given
    pub code: String,
    /// Error message
    pub reason: String,
}

/// Summary of a batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Codes whose series is available
    pub succeeded: Vec<String>,
    /// Codes that failed, with the error
    pub failed: Vec<BatchFailure>,
    /// Successes served without contacting the provider
    pub cached: usize,
    /// Cache contents after the run
    pub stats: CacheStats,
    /// PB series of every successful code
    #[serde(skip)]
    pub series: HashMap<String, Vec<PbRecord>>,
}

impl BatchReport {
    /// Number of instruments attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Runs [`PbService`] over many codes, one at a time.
///
/// Failures are logged and counted without stopping the batch. After each
/// instrument that needed a remote provider the runner pauses for the
/// configured delay, except after the last one.
#[derive(Debug)]
pub struct BatchRunner<'a, P> {
    cache: &'a SqliteCache,
    service: PbService<'a, P>,
    remote: bool,
    config: BatchConfig,
}

impl<'a, P: MarketDataProvider> BatchRunner<'a, P> {
    /// Create a runner over `cache` and `provider`.
    pub fn new(cache: &'a SqliteCache, provider: &'a P, config: BatchConfig) -> Self {
        Self {
            cache,
            service: PbService::new(cache, provider, config.window),
            remote: provider.is_remote(),
            config,
        }
    }

    /// Run every code and report.
    pub async fn run(&self, codes: &[String]) -> Result<BatchReport, PbError> {
        self.run_with(codes, |_, _| {}).await
    }

    /// Run every code, calling `on_done` after each one.
    pub async fn run_with<F>(&self, codes: &[String], mut on_done: F) -> Result<BatchReport, PbError>
    where
        F: FnMut(&str, &InstrumentOutcome),
    {
        let mut report = BatchReport::default();

        for (idx, raw) in codes.iter().enumerate() {
            let outcome = match code::validate(raw.trim()) {
                Ok(valid) => match self.service.compute_pb_series(valid).await {
                    Ok(series) => InstrumentOutcome::Succeeded(series),
                    Err(e) => InstrumentOutcome::Failed(e),
                },
                Err(_) => InstrumentOutcome::Invalid(raw.clone()),
            };

            on_done(raw.as_str(), &outcome);
            let pause = self.remote && outcome.used_network() && idx + 1 < codes.len();

            match outcome {
                InstrumentOutcome::Succeeded(series) => {
                    if !series.source.used_network() {
                        report.cached += 1;
                    }
                    info!(
                        code = %series.code,
                        records = series.records.len(),
                        source = ?series.source,
                        "Instrument done"
                    );
                    report.succeeded.push(series.code.clone());
                    report.series.insert(series.code, series.records);
                }
                InstrumentOutcome::Failed(e) => {
                    warn!(code = %raw, error = %e, "Instrument failed");
                    report.failed.push(BatchFailure {
                        code: raw.clone(),
                        reason: e.to_string(),
                    });
                }
                InstrumentOutcome::Invalid(given) => {
                    warn!(code = %given, "Invalid instrument code");
                    report.failed.push(BatchFailure {
                        code: given,
                        reason: "not a six-digit instrument code".to_string(),
                    });
                }
            }

            if pause && !self.config.fetch_delay.is_zero() {
                tokio::time::sleep(self.config.fetch_delay).await;
            }
        }

        report.stats = self.cache.get_stats()?;
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cached = report.cached,
            "Batch finished"
        );
        Ok(report)
    }
}
