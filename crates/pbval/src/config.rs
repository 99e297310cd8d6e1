//! Runtime settings.

use chrono::NaiveDate;
use pbval_data::RetentionWindow;
use std::path::PathBuf;
use std::time::Duration;

/// Pause between instruments that needed the provider.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(5);

/// Default directory of `hold_<etf>.csv` files.
pub const DEFAULT_HOLDINGS_DIR: &str = "etf-codes";

/// First year requested when fetching holdings disclosures.
pub const DEFAULT_HOLDINGS_START_YEAR: i32 = 2020;

/// Settings for a batch of PB computations.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause after an instrument that contacted the provider
    pub fetch_delay: Duration,
    /// Retention window shared by every instrument in the run
    pub window: RetentionWindow,
}

impl BatchConfig {
    /// Settings with the default delay and a five-year window ending `today`.
    pub fn for_date(today: NaiveDate) -> Self {
        Self {
            fetch_delay: DEFAULT_FETCH_DELAY,
            window: RetentionWindow::five_years_before(today),
        }
    }

    /// Override the fetch delay.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }
}

/// Settings for a whole run.
#[derive(Debug, Clone)]
pub struct PbConfig {
    /// SQLite cache location
    pub db_path: PathBuf,
    /// Directory of holdings files
    pub holdings_dir: PathBuf,
    /// Batch settings
    pub batch: BatchConfig,
}

impl PbConfig {
    /// Settings for a run on `today` with the given cache path.
    pub fn new(db_path: impl Into<PathBuf>, today: NaiveDate) -> Self {
        Self {
            db_path: db_path.into(),
            holdings_dir: PathBuf::from(DEFAULT_HOLDINGS_DIR),
            batch: BatchConfig::for_date(today),
        }
    }

    /// Override the holdings directory.
    pub fn with_holdings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.holdings_dir = dir.into();
        self
    }

    /// Override the fetch delay.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.batch.fetch_delay = delay;
        self
    }
}
