//! SQLite caching layer for market data and computed valuations.

use crate::error::Result;
use crate::model::{NetAssetReport, PbRecord, PriceBar, ShareCountChange};
use crate::retention::RetentionWindow;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OpenFlags, Row, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const DATE_FMT: &str = "%Y-%m-%d";

static MEMORY_SEQ: AtomicU64 = AtomicU64::new(0);

/// SQLite cache for market data.
///
/// Every operation opens its own connection and closes it when done. Writes
/// run inside a single transaction, so a failed write leaves the cache as it
/// was.
#[derive(Debug)]
pub struct SqliteCache {
    location: Location,
}

#[derive(Debug)]
enum Location {
    File(PathBuf),
    Memory {
        uri: String,
        // Shared in-memory databases vanish with their last connection.
        _keepalive: Mutex<Connection>,
    },
}

impl SqliteCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let cache = Self {
            location: Location::File(path.as_ref().to_path_buf()),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    ///
    /// Each call gets its own private database.
    pub fn in_memory() -> Result<Self> {
        let uri = format!(
            "file:pbval-mem-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            MEMORY_SEQ.fetch_add(1, Ordering::SeqCst)
        );
        let keepalive = open_uri(&uri)?;
        let cache = Self {
            location: Location::Memory {
                uri,
                _keepalive: Mutex::new(keepalive),
            },
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = match &self.location {
            Location::File(path) => Connection::open(path)?,
            Location::Memory { uri, .. } => open_uri(uri)?,
        };
        Ok(conn)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stock_price (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                amount REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (code, date)
            );

            CREATE TABLE IF NOT EXISTS net_assets (
                code TEXT NOT NULL,
                report_date TEXT NOT NULL,
                equity TEXT NOT NULL,
                net_assets REAL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (code, report_date)
            );

            CREATE TABLE IF NOT EXISTS total_shares_history (
                code TEXT NOT NULL,
                change_date TEXT NOT NULL,
                total_shares REAL NOT NULL,
                restricted_shares REAL,
                circulating_shares REAL,
                change_reason TEXT,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (code, change_date)
            );

            CREATE TABLE IF NOT EXISTS daily_pb (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                close_price REAL NOT NULL,
                total_shares REAL NOT NULL,
                market_cap REAL,
                net_assets REAL,
                report_date TEXT,
                pb REAL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (code, date)
            );

            CREATE INDEX IF NOT EXISTS idx_stock_price_code_date ON stock_price(code, date);
            CREATE INDEX IF NOT EXISTS idx_daily_pb_code_date ON daily_pb(code, date);",
        )?;
        Ok(())
    }

    /// Human-readable location of the database.
    pub fn location(&self) -> String {
        match &self.location {
            Location::File(path) => path.display().to_string(),
            Location::Memory { .. } => ":memory:".to_string(),
        }
    }

    /// Store price bars, keeping any bar already cached for the same day.
    ///
    /// Bars dated before the retention cutoff are dropped. Returns the number
    /// of rows inserted.
    pub fn put_prices(&self, bars: &[PriceBar], window: &RetentionWindow) -> Result<usize> {
        let cached_at = Utc::now().to_rfc3339();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        for bar in bars.iter().filter(|b| window.contains(b.date)) {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO stock_price
                 (code, date, open, high, low, close, volume, amount, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    bar.code,
                    bar.date.format(DATE_FMT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.amount,
                    cached_at
                ],
            )?;
        }

        tx.commit()?;
        debug!(inserted, offered = bars.len(), "cached price bars");
        Ok(inserted)
    }

    /// Cached price bars inside the retention window, ascending by date.
    pub fn get_prices(&self, code: &str, window: &RetentionWindow) -> Result<Vec<PriceBar>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT code, date, open, high, low, close, volume, amount
             FROM stock_price
             WHERE code = ?1 AND date >= ?2
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![code, cutoff_text(window)], price_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Store net-asset reports, keeping any report already cached for the same period.
    pub fn put_net_assets(
        &self,
        reports: &[NetAssetReport],
        window: &RetentionWindow,
    ) -> Result<usize> {
        let cached_at = Utc::now().to_rfc3339();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        for report in reports.iter().filter(|r| window.contains(r.period_end)) {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO net_assets
                 (code, report_date, equity, net_assets, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    report.code,
                    report.period_end.format(DATE_FMT).to_string(),
                    report.raw_equity_text,
                    report.net_assets,
                    cached_at
                ],
            )?;
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Cached net-asset reports inside the retention window, newest first.
    pub fn get_net_assets(
        &self,
        code: &str,
        window: &RetentionWindow,
    ) -> Result<Vec<NetAssetReport>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT code, report_date, equity, net_assets
             FROM net_assets
             WHERE code = ?1 AND report_date >= ?2
             ORDER BY report_date DESC",
        )?;

        let rows = stmt.query_map(params![code, cutoff_text(window)], |row| {
            Ok(NetAssetReport {
                code: row.get(0)?,
                period_end: date_column(row, 1)?,
                raw_equity_text: row.get(2)?,
                net_assets: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Store share capital history, replacing rows for dates already cached.
    ///
    /// The history is not subject to the retention window: a share count set
    /// years ago may still be the one in effect today.
    pub fn put_share_history(&self, history: &[ShareCountChange]) -> Result<usize> {
        let cached_at = Utc::now().to_rfc3339();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let mut written = 0;
        for change in history {
            written += tx.execute(
                "INSERT OR REPLACE INTO total_shares_history
                 (code, change_date, total_shares, restricted_shares,
                  circulating_shares, change_reason, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    change.code,
                    change.effective_date.format(DATE_FMT).to_string(),
                    change.total_shares,
                    change.restricted_shares,
                    change.circulating_shares,
                    change.reason,
                    cached_at
                ],
            )?;
        }

        tx.commit()?;
        Ok(written)
    }

    /// Cached share capital history, newest first.
    pub fn get_share_history(&self, code: &str) -> Result<Vec<ShareCountChange>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT code, change_date, total_shares, restricted_shares,
                    circulating_shares, change_reason
             FROM total_shares_history
             WHERE code = ?1
             ORDER BY change_date DESC",
        )?;

        let rows = stmt.query_map(params![code], |row| {
            Ok(ShareCountChange {
                code: row.get(0)?,
                effective_date: date_column(row, 1)?,
                total_shares: row.get(2)?,
                restricted_shares: row.get(3)?,
                circulating_shares: row.get(4)?,
                reason: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Store a computed PB series in one transaction, keeping rows already cached.
    pub fn put_pb_series(&self, records: &[PbRecord], window: &RetentionWindow) -> Result<usize> {
        let cached_at = Utc::now().to_rfc3339();
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        for record in records.iter().filter(|r| window.contains(r.date)) {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO daily_pb
                 (code, date, close_price, total_shares, market_cap,
                  net_assets, report_date, pb, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.code,
                    record.date.format(DATE_FMT).to_string(),
                    record.close_price,
                    record.total_shares,
                    record.market_cap,
                    record.net_assets,
                    record.report_period.map(|d| d.format(DATE_FMT).to_string()),
                    record.pb,
                    cached_at
                ],
            )?;
        }

        tx.commit()?;
        debug!(inserted, "cached pb series");
        Ok(inserted)
    }

    /// Cached PB series inside the retention window, ascending by date.
    pub fn get_pb_series(&self, code: &str, window: &RetentionWindow) -> Result<Vec<PbRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT code, date, close_price, total_shares, market_cap,
                    net_assets, report_date, pb
             FROM daily_pb
             WHERE code = ?1 AND date >= ?2
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![code, cutoff_text(window)], |row| {
            let report_period = row
                .get::<_, Option<String>>(6)?
                .map(|text| parse_date(&text))
                .transpose()?;
            Ok(PbRecord {
                code: row.get(0)?,
                date: date_column(row, 1)?,
                close_price: row.get(2)?,
                total_shares: row.get(3)?,
                market_cap: row.get(4)?,
                net_assets: row.get(5)?,
                report_period,
                pb: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let conn = self.connect()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(CacheStats {
            price_instruments: count("SELECT COUNT(DISTINCT code) FROM stock_price")?,
            price_rows: count("SELECT COUNT(*) FROM stock_price")?,
            net_asset_instruments: count("SELECT COUNT(DISTINCT code) FROM net_assets")?,
            share_history_instruments: count(
                "SELECT COUNT(DISTINCT code) FROM total_shares_history",
            )?,
            pb_instruments: count("SELECT COUNT(DISTINCT code) FROM daily_pb")?,
            pb_rows: count("SELECT COUNT(*) FROM daily_pb")?,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Distinct instruments with cached prices
    pub price_instruments: usize,
    /// Total cached price bars
    pub price_rows: usize,
    /// Distinct instruments with cached net-asset reports
    pub net_asset_instruments: usize,
    /// Distinct instruments with cached share history
    pub share_history_instruments: usize,
    /// Distinct instruments with a cached PB series
    pub pb_instruments: usize,
    /// Total cached PB records
    pub pb_rows: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  Prices:        {} instruments ({} bars)",
            self.price_instruments, self.price_rows
        )?;
        writeln!(f, "  Net assets:    {} instruments", self.net_asset_instruments)?;
        writeln!(
            f,
            "  Share history: {} instruments",
            self.share_history_instruments
        )?;
        write!(
            f,
            "  PB series:     {} instruments ({} records)",
            self.pb_instruments, self.pb_rows
        )
    }
}

fn open_uri(uri: &str) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

fn cutoff_text(window: &RetentionWindow) -> String {
    window.cutoff().format(DATE_FMT).to_string()
}

fn parse_date(text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FMT)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    parse_date(&row.get::<_, String>(idx)?)
}

fn price_from_row(row: &Row<'_>) -> rusqlite::Result<PriceBar> {
    Ok(PriceBar {
        code: row.get(0)?,
        date: date_column(row, 1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
        amount: row.get(7)?,
    })
}
