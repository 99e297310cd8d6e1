//! HTTP adapter for public A-share data endpoints.
//!
//! - daily bars: Eastmoney kline API
//! - net assets: 10jqka balance-sheet feed
//! - share capital history: Eastmoney datacenter equity report
//! - fund holdings: Eastmoney fund F10 archive

pub mod balance;
pub mod equity;
pub mod kline;
pub mod portfolio;

use crate::code;
use crate::error::{DataError, Result};
use crate::model::{HoldingEntry, NetAssetReport, PriceBar, ShareCountChange};
use crate::provider::MarketDataProvider;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Default minimum interval between two HTTP requests.
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(500);

/// User agent sent with every request; several endpoints reject bare clients.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) pbval/0.1";

/// Base URLs of the endpoints used by [`WebProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Eastmoney kline endpoint
    pub kline: String,
    /// 10jqka finance base, `{base}/{code}_debt.json` is appended
    pub balance: String,
    /// Eastmoney datacenter endpoint
    pub datacenter: String,
    /// Eastmoney fund archive endpoint
    pub fund_archive: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            kline: "https://push2his.eastmoney.com/api/qt/stock/kline/get".to_string(),
            balance: "https://basic.10jqka.com.cn/api/stock/finance".to_string(),
            datacenter: "https://datacenter-web.eastmoney.com/api/data/v1/get".to_string(),
            fund_archive: "https://fundf10.eastmoney.com/FundArchivesDatas.aspx".to_string(),
        }
    }
}

struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// Market data provider backed by public web endpoints.
pub struct WebProvider {
    client: reqwest::Client,
    rate_limiter: Mutex<RateLimiter>,
    endpoints: Endpoints,
}

impl std::fmt::Debug for WebProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebProvider")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl WebProvider {
    /// Create a provider with the default request interval.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(DEFAULT_RATE_LIMIT)
    }

    /// Create a provider that waits at least `min_interval` between requests.
    pub fn with_rate_limit(min_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            rate_limiter: Mutex::new(RateLimiter::new(min_interval)),
            endpoints: Endpoints::default(),
        })
    }

    /// Replace the endpoint base URLs.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        self.rate_limiter.lock().await.wait().await;
        debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(DataError::Network)?;

        if !response.status().is_success() {
            return Err(DataError::Http(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

impl MarketDataProvider for WebProvider {
    async fn fetch_prices(&self, code: &str) -> Result<Vec<PriceBar>> {
        let code = code::validate(code)?;
        let query = [
            ("secid", code::eastmoney_secid(code)),
            ("fields1", "f1,f2,f3,f4,f5,f6".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57".to_string()),
            ("klt", "101".to_string()),
            ("fqt", "0".to_string()),
            ("beg", "0".to_string()),
            ("end", "20500101".to_string()),
        ];
        let body = self.get_text(&self.endpoints.kline, &query).await?;
        kline::parse_klines(code, &body)
    }

    async fn fetch_net_assets(&self, code: &str) -> Result<Vec<NetAssetReport>> {
        let code = code::validate(code)?;
        let url = format!("{}/{}_debt.json", self.endpoints.balance, code);
        let body = self.get_text(&url, &[]).await?;
        balance::parse_balance_sheet(code, &body)
    }

    async fn fetch_share_history(&self, code: &str) -> Result<Vec<ShareCountChange>> {
        let code = code::validate(code)?;
        let query = [
            ("reportName", "RPT_F10_EH_EQUITY".to_string()),
            (
                "columns",
                "SECUCODE,SECURITY_CODE,END_DATE,TOTAL_SHARES,LIMITED_SHARES,\
                 LISTED_A_SHARES,CHANGE_REASON"
                    .to_string(),
            ),
            ("filter", format!("(SECUCODE=\"{}\")", code::with_suffix(code))),
            ("pageNumber", "1".to_string()),
            ("pageSize", "1000".to_string()),
            ("sortTypes", "-1".to_string()),
            ("sortColumns", "END_DATE".to_string()),
            ("source", "HSF10".to_string()),
            ("client", "PC".to_string()),
        ];
        let body = self.get_text(&self.endpoints.datacenter, &query).await?;
        equity::parse_equity_history(code, &body)
    }

    async fn fetch_holdings(&self, etf_code: &str, year: i32) -> Result<Vec<HoldingEntry>> {
        let etf_code = code::validate(etf_code)?;
        let query = [
            ("type", "jjcc".to_string()),
            ("code", etf_code.to_string()),
            ("topline", "10000".to_string()),
            ("year", year.to_string()),
            ("month", String::new()),
        ];
        let body = self.get_text(&self.endpoints.fund_archive, &query).await?;
        portfolio::parse_fund_holdings(etf_code, &body)
    }
}
