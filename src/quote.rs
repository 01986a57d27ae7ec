//! # Quote cache
//! Current stock quote behind a short TTL.
//!
//! - `QuoteCache` owns the cached value; no module-level state.
//! - "Now" comes from an injected [`Clock`] so expiry is testable.
//! - Refresh happens under the slot lock, so concurrent callers trigger one fetch.
//! - A failed refresh serves the last cached quote (even if expired), else a placeholder.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::QuoteSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_state: String,
    pub timestamp: DateTime<Utc>,
}

impl StockQuote {
    /// Zeroed quote returned when nothing was ever fetched successfully.
    pub fn unavailable(symbol: &str, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            volume: 0,
            market_state: "UNKNOWN".to_string(),
            timestamp: now,
        }
    }
}

/// Remote quote lookup.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str, now: DateTime<Utc>) -> Result<StockQuote>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct Cached {
    quote: StockQuote,
    fetched_at: DateTime<Utc>,
}

pub struct QuoteCache {
    provider: Arc<dyn QuoteProvider>,
    clock: Arc<dyn Clock>,
    symbol: String,
    ttl: chrono::Duration,
    slot: Mutex<Option<Cached>>,
}

impl QuoteCache {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        clock: Arc<dyn Clock>,
        symbol: &str,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(60));
        Self {
            provider,
            clock,
            symbol: symbol.to_string(),
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn from_settings(
        provider: Arc<dyn QuoteProvider>,
        clock: Arc<dyn Clock>,
        settings: &QuoteSettings,
    ) -> Self {
        Self::new(
            provider,
            clock,
            &settings.symbol,
            Duration::from_secs(settings.ttl_secs),
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Cached quote while younger than the TTL, otherwise a fresh one. Never fails.
    pub async fn get(&self) -> StockQuote {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(c) = slot.as_ref() {
            if now - c.fetched_at < self.ttl {
                return c.quote.clone();
            }
        }

        match self.provider.fetch_quote(&self.symbol, now).await {
            Ok(quote) => {
                *slot = Some(Cached {
                    quote: quote.clone(),
                    fetched_at: now,
                });
                quote
            }
            Err(e) => {
                tracing::warn!(
                    error = ?e,
                    symbol = %self.symbol,
                    provider = self.provider.name(),
                    "quote refresh failed"
                );
                match slot.as_ref() {
                    Some(c) => c.quote.clone(),
                    None => StockQuote::unavailable(&self.symbol, now),
                }
            }
        }
    }
}

// ------------------------------------------------------------
// Yahoo chart provider
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResp {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_volume: Option<u64>,
    current_trading_period: Option<TradingPeriods>,
}

#[derive(Debug, Deserialize)]
struct TradingPeriods {
    regular: Option<TradingPeriod>,
}

#[derive(Debug, Deserialize)]
struct TradingPeriod {
    start: i64,
    end: i64,
}

fn quote_from_meta(symbol: &str, meta: ChartMeta, now: DateTime<Utc>) -> Result<StockQuote> {
    let price = meta
        .regular_market_price
        .ok_or_else(|| anyhow!("chart meta without regularMarketPrice"))?;
    let prev = meta.chart_previous_close.or(meta.previous_close).unwrap_or(price);
    let change = price - prev;
    let change_percent = if prev > 0.0 { change / prev * 100.0 } else { 0.0 };

    let ts = now.timestamp();
    let market_state = match meta.current_trading_period.and_then(|p| p.regular) {
        Some(p) if (p.start..p.end).contains(&ts) => "REGULAR",
        _ => "CLOSED",
    };

    Ok(StockQuote {
        symbol: symbol.to_string(),
        price,
        change,
        change_percent,
        volume: meta.regular_market_volume.unwrap_or(0),
        market_state: market_state.to_string(),
        timestamp: now,
    })
}

/// Reads Yahoo Finance's public v8 chart endpoint.
pub struct YahooQuoteProvider {
    http: reqwest::Client,
    base_url: String,
}

impl YahooQuoteProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://query1.finance.yahoo.com";

    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_base_url(user_agent, Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(user_agent: &str, base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building quote http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    async fn fetch_quote(&self, symbol: &str, now: DateTime<Utc>) -> Result<StockQuote> {
        let url = format!("{}/v8/finance/chart/{symbol}", self.base_url);
        let resp: ChartResp = self
            .http
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("status from {url}"))?
            .json()
            .await
            .context("decoding chart json")?;

        let meta = resp
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("empty chart result for {symbol}"))?
            .meta;
        quote_from_meta(symbol, meta, now)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}
