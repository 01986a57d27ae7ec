//! RSU news monitor — binary entrypoint.
//! Loads config, wires the aggregator and quote cache, and serves the HTTP API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rsu_news_monitor::api::{self, AppState};
use rsu_news_monitor::clock::{Clock, SystemClock};
use rsu_news_monitor::config;
use rsu_news_monitor::ingest::providers::HttpFeedFetcher;
use rsu_news_monitor::ingest::types::FeedFetcher;
use rsu_news_monitor::ingest::Aggregator;
use rsu_news_monitor::metrics::Metrics;
use rsu_news_monitor::quote::{QuoteCache, QuoteProvider, YahooQuoteProvider};

/// Compact logs by default; `NEWS_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rsu_news_monitor=info,ingest=info,warn"));

    let json = std::env::var("NEWS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading news config")?;
    let registry = cfg.registry()?;
    tracing::info!(sources = registry.len(), "source registry loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFeedFetcher::new(&cfg.fetch)?);
    let aggregator = Aggregator::new(registry, fetcher, Arc::clone(&clock));

    let provider: Arc<dyn QuoteProvider> =
        Arc::new(YahooQuoteProvider::new(&cfg.fetch.user_agent)?);
    let quotes = Arc::new(QuoteCache::from_settings(
        provider,
        Arc::clone(&clock),
        &cfg.quote,
    ));

    let metrics = Metrics::init(cfg.quote.ttl_secs)?;

    let state = AppState {
        aggregator,
        quotes,
        clock,
    };
    let app = api::create_router(state).merge(metrics.router());

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
