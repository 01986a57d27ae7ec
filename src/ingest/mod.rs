// src/ingest/mod.rs
pub mod dedup;
pub mod freshness;
pub mod normalize;
pub mod providers;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::clock::Clock;
use crate::config::SourceRegistry;
use crate::ingest::dedup::dedup_articles;
use crate::ingest::freshness::{filter_by_age, is_frozen_feed};
use crate::ingest::normalize::normalize_entry;
use crate::ingest::types::{AgedArticle, Article, Category, FeedFetcher, RawEntry, Source};

/// Filter value meaning "every category".
pub const CATEGORY_ALL: &str = "all";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_entries_total", "Raw entries parsed from feed documents.");
        describe_counter!(
            "news_rejected_total",
            "Entries dropped by normalization (missing title/link)."
        );
        describe_counter!("news_expired_total", "Articles dropped by the max-age filter.");
        describe_counter!("news_dedup_total", "Articles dropped as near-duplicates.");
        describe_counter!("news_source_errors_total", "Feed fetch/parse failures.");
        describe_counter!("news_frozen_feeds_total", "Feeds flagged as frozen.");
        describe_histogram!("news_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_histogram!("news_parse_ms", "Feed document parse time in milliseconds.");
        describe_gauge!("news_last_run_ts", "Unix ts when aggregation last ran.");
    });
}

/// Entries of one source plus the frozen-feed verdict for this run.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub source: Source,
    pub entries: Vec<RawEntry>,
    pub frozen: bool,
}

/// Fetch one source without ever failing: errors are logged and yield no entries.
pub async fn fetch_source(
    fetcher: &dyn FeedFetcher,
    source: Source,
    now: DateTime<Utc>,
) -> FetchedFeed {
    let t0 = std::time::Instant::now();
    let entries = match fetcher.fetch(&source).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                error = ?e,
                url = %source.url,
                source = %source.display_name,
                fetcher = fetcher.name(),
                "feed fetch failed"
            );
            counter!("news_source_errors_total").increment(1);
            Vec::new()
        }
    };
    histogram!("news_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    let frozen = is_frozen_feed(&entries, now);
    if frozen {
        tracing::warn!(url = %source.url, entries = entries.len(), "feed looks frozen");
        counter!("news_frozen_feeds_total").increment(1);
    }

    FetchedFeed {
        source,
        entries,
        frozen,
    }
}

/// Normalize every entry of every feed, in feed order. Returns (articles, rejected_count).
pub fn normalize_feeds(feeds: &[FetchedFeed], now: DateTime<Utc>) -> (Vec<AgedArticle>, usize) {
    let mut rejected = 0usize;
    let mut out = Vec::new();
    for feed in feeds {
        for raw in &feed.entries {
            match normalize_entry(raw, &feed.source, feed.frozen, now) {
                Some(a) => out.push(a),
                None => rejected += 1,
            }
        }
    }
    (out, rejected)
}

/// Age filter → dedup → stable sort by age (freshest first).
pub fn finalize(articles: Vec<AgedArticle>) -> (Vec<Article>, usize, usize) {
    let (fresh_enough, expired) = filter_by_age(articles);
    let (mut kept, dupes) = dedup_articles(fresh_enough);
    kept.sort_by(|a, b| a.age_hours.total_cmp(&b.age_hours));
    (kept, expired, dupes)
}

/// Fetch → normalize → age filter → dedup → sort across the configured sources.
#[derive(Clone)]
pub struct Aggregator {
    registry: SourceRegistry,
    fetcher: Arc<dyn FeedFetcher>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn FeedFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            clock,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Sources matching `category`: all for `None`/""/"all", none for an unknown name.
    pub fn select_sources(&self, category: Option<&str>) -> Vec<Source> {
        let wanted = match category.map(str::trim) {
            None | Some("") => None,
            Some(c) if c.eq_ignore_ascii_case(CATEGORY_ALL) => None,
            Some(c) => match Category::parse(c) {
                Some(cat) => Some(cat),
                None => {
                    tracing::debug!(category = c, "unknown category filter");
                    return Vec::new();
                }
            },
        };
        self.registry
            .sources()
            .iter()
            .filter(|s| wanted.map_or(true, |cat| s.category == cat))
            .cloned()
            .collect()
    }

    /// Ordered, deduplicated articles for `category`. Never fails: sources that
    /// error out simply contribute nothing.
    pub async fn aggregate(&self, category: Option<&str>) -> Vec<Article> {
        ensure_metrics_described();

        let now = self.clock.now();
        let sources = self.select_sources(category);
        let selected = sources.len();

        // Fan out; join in spawn order so arrival order follows the registry.
        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let fetcher = Arc::clone(&self.fetcher);
                let fallback = source.clone();
                let handle =
                    tokio::spawn(async move { fetch_source(fetcher.as_ref(), source, now).await });
                (fallback, handle)
            })
            .collect();

        let mut feeds = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            match handle.await {
                Ok(feed) => feeds.push(feed),
                Err(e) => {
                    tracing::warn!(error = ?e, url = %source.url, "feed task aborted");
                    counter!("news_source_errors_total").increment(1);
                }
            }
        }

        let (articles, rejected) = normalize_feeds(&feeds, now);
        let (kept, expired, dupes) = finalize(articles);

        counter!("news_rejected_total").increment(rejected as u64);
        counter!("news_expired_total").increment(expired as u64);
        counter!("news_dedup_total").increment(dupes as u64);
        gauge!("news_last_run_ts").set(now.timestamp() as f64);

        tracing::info!(
            target: "ingest",
            category = category.unwrap_or(CATEGORY_ALL),
            sources = selected,
            kept = kept.len(),
            rejected,
            expired,
            dupes,
            "aggregation finished"
        );

        kept
    }
}
