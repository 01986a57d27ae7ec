// tests/common/mod.rs
//! Shared helpers: a URL-keyed mock fetcher and a fixed test clock.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use rsu_news_monitor::clock::{Clock, ManualClock};
use rsu_news_monitor::config::SourceRegistry;
use rsu_news_monitor::ingest::types::{Category, FeedFetcher, RawEntry, Source};
use rsu_news_monitor::ingest::Aggregator;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

/// RFC 2822 timestamp `minutes` before [`t0`].
pub fn minutes_ago(minutes: i64) -> String {
    (t0() - Duration::minutes(minutes)).to_rfc2822()
}

pub fn entry(title: &str, link: &str, minutes: i64) -> RawEntry {
    RawEntry {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        published: Some(minutes_ago(minutes)),
        content_snippet: Some("Test snippet content".to_string()),
        content: None,
        author: Some("Test Author".to_string()),
    }
}

#[derive(Clone)]
pub enum Reply {
    Entries(Vec<RawEntry>),
    Fail(String),
}

/// Answers by URL (falling back to a default reply) and records every call.
pub struct MockFetcher {
    by_url: HashMap<String, Reply>,
    default: Reply,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn same_for_all(entries: Vec<RawEntry>) -> Self {
        Self {
            by_url: HashMap::new(),
            default: Reply::Entries(entries),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for_all(msg: &str) -> Self {
        Self {
            by_url: HashMap::new(),
            default: Reply::Fail(msg.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, url: &str, reply: Reply) -> Self {
        self.by_url.insert(url.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawEntry>> {
        self.calls.lock().unwrap().push(source.url.clone());
        match self.by_url.get(&source.url).unwrap_or(&self.default) {
            Reply::Entries(v) => Ok(v.clone()),
            Reply::Fail(msg) => Err(anyhow!("{msg}")),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub fn source(url: &str, category: Category) -> Source {
    Source::new(url, category, 2, "Google News")
}

/// Two sources per category, deterministic URLs.
pub fn registry() -> SourceRegistry {
    SourceRegistry::new(vec![
        source("https://feeds.test/coupang-1", Category::Coupang),
        source("https://feeds.test/coupang-2", Category::Coupang),
        source("https://feeds.test/market-1", Category::Market),
        source("https://feeds.test/market-2", Category::Market),
        source("https://feeds.test/tech-1", Category::Tech),
    ])
    .unwrap()
}

pub fn aggregator(fetcher: Arc<MockFetcher>, registry: SourceRegistry) -> Aggregator {
    let clock: Arc<dyn Clock> = clock();
    Aggregator::new(registry, fetcher, clock)
}
