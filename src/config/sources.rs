// src/config/sources.rs
//! # Source Registry
//!
//! Static list of feed endpoints, each tagged with a category and a
//! credibility tier. Built once at startup and shared read-only.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::ingest::types::{Category, Source};

/// Immutable, cheaply clonable list of sources.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Arc<[Source]>,
}

impl SourceRegistry {
    /// Validate and wrap `sources`. Rejects empty URLs and tiers outside 1..=3.
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        for (i, s) in sources.iter().enumerate() {
            if s.url.trim().is_empty() {
                bail!("source #{i} ({}) has an empty url", s.display_name);
            }
            if !(1..=3).contains(&s.credibility_tier) {
                bail!(
                    "source #{i} ({}) has credibility_tier {} outside 1..=3",
                    s.url,
                    s.credibility_tier
                );
            }
        }
        Ok(Self {
            sources: sources.into(),
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Built-in feeds: Coupang news, Korean market and Korean tech coverage.
    pub fn builtin() -> Self {
        let sources = vec![
            Source::new(
                "https://news.google.com/rss/search?q=Coupang+OR+CPNG&hl=en-US&gl=US&ceid=US:en",
                Category::Coupang,
                2,
                "Google News",
            ),
            Source::new(
                "https://news.google.com/rss/search?q=Coupang+data+breach+OR+Coupang+PIPC&hl=en-US&gl=US&ceid=US:en",
                Category::Coupang,
                2,
                "Google News",
            ),
            Source::new(
                "https://news.google.com/rss/search?q=KOSPI+OR+%22Korean+stock+market%22&hl=en-US&gl=US&ceid=US:en",
                Category::Market,
                2,
                "Google News",
            ),
            Source::new(
                "https://www.koreaherald.com/rss/kh_Business",
                Category::Market,
                1,
                "Korea Herald",
            ),
            Source::new(
                "https://news.google.com/rss/search?q=%22Korean+tech%22+OR+Samsung+OR+%22SK+Hynix%22&hl=en-US&gl=US&ceid=US:en",
                Category::Tech,
                2,
                "Google News",
            ),
        ];
        Self {
            sources: sources.into(),
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
