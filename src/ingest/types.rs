// src/ingest/types.rs
use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of feed categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coupang,
    Market,
    Tech,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Coupang, Category::Market, Category::Tech];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coupang => "coupang",
            Category::Market => "market",
            Category::Tech => "tech",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub category: Category,
    /// 1 = most authoritative.
    pub credibility_tier: u8,
    /// Attribution used when an entry carries no author.
    pub display_name: String,
}

impl Source {
    pub fn new(url: &str, category: Category, credibility_tier: u8, display_name: &str) -> Self {
        Self {
            url: url.to_string(),
            category,
            credibility_tier,
            display_name: display_name.to_string(),
        }
    }
}

/// One item of a fetched feed document, as exposed by the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    /// Plain-text rendition of the summary/description.
    pub content_snippet: Option<String>,
    /// Raw (usually HTML) body.
    pub content: Option<String>,
    pub author: Option<String>,
}

/// Coarse recency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Aging,
    Stale,
}

/// Canonical article produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub category: Category,
    pub credibility_tier: u8,
    pub age_hours: f64,
    pub freshness: Freshness,
}

/// An [`Article`] paired with its unrounded age at fetch time.
///
/// Lives only between normalization and the age filter; the filter reads
/// `raw_age_hours`, callers only ever see the article's rounded `age_hours`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgedArticle {
    pub article: Article,
    pub raw_age_hours: f64,
}

/// Feed retrieval capability: fetch and parse one source's document.
///
/// Implementations surface every failure as `Err`; isolation happens in
/// [`crate::ingest::fetch_source`].
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawEntry>>;
    fn name(&self) -> &'static str;
}
