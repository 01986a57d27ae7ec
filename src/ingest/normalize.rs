// src/ingest/normalize.rs
//! Raw feed entry → canonical [`Article`].

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::ingest::freshness::classify;
use crate::ingest::types::{AgedArticle, Article, RawEntry, Source};

/// Snippets are cut to this many characters.
pub const SNIPPET_MAX_CHARS: usize = 300;

/// Hex characters of the SHA-256 link digest kept as the article id.
const ID_HEX_LEN: usize = 16;

/// Plain text from an HTML fragment: decode entities, drop tags, collapse whitespace.
pub fn html_to_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<[^>]*>").expect("valid tag regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));

    // Tags first: escaped markup (`&lt;b&gt;`) decodes into literal text, not tags.
    let no_tags = re_tags.replace_all(s, " ");
    let decoded = html_escape::decode_html_entities(&no_tags);
    let out = decoded.replace('\u{00A0}', " ");
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// First `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Stable content-addressed id: first 16 hex chars of SHA-256(link).
pub fn article_id(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    let mut hex = String::with_capacity(ID_HEX_LEN);
    for b in digest.iter().take(ID_HEX_LEN / 2) {
        hex.push_str(&format!("{b:02x}"));
    }
    hex
}

/// RFC 2822 (RSS) or RFC 3339 (Atom) timestamp.
pub fn parse_published(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Unrounded hours between `published` and `now`; infinite when unparseable.
pub fn raw_age_hours(published: &str, now: DateTime<Utc>) -> f64 {
    parse_published(published)
        .map(|ts| hours_between(ts, now))
        .unwrap_or(f64::INFINITY)
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

fn round_tenth(h: f64) -> f64 {
    if h.is_finite() {
        (h * 10.0).round() / 10.0
    } else {
        h
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

/// Map one raw entry of `source` into an [`Article`].
///
/// Returns `None` when title or link is missing/blank. A missing date falls back
/// to `now`; a present but unparseable date keeps `published_at = now` and gets an
/// infinite age so the age filter drops it. Freshness is judged on the unrounded
/// age; only the stored `age_hours` is rounded. The id hashes the link exactly as
/// the feed delivered it.
pub fn normalize_entry(
    raw: &RawEntry,
    source: &Source,
    feed_stale: bool,
    now: DateTime<Utc>,
) -> Option<AgedArticle> {
    let title = non_empty(raw.title.as_deref())?;
    let raw_link = raw.link.as_deref()?;
    let link = non_empty(Some(raw_link))?;

    let snippet = non_empty(raw.content_snippet.as_deref())
        .or_else(|| non_empty(raw.content.as_deref()))
        .map(|s| truncate_chars(s, SNIPPET_MAX_CHARS))
        .unwrap_or_default();

    let attribution = non_empty(raw.author.as_deref()).unwrap_or(&source.display_name);

    let (published_at, age) = match non_empty(raw.published.as_deref()) {
        Some(p) => match parse_published(p) {
            Some(ts) => (ts, hours_between(ts, now)),
            None => (now, f64::INFINITY),
        },
        None => (now, 0.0),
    };

    Some(AgedArticle {
        article: Article {
            id: article_id(raw_link),
            title: title.to_string(),
            link: link.to_string(),
            snippet,
            source: attribution.to_string(),
            published_at,
            category: source.category,
            credibility_tier: source.credibility_tier,
            age_hours: round_tenth(age),
            freshness: classify(age, feed_stale),
        },
        raw_age_hours: age,
    })
}
