// src/ingest/dedup.rs
//! Near-duplicate collapsing by normalized-title prefix.
//!
//! Outlets republish the same wire story with different trailing clauses
//! ("... - Reuters"), so the key is the first six normalized words of the title.
//! Two unrelated stories that share those six words collide and the later one is
//! dropped; no link or similarity check is applied.

use std::collections::HashSet;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::Article;

/// Number of leading words that make up the key.
pub const KEY_WORDS: usize = 6;

/// Lowercase, keep only `[a-z0-9\s]`, collapse whitespace, trim.
pub fn normalize_title(title: &str) -> String {
    static RE_DROP: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_drop = RE_DROP.get_or_init(|| Regex::new(r"[^a-z0-9\s]").expect("valid charset regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));

    let lower = title.to_lowercase();
    let kept = re_drop.replace_all(&lower, "");
    re_ws.replace_all(&kept, " ").trim().to_string()
}

/// First [`KEY_WORDS`] words of the normalized title, single-space joined.
pub fn dedup_key(title: &str) -> String {
    normalize_title(title)
        .split(' ')
        .take(KEY_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep the first article for every key, preserving arrival order.
/// Returns (kept, dropped_count).
pub fn dedup_articles(articles: Vec<Article>) -> (Vec<Article>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(articles.len());
    let mut keep = Vec::with_capacity(articles.len());
    let mut dropped = 0usize;

    for a in articles {
        if !seen.insert(dedup_key(&a.title)) {
            tracing::debug!(title = %a.title, link = %a.link, "duplicate story dropped");
            dropped += 1;
            continue;
        }
        keep.push(a);
    }

    (keep, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(
            normalize_title("  Coupang's  Q4:  Beats — Estimates!  "),
            "coupangs q4 beats estimates"
        );
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(normalize_title("쿠팡 Coupang Café"), "coupang caf");
    }

    #[test]
    fn key_takes_first_six_words() {
        assert_eq!(
            dedup_key("Coupang Reports Strong Q4 Earnings Results Today - Reuters"),
            "coupang reports strong q4 earnings results"
        );
        assert_eq!(dedup_key("Short title"), "short title");
    }

    #[test]
    fn trailing_attribution_collides() {
        assert_eq!(
            dedup_key("Coupang Reports Strong Q4 Earnings Results Today"),
            dedup_key("Coupang Reports Strong Q4 Earnings Results Today - Reuters")
        );
    }
}
