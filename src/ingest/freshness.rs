// src/ingest/freshness.rs
//! Recency tiers, the frozen-feed heuristic and the maximum-age cut.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::ingest::normalize::raw_age_hours;
use crate::ingest::types::{AgedArticle, Article, Freshness, RawEntry};

/// Upper bound (inclusive) for `fresh`.
pub const FRESH_MAX_HOURS: f64 = 6.0;
/// Upper bound (inclusive) for `aging`.
pub const AGING_MAX_HOURS: f64 = 24.0;
/// Articles older than this never leave the pipeline.
pub const MAX_AGE_HOURS: f64 = 48.0;

/// Minimum number of entries (exclusive) sharing one timestamp before a feed counts as frozen.
const FROZEN_MIN_ENTRIES: usize = 3;
/// The shared timestamp must be older than this.
const FROZEN_MIN_AGE_HOURS: f64 = 24.0;

/// Tier for an article of the given age. A frozen feed is `stale` regardless of age.
pub fn classify(age_hours: f64, feed_stale: bool) -> Freshness {
    if feed_stale {
        return Freshness::Stale;
    }
    if age_hours <= FRESH_MAX_HOURS {
        Freshness::Fresh
    } else if age_hours <= AGING_MAX_HOURS {
        Freshness::Aging
    } else {
        Freshness::Stale
    }
}

/// A feed has stopped updating: every dated entry carries the same timestamp,
/// more than three entries share it, and it is already older than 24h.
///
/// Undated entries are ignored; entries that will later be rejected for a
/// missing title/link still count.
pub fn is_frozen_feed(entries: &[RawEntry], now: DateTime<Utc>) -> bool {
    let stamps: Vec<&str> = entries
        .iter()
        .filter_map(|e| e.published.as_deref())
        .filter(|p| !p.is_empty())
        .collect();

    let distinct: HashSet<&str> = stamps.iter().copied().collect();
    if distinct.len() != 1 || stamps.len() <= FROZEN_MIN_ENTRIES {
        return false;
    }
    raw_age_hours(stamps[0], now) > FROZEN_MIN_AGE_HOURS
}

/// Drop articles whose unrounded age exceeds [`MAX_AGE_HOURS`]. Returns (kept, expired_count).
pub fn filter_by_age(articles: Vec<AgedArticle>) -> (Vec<Article>, usize) {
    let before = articles.len();
    let kept: Vec<Article> = articles
        .into_iter()
        .filter(|a| a.raw_age_hours <= MAX_AGE_HOURS)
        .map(|a| a.article)
        .collect();
    let expired = before - kept.len();
    (kept, expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
    }

    fn dated(ts: &str) -> RawEntry {
        RawEntry {
            published: Some(ts.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn boundaries_are_inclusive_on_the_lower_tier() {
        assert_eq!(classify(0.0, false), Freshness::Fresh);
        assert_eq!(classify(6.0, false), Freshness::Fresh);
        assert_eq!(classify(6.1, false), Freshness::Aging);
        assert_eq!(classify(24.0, false), Freshness::Aging);
        assert_eq!(classify(24.1, false), Freshness::Stale);
        assert_eq!(classify(f64::INFINITY, false), Freshness::Stale);
    }

    #[test]
    fn age_cut_reads_the_unrounded_age() {
        let aged = |raw: f64| AgedArticle {
            article: Article {
                id: "id".into(),
                title: format!("Story aged {raw}"),
                link: "https://example.test/a".into(),
                snippet: String::new(),
                source: "Test".into(),
                published_at: now(),
                category: crate::ingest::types::Category::Market,
                credibility_tier: 2,
                age_hours: (raw * 10.0).round() / 10.0,
                freshness: classify(raw, false),
            },
            raw_age_hours: raw,
        };
        // 48h02m displays as 48.0 but is past the cut.
        let (kept, expired) = filter_by_age(vec![aged(48.0), aged(48.0 + 2.0 / 60.0)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(expired, 1);
        assert_eq!(kept[0].age_hours, 48.0);
    }

    #[test]
    fn frozen_flag_overrides_age() {
        assert_eq!(classify(0.5, true), Freshness::Stale);
    }

    #[test]
    fn four_identical_old_stamps_are_frozen() {
        let ts = (now() - Duration::hours(30)).to_rfc2822();
        let entries: Vec<RawEntry> = (0..4).map(|_| dated(&ts)).collect();
        assert!(is_frozen_feed(&entries, now()));
    }

    #[test]
    fn three_identical_stamps_are_not_enough() {
        let ts = (now() - Duration::hours(30)).to_rfc2822();
        let entries: Vec<RawEntry> = (0..3).map(|_| dated(&ts)).collect();
        assert!(!is_frozen_feed(&entries, now()));
    }

    #[test]
    fn identical_recent_stamps_are_not_frozen() {
        let ts = (now() - Duration::hours(2)).to_rfc2822();
        let entries: Vec<RawEntry> = (0..6).map(|_| dated(&ts)).collect();
        assert!(!is_frozen_feed(&entries, now()));
    }

    #[test]
    fn two_distinct_stamps_are_not_frozen() {
        let a = (now() - Duration::hours(30)).to_rfc2822();
        let b = (now() - Duration::hours(31)).to_rfc2822();
        let mut entries: Vec<RawEntry> = (0..4).map(|_| dated(&a)).collect();
        entries.push(dated(&b));
        assert!(!is_frozen_feed(&entries, now()));
    }

    #[test]
    fn undated_entries_do_not_break_the_pattern() {
        let ts = (now() - Duration::hours(30)).to_rfc2822();
        let mut entries: Vec<RawEntry> = (0..4).map(|_| dated(&ts)).collect();
        entries.push(RawEntry::default());
        assert!(is_frozen_feed(&entries, now()));
        assert!(!is_frozen_feed(&[], now()));
    }
}
