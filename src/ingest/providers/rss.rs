// src/ingest/providers/rss.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::config::FetchSettings;
use crate::ingest::normalize::html_to_text;
use crate::ingest::types::{FeedFetcher, RawEntry, Source};

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

// Namespaced children (`content:encoded`, `dc:creator`, `atom:link`) are matched
// by local name, so `<atom:link href=.../>` lands in `links` next to `<link>`.
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<ItemLink>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    creator: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemLink {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

impl Item {
    /// First `<link>` carrying text; attribute-only links are skipped.
    fn text_link(&mut self) -> Option<String> {
        let idx = self
            .links
            .iter()
            .position(|l| l.value.as_deref().is_some_and(|v| !v.trim().is_empty()))?;
        self.links.swap_remove(idx).value
    }
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    author: Option<AtomAuthor>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

fn text_of(t: Option<AtomText>) -> Option<String> {
    t.and_then(|t| t.value)
}

fn snippet_of(html: Option<&str>) -> Option<String> {
    html.map(html_to_text).filter(|s| !s.is_empty())
}

impl From<Item> for RawEntry {
    fn from(mut it: Item) -> Self {
        let link = it.text_link();
        let snippet_src = it.description.as_deref().or(it.content_encoded.as_deref());
        let content_snippet = snippet_of(snippet_src);
        RawEntry {
            title: it.title,
            link,
            published: it.pub_date,
            content_snippet,
            content: it.content_encoded.or(it.description),
            author: it.creator.filter(|c| !c.trim().is_empty()).or(it.author),
        }
    }
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        let link = e
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.links.first())
            .and_then(|l| l.href.clone());
        let summary = text_of(e.summary);
        let content = text_of(e.content);
        let content_snippet = snippet_of(summary.as_deref().or(content.as_deref()));
        RawEntry {
            title: text_of(e.title),
            link,
            published: e.published.or(e.updated),
            content_snippet,
            content: content.or(summary),
            author: e.author.and_then(|a| a.name),
        }
    }
}

/// Parse an RSS 2.0 or Atom document into raw entries.
pub fn parse_feed_document(s: &str) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(s);

    let entries: Vec<RawEntry> = match root_element(&xml).as_deref() {
        Some("rss") => {
            let rss: Rss = from_str(&xml).context("parsing rss xml")?;
            rss.channel.item.into_iter().map(RawEntry::from).collect()
        }
        Some("feed") => {
            let atom: AtomFeed = from_str(&xml).context("parsing atom xml")?;
            atom.entry.into_iter().map(RawEntry::from).collect()
        }
        Some(other) => return Err(anyhow!("unsupported feed root <{other}>")),
        None => return Err(anyhow!("no xml root element")),
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("news_parse_ms").record(ms);
    counter!("news_entries_total").increment(entries.len() as u64);
    Ok(entries)
}

/// Local name of the document's first element.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Replace HTML-only named entities that XML parsers reject.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

/// Fetches feed documents over HTTP with a bounded timeout and explicit User-Agent.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawEntry>> {
        let body = self
            .client
            .get(&source.url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {}", source.url))?
            .error_for_status()
            .with_context(|| format!("status from {}", source.url))?
            .text()
            .await
            .with_context(|| format!("body of {}", source.url))?;

        parse_feed_document(&body).with_context(|| format!("parsing feed {}", source.url))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_item_maps_creator_and_snippet() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>T</title>
    <item>
      <title>Coupang expands&nbsp;Rocket delivery</title>
      <link>https://example.test/a</link>
      <pubDate>Sat, 06 Sep 2025 10:00:00 GMT</pubDate>
      <description><![CDATA[<p>Coupang <b>expands</b> again</p>]]></description>
      <dc:creator>Jane Doe</dc:creator>
    </item>
  </channel>
</rss>"#;
        let entries = parse_feed_document(xml).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.title.as_deref(), Some("Coupang expands Rocket delivery"));
        assert_eq!(e.link.as_deref(), Some("https://example.test/a"));
        assert_eq!(e.author.as_deref(), Some("Jane Doe"));
        assert_eq!(e.content_snippet.as_deref(), Some("Coupang expands again"));
        assert_eq!(e.content.as_deref(), Some("<p>Coupang <b>expands</b> again</p>"));
    }

    #[test]
    fn namespaced_item_children_are_read() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <atom:link href="https://example.test/rss" rel="self" type="application/rss+xml"/>
    <item>
      <title>Won slips against dollar</title>
      <atom:link href="https://example.test/amp/won" rel="amphtml"/>
      <link>https://example.test/won</link>
      <pubDate>Sat, 06 Sep 2025 10:00:00 +0900</pubDate>
      <content:encoded><![CDATA[<p>The won <em>weakened</em> to 1,390.</p>]]></content:encoded>
      <dc:creator>Kim Ji-yeon</dc:creator>
    </item>
  </channel>
</rss>"#;
        let entries = parse_feed_document(xml).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.link.as_deref(), Some("https://example.test/won"));
        assert_eq!(e.author.as_deref(), Some("Kim Ji-yeon"));
        assert_eq!(
            e.content.as_deref(),
            Some("<p>The won <em>weakened</em> to 1,390.</p>")
        );
        assert_eq!(e.content_snippet.as_deref(), Some("The won weakened to 1,390."));
    }

    #[test]
    fn atom_entry_prefers_alternate_link_and_summary() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Korea tech</title>
  <entry>
    <title type="html">SK Hynix lifts HBM output</title>
    <link rel="self" href="https://example.test/self"/>
    <link rel="alternate" href="https://example.test/hbm"/>
    <updated>2025-09-06T09:30:00Z</updated>
    <summary type="html">&lt;p&gt;Capacity &lt;i&gt;up&lt;/i&gt;&lt;/p&gt;</summary>
    <author><name>Desk</name></author>
  </entry>
</feed>"#;
        let entries = parse_feed_document(xml).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.title.as_deref(), Some("SK Hynix lifts HBM output"));
        assert_eq!(e.link.as_deref(), Some("https://example.test/hbm"));
        assert_eq!(e.published.as_deref(), Some("2025-09-06T09:30:00Z"));
        assert_eq!(e.content_snippet.as_deref(), Some("Capacity up"));
        assert_eq!(e.author.as_deref(), Some("Desk"));
    }

    #[test]
    fn empty_channel_yields_no_entries() {
        let xml = r#"<rss version="2.0"><channel><title>T</title></channel></rss>"#;
        assert!(parse_feed_document(xml).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_feed_document("<html><body>502 Bad Gateway</body></html>").is_err());
        assert!(parse_feed_document("not xml at all").is_err());
    }
}
