// src/config/mod.rs
pub mod sources;

pub use sources::SourceRegistry;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Source;

pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; RSUMonitor/1.0)".to_string()
}
fn default_symbol() -> String {
    "CPNG".to_string()
}
fn default_ttl_secs() -> u64 {
    60
}
fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

/// HTTP settings for feed retrieval.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Ticker and cache lifetime for the quote lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSettings {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Whole application config. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub quote: QuoteSettings,
    #[serde(default)]
    pub server: ServerSettings,
    /// Empty means "use the built-in registry".
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl NewsConfig {
    /// Validated registry; falls back to [`SourceRegistry::builtin`] when no sources are configured.
    pub fn registry(&self) -> Result<SourceRegistry> {
        if self.sources.is_empty() {
            return Ok(SourceRegistry::builtin());
        }
        SourceRegistry::new(self.sources.clone())
    }

    /// Bind address, `$BIND_ADDR` taking precedence over the file.
    pub fn bind_addr(&self) -> String {
        std::env::var(ENV_BIND_ADDR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.server.bind.clone())
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<NewsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading news config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing news config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $NEWS_CONFIG_PATH
/// 2) config/news.toml
/// 3) config/news.json
/// 4) built-in defaults
pub fn load_default() -> Result<NewsConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/news.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/news.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    Ok(NewsConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<NewsConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid json config");
    }
    match toml::from_str::<NewsConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|json_err| anyhow!("neither toml ({toml_err}) nor json ({json_err})")),
    }
}
