// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod quote;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::ingest::types::{Article, Category, Freshness, Source};
pub use crate::ingest::Aggregator;
