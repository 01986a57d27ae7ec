use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::clock::Clock;
use crate::ingest::types::Article;
use crate::ingest::{Aggregator, CATEGORY_ALL};
use crate::quote::{QuoteCache, StockQuote};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub quotes: Arc<QuoteCache>,
    pub clock: Arc<dyn Clock>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/news", get(news))
        .route("/api/stock", get(stock))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct NewsQuery {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewsResp {
    articles: Vec<Article>,
    fetched_at: DateTime<Utc>,
}

async fn news(State(state): State<AppState>, Query(q): Query<NewsQuery>) -> Json<NewsResp> {
    let category = q.category.as_deref().unwrap_or(CATEGORY_ALL);
    let articles = state.aggregator.aggregate(Some(category)).await;
    Json(NewsResp {
        articles,
        fetched_at: state.clock.now(),
    })
}

async fn stock(State(state): State<AppState>) -> Json<StockQuote> {
    Json(state.quotes.get().await)
}
