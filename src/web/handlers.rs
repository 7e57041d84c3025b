//! Request handlers. Each one forwards the raw body to the query service,
//! which checks the token before doing anything else.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::feed::Article;
use crate::query::QueryService;
use crate::storage::RegistryEntry;
use crate::web::error::ApiError;

pub type AppState = QueryService;

pub const FEED_STATUS_HEADER: &str = "x-feed-status";

/// GET|POST /feeds - List the registry.
pub async fn list_feeds(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Vec<RegistryEntry>>, ApiError> {
    Ok(Json(state.list_feeds(&body).await?))
}

/// GET|POST /feed/:name - Stored snapshot of one feed, byte for byte.
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let cached = state.get_feed(&body, &name).await?;

    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        cached.bytes,
    )
        .into_response();

    let headers = response.headers_mut();
    if let Ok(etag) = HeaderValue::from_str(&cached.etag) {
        headers.insert(header::ETAG, etag);
    }
    if let Some(modified) = cached.modified {
        let formatted = DateTime::<Utc>::from(modified)
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        if let Ok(value) = HeaderValue::from_str(&formatted) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }
    headers.insert(
        HeaderName::from_static(FEED_STATUS_HEADER),
        HeaderValue::from_static(cached.freshness.as_str()),
    );

    Ok(response)
}

/// GET|POST /feed/:name/:id - One article by position.
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.get_article(&body, &name, &id).await?))
}
