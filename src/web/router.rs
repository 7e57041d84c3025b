//! Router configuration for the HTTP API.

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{get_article, get_feed, list_feeds, AppState};

/// Any origin; fixed method and header allow-lists.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers([HeaderName::from_static("x-requested-with"), CONTENT_TYPE])
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/feeds", get(list_feeds).post(list_feeds))
        .route("/feed/:name", get(get_feed).post(get_feed))
        .route("/feed/:name/:id", get(get_article).post(get_article))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer()),
        )
        .with_state(app_state)
}
