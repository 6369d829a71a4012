//! Embedded single-page dashboard.
//!
//! The page talks to the REST API and listens on `/api/ws` for snapshots.

use std::sync::Arc;

use axum::{Router, http::header, response::IntoResponse, routing::get};

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../assets/dashboard.html");

/// Create the dashboard router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}

async fn index() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        INDEX_HTML,
    )
}
