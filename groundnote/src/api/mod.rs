//! HTTP API routes for groundnote
//!
//! Queries are forwarded to the search session actor, which runs them one at
//! a time; concurrent HTTP requests simply queue in its mailbox.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ractor::ActorRef;
use serde_json::json;

pub mod query;

use crate::actors::SearchSessionMsg;

#[derive(Clone)]
pub struct ApiState {
    pub session: ActorRef<SearchSessionMsg>,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/query", post(query::post_query))
        .route(
            "/api/history",
            get(query::get_history).delete(query::clear_history),
        )
        .route("/api/history/{request_id}", get(query::get_outcome))
}

/// Health check endpoint
pub async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "groundnote",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
