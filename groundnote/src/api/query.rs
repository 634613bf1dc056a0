//! Query API endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{QueryOutcome, RequestId};

use crate::actors::{run_query, SearchSessionError, SearchSessionMsg};
use crate::api::ApiState;
use crate::render::render_outcome_html;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub outcome: QueryOutcome,
    pub html: String,
}

pub async fn post_query(
    State(state): State<ApiState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    match run_query(&state.session, request.prompt, None).await {
        Ok(outcome @ QueryOutcome::Completed(_)) => (
            StatusCode::OK,
            Json(json!(QueryResponse {
                success: true,
                html: render_outcome_html(&outcome),
                outcome,
            })),
        )
            .into_response(),
        Ok(QueryOutcome::Failed(failure)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "request_id": failure.request_id,
                "error": failure.message,
            })),
        )
            .into_response(),
        Err(SearchSessionError::Validation(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Search session call failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn get_history(State(state): State<ApiState>) -> impl IntoResponse {
    match ractor::call!(state.session, |reply| SearchSessionMsg::GetHistory { reply }) {
        Ok(history) => (
            StatusCode::OK,
            Json(json!({ "success": true, "history": history })),
        )
            .into_response(),
        Err(e) => unavailable(e.to_string()),
    }
}

pub async fn get_outcome(
    State(state): State<ApiState>,
    Path(request_id): Path<u64>,
) -> impl IntoResponse {
    let request_id = RequestId(request_id);
    match ractor::call!(state.session, |reply| SearchSessionMsg::GetOutcome {
        request_id,
        reply
    }) {
        Ok(Some(outcome)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "html": render_outcome_html(&outcome),
                "outcome": outcome,
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": format!("request {request_id} not found"),
            })),
        )
            .into_response(),
        Err(e) => unavailable(e.to_string()),
    }
}

pub async fn clear_history(State(state): State<ApiState>) -> impl IntoResponse {
    match ractor::call!(state.session, |reply| SearchSessionMsg::ClearHistory { reply }) {
        Ok(cleared) => (
            StatusCode::OK,
            Json(json!({ "success": true, "cleared": cleared })),
        )
            .into_response(),
        Err(e) => unavailable(e.to_string()),
    }
}

fn unavailable(error: String) -> axum::response::Response {
    tracing::error!(error = %error, "Search session unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "success": false, "error": error })),
    )
        .into_response()
}
