//! # Query Execution Route
//!
//! `POST /execute-query` feeds the submitted command to the interpreter.
//! The response is always 200 with the uniform envelope; status-code
//! mapping of individual failures is not this surface's concern.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::interpreter::ResultEnvelope;

use super::errors::ApiResult;
use super::server::{extract_context, AppState};

/// Request body for `/execute-query`
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
}

/// Execute one command and return its envelope
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ExecuteRequest>,
) -> ApiResult<Json<ResultEnvelope>> {
    let ctx = extract_context(&state, &headers)?;
    Ok(Json(state.interpreter.interpret(&body.command, &ctx)))
}
