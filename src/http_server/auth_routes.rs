//! # Auth Routes
//!
//! Registration, login and session maintenance. Registration opens a
//! session immediately, so clients get a token pair from both endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::Logger;

use super::errors::ApiResult;
use super::server::AppState;

/// Request body for `/register` and `/login`
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `/refresh` and `/logout`
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair plus the public user record
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Value,
}

/// Create a user and open a session
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = state.users.register(&body.username, &body.password)?;
    let pair = state.sessions.open(&user)?;

    Logger::info("USER_REGISTERED", &[("username", user.username.as_str())]);
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: user.public_view(),
        }),
    ))
}

/// Verify credentials and open a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = state.users.authenticate(&body.username, &body.password)?;
    let pair = state.sessions.open(&user)?;

    Logger::info("USER_LOGGED_IN", &[("username", user.username.as_str())]);
    Ok(Json(SessionResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.public_view(),
    }))
}

/// Rotate a refresh token into a fresh pair
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    let pair = state.sessions.refresh(&body.refresh_token)?;
    Ok(Json(serde_json::json!({
        "access_token": pair.access_token,
        "refresh_token": pair.refresh_token,
    })))
}

/// Revoke the session holding this refresh token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    state.sessions.revoke(&body.refresh_token)?;
    Ok(StatusCode::NO_CONTENT)
}
