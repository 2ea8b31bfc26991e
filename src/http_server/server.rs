//! # HTTP Server
//!
//! Axum wiring: shared application state, bearer-token extraction,
//! CORS and the route table.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::auth::{PasswordPolicy, SessionConfig, SessionManager, UserDirectory};
use crate::interpreter::{CallerContext, Interpreter};
use crate::notebook::NotebookRepository;
use crate::observability::Logger;
use crate::store::DocumentStore;

use super::auth_routes;
use super::config::HttpServerConfig;
use super::errors::{ApiError, ApiResult};
use super::notebook_routes;
use super::query_routes;

/// Shared application state
pub struct AppState {
    pub interpreter: Interpreter,
    pub users: UserDirectory,
    pub sessions: SessionManager,
    pub notebooks: NotebookRepository,
}

impl AppState {
    /// Wire every subsystem over one injected store handle
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session_config: SessionConfig,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            interpreter: Interpreter::new(store.clone()),
            users: UserDirectory::new(store.clone(), password_policy),
            sessions: SessionManager::new(session_config, store.clone()),
            notebooks: NotebookRepository::new(store),
        }
    }
}

/// Build the full router
pub fn router(state: Arc<AppState>, config: &HttpServerConfig) -> Router {
    Router::new()
        .route("/execute-query", post(query_routes::execute_query))
        .route("/register", post(auth_routes::register))
        .route("/login", post(auth_routes::login))
        .route("/refresh", post(auth_routes::refresh))
        .route("/logout", post(auth_routes::logout))
        .route("/notebooks", get(notebook_routes::list_notebooks))
        .route("/notebooks", post(notebook_routes::create_notebook))
        .route("/notebooks/:id", get(notebook_routes::get_notebook))
        .route("/notebooks/:id", patch(notebook_routes::rename_notebook))
        .route("/notebooks/:id", delete(notebook_routes::delete_notebook))
        .route("/notebooks/:id/cells", post(notebook_routes::add_cell))
        .route(
            "/notebooks/:id/cells/:cell_id",
            patch(notebook_routes::update_cell),
        )
        .route(
            "/notebooks/:id/cells/:cell_id",
            delete(notebook_routes::remove_cell),
        )
        .route(
            "/notebooks/:id/cells/:cell_id/execute",
            post(notebook_routes::execute_cell),
        )
        .layer(cors_layer(config))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(
    store: Arc<dyn DocumentStore>,
    config: HttpServerConfig,
    session_config: SessionConfig,
    password_policy: PasswordPolicy,
) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(store, session_config, password_policy));
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    Logger::info("SERVER_LISTENING", &[("addr", &config.socket_addr())]);
    axum::serve(listener, app).await
}

fn cors_layer(config: &HttpServerConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Caller context from the Authorization header.
///
/// No header means anonymous; a present but invalid bearer token is an
/// error, never a silent downgrade to anonymous.
pub fn extract_context(state: &AppState, headers: &HeaderMap) -> ApiResult<CallerContext> {
    let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return Ok(CallerContext::anonymous());
    };

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("malformed Authorization header".to_string()))?;
    Ok(state.sessions.verify_access_token(token)?)
}

/// Caller context that must be authenticated
pub fn require_user(state: &AppState, headers: &HeaderMap) -> ApiResult<CallerContext> {
    let ctx = extract_context(state, headers)?;
    if !ctx.is_authenticated() {
        return Err(ApiError::AuthenticationRequired);
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    pub(crate) fn test_state() -> Arc<AppState> {
        AppState::new(
            Arc::new(MemoryStore::new()),
            SessionConfig::default(),
            PasswordPolicy::default(),
        )
        .into()
    }

    #[test]
    fn test_router_builds() {
        let state = test_state();
        let _router = router(state, &HttpServerConfig::default());
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let state = test_state();
        let ctx = extract_context(&state, &HeaderMap::new()).unwrap();
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn test_garbage_bearer_token_is_an_error() {
        let state = test_state();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer junk".parse().unwrap());
        assert!(extract_context(&state, &headers).is_err());
    }

    #[test]
    fn test_require_user_rejects_anonymous() {
        let state = test_state();
        assert!(matches!(
            require_user(&state, &HeaderMap::new()),
            Err(ApiError::AuthenticationRequired)
        ));
    }

    #[test]
    fn test_valid_token_round_trips() {
        let state = test_state();
        let user = state.users.register("ada", "strong enough").unwrap();
        let pair = state.sessions.open(&user).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", pair.access_token).parse().unwrap(),
        );
        let ctx = require_user(&state, &headers).unwrap();
        assert_eq!(ctx.user_id, Some(user.id));
    }
}
