//! # HTTP Server
//!
//! Axum surface for command execution, auth and notebooks.

pub mod auth_routes;
pub mod config;
pub mod errors;
pub mod notebook_routes;
pub mod query_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult};
pub use server::{serve, AppState};
