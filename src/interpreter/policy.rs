//! # Access Policy
//!
//! Decides whether a collection/operation pair is permitted for the
//! caller, strictly before normalization and dispatch, so a denied request
//! never touches the store.
//!
//! The interpreter runs with the store's full privilege, so the identity
//! collections are denied unconditionally for every caller and every
//! operation; there is no service-role bypass on this path.

use uuid::Uuid;

use super::errors::{InterpreterError, InterpreterResult};
use super::registry::{OperationClass, OperationSpec};

/// Collections holding authentication records. Never reachable through
/// the interpreter, regardless of caller or operation.
const IDENTITY_COLLECTIONS: &[&str] = &["users", "sessions"];

/// Authenticated identity carried with each request
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    /// The authenticated user's ID (None if anonymous)
    pub user_id: Option<Uuid>,

    /// The authenticated username, for logging
    pub username: Option<String>,
}

impl CallerContext {
    /// Context for an authenticated user
    pub fn authenticated(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            username: Some(username.into()),
        }
    }

    /// Context for anonymous access
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Process-wide access policy, immutable after initialization
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Gate a parsed command before any argument handling.
    ///
    /// Runs ahead of operation resolution so a denied request is rejected
    /// even when the operation itself is unknown; `spec` is therefore
    /// optional here and the class check applies once it resolved.
    pub fn check_access(
        &self,
        collection: &str,
        spec: Option<&OperationSpec>,
        ctx: &CallerContext,
    ) -> InterpreterResult<()> {
        if IDENTITY_COLLECTIONS.contains(&collection) {
            return Err(InterpreterError::AccessDenied(format!(
                "collection '{}' holds authentication records and is not accessible",
                collection
            )));
        }

        // Leading underscore marks internal collections
        if collection.starts_with('_') {
            return Err(InterpreterError::AccessDenied(format!(
                "collection '{}' is reserved",
                collection
            )));
        }

        if let Some(spec) = spec {
            if spec.class == OperationClass::Admin && !ctx.is_authenticated() {
                return Err(InterpreterError::AccessDenied(format!(
                    "operation '{}' requires authentication",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}
