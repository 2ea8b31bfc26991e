//! # Auth Errors
//!
//! Error types for registration, login and session handling.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and session errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Username or password did not match
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Username is already registered
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// Password rejected by the password policy
    #[error("Weak password: {0}")]
    WeakPassword(String),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Bearer token is missing, malformed, expired or revoked
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The backing user/session store failed
    #[error("Auth store failure: {0}")]
    Store(String),
}

impl AuthError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials => 401,
            AuthError::InvalidToken => 401,
            AuthError::UsernameTaken(_) => 409,
            AuthError::WeakPassword(_) => 422,
            AuthError::HashingFailed => 500,
            AuthError::Store(_) => 500,
        }
    }
}

impl From<crate::store::StoreError> for AuthError {
    fn from(err: crate::store::StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::UsernameTaken("a".to_string()).status_code(), 409);
        assert_eq!(AuthError::Store("x".to_string()).status_code(), 500);
    }

    #[test]
    fn test_credentials_message_does_not_leak_detail() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
    }
}
