//! Authentication error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when verifying a session token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token is not `<payload>.<signature>` or the payload does not decode.
    #[error("malformed session token")]
    Malformed,

    /// The signature does not match the payload.
    #[error("invalid session token signature")]
    BadSignature,

    /// The token lifetime has passed.
    #[error("session token expired")]
    Expired,

    /// The signing key was rejected by the MAC.
    #[error("session key error: {0}")]
    Key(String),
}

/// Errors that can occur during login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts from this client.
    #[error("too many login attempts")]
    Throttled { retry_after: Duration },

    /// Token could not be issued.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Password too short to be hashed for the admin account.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
