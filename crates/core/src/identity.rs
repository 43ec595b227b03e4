//! Identity error taxonomy and token pair shape shared by the authentication
//! engine and the HTTP boundary.

use serde::{Deserialize, Serialize};

/// Closed set of outcomes the authentication engine reports to callers.
///
/// Storage failures never surface as anything but [`AuthError::Internal`],
/// whose message is logged server-side and replaced with a generic one in
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already exists")]
    EmailExists,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Access and refresh token handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}
