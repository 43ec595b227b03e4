//! The authentication engine: registration, login, token issue, refresh
//! rotation and revocation over a [`CredentialStore`].
//!
//! Access tokens are checked without touching the store. Refresh tokens are
//! single use: a refresh atomically takes the stored row, so a replayed or
//! concurrently reused token finds nothing and fails with
//! [`AuthError::InvalidToken`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use statuspage_core::identity::{AuthError, TokenPair};
use statuspage_core::roles::Role;
use statuspage_core::types::DbId;
use statuspage_db::models::refresh_token::CreateRefreshToken;
use statuspage_db::models::user::{CreateUser, User};
use statuspage_db::{CredentialStore, StoreError};

use super::jwt::{generate_refresh_token, hash_refresh_token, AccessClaims, TokenSigner};
use super::password::Argon2Hasher;

/// Input for [`AuthService::register`]. Shape checks (email syntax, password
/// length) happen at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    signer: Arc<dyn TokenSigner>,
    hasher: Argon2Hasher,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: Arc<dyn TokenSigner>,
        hasher: Argon2Hasher,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            store,
            signer,
            hasher,
            refresh_ttl,
        }
    }

    /// Create a `user`-role account.
    pub async fn register(&self, input: Registration) -> Result<User, AuthError> {
        let email = normalize_email(&input.email);

        match self.store.find_user_by_email(&email).await {
            Ok(_) => return Err(AuthError::EmailExists),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(internal("looking up user by email", e)),
        }

        let password_hash = self
            .hasher
            .hash(&input.password)
            .map_err(|e| AuthError::Internal(format!("hashing password: {e}")))?;

        let user = self
            .store
            .create_user(&CreateUser {
                email,
                password_hash,
                first_name: non_blank(input.first_name),
                last_name: non_blank(input.last_name),
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                StoreError::AlreadyExists => AuthError::EmailExists,
                other => internal("creating user", other),
            })?;

        tracing::info!(user_id = %user.id, email = %user.email, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a token pair.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller, in both the error and the time taken.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let email = normalize_email(email);

        let user = match self.store.find_user_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.hasher.verify_dummy(password);
                tracing::info!(%email, "Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(internal("looking up user by email", e)),
        };

        let valid = self
            .hasher
            .verify(password, &user.password_hash)
            .map_err(|e| AuthError::Internal(format!("verifying password: {e}")))?;
        if !valid {
            tracing::info!(%email, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.generate_tokens(&user).await?;
        tracing::info!(user_id = %user.id, %email, "Login succeeded");
        Ok((user, tokens))
    }

    /// Sign an access token and persist a fresh refresh token for `user`.
    pub async fn generate_tokens(&self, user: &User) -> Result<TokenPair, AuthError> {
        let (access_token, expires_in) = self.signer.sign(user.id, &user.role)?;

        let (refresh_token, token_hash) = generate_refresh_token();
        self.store
            .create_refresh_token(&CreateRefreshToken {
                user_id: user.id,
                token_hash,
                expires_at: Utc::now() + self.refresh_ttl,
            })
            .await
            .map_err(|e| internal("storing refresh token", e))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in,
        })
    }

    /// Verify an access token. Never consults the store.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.signer.verify(token)
    }

    /// Exchange a refresh token for a new pair, consuming the old one.
    ///
    /// If issuing the new pair fails after the old token was taken, the error
    /// is returned and the client has to log in again.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let stored = match self.store.take_refresh_token(&hash_refresh_token(refresh_token)).await {
            Ok(stored) => stored,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(internal("taking refresh token", e)),
        };

        if stored.is_expired_at(Utc::now()) {
            tracing::debug!(user_id = %stored.user_id, "Expired refresh token discarded");
            return Err(AuthError::InvalidToken);
        }

        let user = match self.store.find_user_by_id(stored.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(internal("loading token owner", e)),
        };

        let tokens = self.generate_tokens(&user).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Delete a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let removed = self
            .store
            .delete_refresh_token(&hash_refresh_token(refresh_token))
            .await
            .map_err(|e| internal("deleting refresh token", e))?;
        if removed {
            tracing::info!("Refresh token revoked");
        }
        Ok(())
    }

    /// Same as [`logout`](Self::logout); named for administrative revocation.
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.logout(refresh_token).await
    }

    /// Revoke every refresh token of a user. Returns how many were removed.
    pub async fn logout_all(&self, user_id: DbId) -> Result<u64, AuthError> {
        let removed = self
            .store
            .delete_user_refresh_tokens(user_id)
            .await
            .map_err(|e| internal("deleting user refresh tokens", e))?;
        tracing::info!(%user_id, removed, "All refresh tokens revoked");
        Ok(removed)
    }

    pub async fn get_user(&self, user_id: DbId) -> Result<User, AuthError> {
        self.store.find_user_by_id(user_id).await.map_err(|e| match e {
            StoreError::NotFound => AuthError::UserNotFound,
            other => internal("loading user", other),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn internal(context: &str, err: StoreError) -> AuthError {
    AuthError::Internal(format!("{context}: {err}"))
}
