//! Periodic sweep of expired refresh tokens.
//!
//! Refresh tokens are removed when presented, revoked, or logged out. Tokens
//! that are simply abandoned would otherwise stay in the store forever.

use std::sync::Arc;
use std::time::Duration;

use statuspage_db::CredentialStore;
use tokio_util::sync::CancellationToken;

/// Delete expired refresh tokens every `every` until `cancel` fires. The
/// first sweep runs immediately.
pub async fn run(store: Arc<dyn CredentialStore>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Refresh token cleanup started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Refresh token cleanup stopping");
                break;
            }
            _ = interval.tick() => sweep(store.as_ref()).await,
        }
    }
}

async fn sweep(store: &dyn CredentialStore) {
    match store.delete_expired_refresh_tokens().await {
        Ok(0) => tracing::debug!("Refresh token cleanup: nothing expired"),
        Ok(deleted) => tracing::info!(deleted, "Refresh token cleanup: purged expired tokens"),
        Err(e) => tracing::error!(error = %e, "Refresh token cleanup failed"),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use statuspage_core::roles::Role;
    use statuspage_db::models::refresh_token::CreateRefreshToken;
    use statuspage_db::models::user::CreateUser;
    use statuspage_db::{MemoryStore, StoreError};

    use super::*;

    #[tokio::test]
    async fn sweeps_expired_tokens_and_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(&CreateUser {
                email: "idle@example.com".to_string(),
                password_hash: "x".to_string(),
                first_name: None,
                last_name: None,
                role: Role::User,
            })
            .await
            .unwrap();
        for (hash, expires_at) in [
            ("abandoned", Utc::now() - chrono::Duration::hours(2)),
            ("current", Utc::now() + chrono::Duration::days(1)),
        ] {
            store
                .create_refresh_token(&CreateRefreshToken {
                    user_id: user.id,
                    token_hash: hash.to_string(),
                    expires_at,
                })
                .await
                .unwrap();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            store.clone(),
            Duration::from_millis(10),
            cancel.clone(),
        ));

        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task stops on cancel")
            .unwrap();

        assert_matches!(store.take_refresh_token("abandoned").await, Err(StoreError::NotFound));
        assert!(store.take_refresh_token("current").await.is_ok());
    }
}
