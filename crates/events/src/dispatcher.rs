//! Fan-out of one message to every deliverable channel of the subscribers of
//! a set of services.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use statuspage_core::types::DbId;
use statuspage_db::models::subscriber::ChannelType;
use statuspage_db::{StoreError, SubscriberStore};
use tokio::task::JoinHandle;

use crate::sender::{Notification, Sender};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("subscriber lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Outcome counts for one dispatch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Sends handed to a sender (`delivered + failed`).
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Channels not attempted: disabled, unverified, or without a sender.
    pub skipped: usize,
}

pub struct Dispatcher {
    store: Arc<dyn SubscriberStore>,
    senders: HashMap<ChannelType, Arc<dyn Sender>>,
}

impl Dispatcher {
    /// Register senders by their channel type. A later sender for the same
    /// type replaces an earlier one.
    pub fn new(store: Arc<dyn SubscriberStore>, senders: Vec<Arc<dyn Sender>>) -> Self {
        let senders = senders
            .into_iter()
            .map(|s| (s.channel_type(), s))
            .collect();
        Self { store, senders }
    }

    /// Send `subject`/`body` to every deliverable channel of every subscriber
    /// of `service_ids`. Individual send failures are logged and counted.
    pub async fn dispatch(
        &self,
        service_ids: &[DbId],
        subject: &str,
        body: &str,
    ) -> Result<DispatchReport, DispatchError> {
        let subscribers = self.store.subscribers_for_services(service_ids).await?;

        let mut report = DispatchReport::default();
        let mut sends = Vec::new();

        for channel in subscribers.iter().flat_map(|s| s.channels.iter()) {
            if !channel.is_deliverable() {
                report.skipped += 1;
                continue;
            }
            let Some(sender) = self.senders.get(&channel.channel_type) else {
                tracing::warn!(channel_type = %channel.channel_type, "No sender for channel type");
                report.skipped += 1;
                continue;
            };

            let notification = Notification {
                to: channel.target.clone(),
                subject: subject.to_string(),
                body: body.to_string(),
            };
            let sender = Arc::clone(sender);
            let channel_type = channel.channel_type;
            sends.push(async move {
                let result = sender.send(&notification).await;
                if let Err(e) = &result {
                    tracing::error!(
                        channel_type = %channel_type,
                        target = %notification.to,
                        error = %e,
                        "Failed to send notification"
                    );
                }
                result.is_ok()
            });
        }

        report.attempted = sends.len();
        for ok in join_all(sends).await {
            if ok {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            service_count = service_ids.len(),
            subscriber_count = subscribers.len(),
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "Notifications dispatched"
        );
        Ok(report)
    }

    /// Run [`dispatch`](Self::dispatch) on the runtime without waiting for
    /// it. Lookup failures are logged.
    pub fn dispatch_detached(
        self: &Arc<Self>,
        service_ids: Vec<DbId>,
        subject: String,
        body: String,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(&service_ids, &subject, &body).await {
                tracing::error!(error = %e, "Notification dispatch failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use statuspage_core::roles::Role;
    use statuspage_db::models::subscriber::CreateNotificationChannel;
    use statuspage_db::models::user::CreateUser;
    use statuspage_db::{CredentialStore, MemoryStore};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::sender::SendError;

    /// Records every notification; fails for targets in `fail_for`.
    struct RecordingSender {
        channel_type: ChannelType,
        sent: Mutex<Vec<Notification>>,
        fail_for: Vec<String>,
    }

    impl RecordingSender {
        fn new(channel_type: ChannelType) -> Self {
            Self {
                channel_type,
                sent: Mutex::new(Vec::new()),
                fail_for: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Sender for RecordingSender {
        fn channel_type(&self) -> ChannelType {
            self.channel_type
        }

        async fn send(&self, notification: &Notification) -> Result<(), SendError> {
            if self.fail_for.contains(&notification.to) {
                return Err(SendError::Other("mailbox unavailable".to_string()));
            }
            self.sent.lock().await.push(notification.clone());
            Ok(())
        }
    }

    async fn subscriber(
        store: &MemoryStore,
        email: &str,
        channels: &[(ChannelType, &str, bool, bool)],
        services: Vec<DbId>,
    ) -> DbId {
        let user = store
            .create_user(&CreateUser {
                email: email.to_string(),
                password_hash: "x".to_string(),
                first_name: None,
                last_name: None,
                role: Role::User,
            })
            .await
            .unwrap();
        for (channel_type, target, is_enabled, is_verified) in channels {
            store
                .add_channel(CreateNotificationChannel {
                    user_id: user.id,
                    channel_type: *channel_type,
                    target: target.to_string(),
                    is_enabled: *is_enabled,
                    is_verified: *is_verified,
                })
                .await;
        }
        store.set_subscription(user.id, &services).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn sends_only_to_deliverable_channels() {
        let store = Arc::new(MemoryStore::new());
        let service = Uuid::now_v7();
        subscriber(
            &store,
            "a@example.com",
            &[
                (ChannelType::Email, "a@example.com", true, true),
                (ChannelType::Email, "a-old@example.com", false, true),
                (ChannelType::Email, "a-new@example.com", true, false),
            ],
            vec![service],
        )
        .await;

        let email = Arc::new(RecordingSender::new(ChannelType::Email));
        let dispatcher = Dispatcher::new(store.clone(), vec![email.clone() as Arc<dyn Sender>]);
        let report = dispatcher
            .dispatch(&[service], "[incident] API", "Investigating")
            .await
            .unwrap();

        assert_eq!(
            report,
            DispatchReport {
                attempted: 1,
                delivered: 1,
                failed: 0,
                skipped: 2,
            }
        );
        let sent = email.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[0].subject, "[incident] API");
    }

    #[tokio::test]
    async fn channel_without_sender_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let service = Uuid::now_v7();
        subscriber(
            &store,
            "b@example.com",
            &[(ChannelType::Telegram, "1001", true, true)],
            vec![service],
        )
        .await;

        let dispatcher = Dispatcher::new(
            store.clone(),
            vec![Arc::new(RecordingSender::new(ChannelType::Email)) as Arc<dyn Sender>],
        );
        let report = dispatcher.dispatch(&[service], "s", "b").await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let service = Uuid::now_v7();
        subscriber(
            &store,
            "c@example.com",
            &[(ChannelType::Email, "c@example.com", true, true)],
            vec![service],
        )
        .await;
        subscriber(
            &store,
            "d@example.com",
            &[(ChannelType::Email, "d@example.com", true, true)],
            vec![],
        )
        .await;

        let mut email = RecordingSender::new(ChannelType::Email);
        email.fail_for.push("c@example.com".to_string());
        let email = Arc::new(email);
        let dispatcher = Dispatcher::new(store.clone(), vec![email.clone() as Arc<dyn Sender>]);

        let report = dispatcher.dispatch(&[service], "s", "b").await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(email.sent.lock().await[0].to, "d@example.com");
    }

    #[tokio::test]
    async fn unrelated_services_reach_nobody() {
        let store = Arc::new(MemoryStore::new());
        subscriber(
            &store,
            "e@example.com",
            &[(ChannelType::Email, "e@example.com", true, true)],
            vec![Uuid::now_v7()],
        )
        .await;

        let email = Arc::new(RecordingSender::new(ChannelType::Email));
        let dispatcher = Dispatcher::new(store.clone(), vec![email.clone() as Arc<dyn Sender>]);
        let report = dispatcher.dispatch(&[Uuid::now_v7()], "s", "b").await.unwrap();
        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn detached_dispatch_runs_to_completion() {
        let store = Arc::new(MemoryStore::new());
        let service = Uuid::now_v7();
        subscriber(
            &store,
            "f@example.com",
            &[(ChannelType::Email, "f@example.com", true, true)],
            vec![service],
        )
        .await;

        let email = Arc::new(RecordingSender::new(ChannelType::Email));
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), vec![email.clone() as Arc<dyn Sender>]));
        dispatcher
            .dispatch_detached(vec![service], "s".to_string(), "b".to_string())
            .await
            .unwrap();
        assert_eq!(email.sent.lock().await.len(), 1);
    }
}
