//! Postgres backend tests.
//!
//! These need a live database: run with `DATABASE_URL` set and
//! `cargo test -p statuspage-db -- --ignored`.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use statuspage_core::events::{plan_status_update, EventStatus, EventType, Severity};
use statuspage_core::roles::Role;
use statuspage_core::types::DbId;
use statuspage_db::models::event::{CreateEvent, EventFilters, NewEventUpdate};
use statuspage_db::models::event_template::{CreateEventTemplate, UpdateEventTemplate};
use statuspage_db::models::refresh_token::CreateRefreshToken;
use statuspage_db::models::subscriber::{ChannelType, CreateNotificationChannel};
use statuspage_db::models::user::{CreateUser, User};
use statuspage_db::repositories::SubscriberRepo;
use statuspage_db::{CredentialStore, EventStore, PgStore, StoreError, SubscriberStore};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(store: &PgStore, email: &str) -> User {
    store
        .create_user(&CreateUser {
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            role: Role::Operator,
        })
        .await
        .unwrap()
}

fn new_incident(created_by: DbId, service_ids: Vec<DbId>) -> CreateEvent {
    CreateEvent {
        title: "Database latency".to_string(),
        event_type: EventType::Incident,
        status: EventStatus::Investigating,
        severity: Some(Severity::Minor),
        description: "Queries are slow".to_string(),
        started_at: Some(Utc::now()),
        scheduled_start_at: None,
        scheduled_end_at: None,
        notify_subscribers: true,
        template_id: None,
        created_by,
        service_ids,
    }
}

fn new_update(status: &str, created_by: DbId) -> NewEventUpdate {
    NewEventUpdate {
        change: plan_status_update(EventType::Incident, status).unwrap(),
        message: format!("moved to {status}"),
        notify_subscribers: false,
        created_by,
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn duplicate_email_maps_to_already_exists(pool: PgPool) {
    let store = PgStore::new(pool);
    seed_user(&store, "dup@example.com").await;
    let err = store
        .create_user(&CreateUser {
            email: "dup@example.com".to_string(),
            password_hash: "x".to_string(),
            first_name: None,
            last_name: None,
            role: Role::User,
        })
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::AlreadyExists);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_take_yields_one_winner(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    let user = seed_user(&store, "race@example.com").await;
    store
        .create_refresh_token(&CreateRefreshToken {
            user_id: user.id,
            token_hash: "digest".to_string(),
            expires_at: Utc::now() + Duration::days(7),
        })
        .await
        .unwrap();

    let a = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.take_refresh_token("digest").await })
    };
    let b = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.take_refresh_token("digest").await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(StoreError::NotFound))));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn event_round_trip_with_services(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "op@example.com").await;
    let services = vec![Uuid::now_v7(), Uuid::now_v7()];

    let created = store
        .create_event(&new_incident(user.id, services.clone()))
        .await
        .unwrap();
    let mut expected = services.clone();
    expected.sort();
    assert_eq!(created.service_ids, expected);
    assert_eq!(created.severity, Some(Severity::Minor));

    let fetched = store.find_event(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn resolved_at_is_sticky(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "op@example.com").await;
    let event = store.create_event(&new_incident(user.id, vec![])).await.unwrap();

    let (resolved, _) = store
        .record_update(event.id, &new_update("resolved", user.id))
        .await
        .unwrap();
    let stamp = resolved.resolved_at.expect("stamped");

    let (reopened, _) = store
        .record_update(event.id, &new_update("identified", user.id))
        .await
        .unwrap();
    assert_eq!(reopened.resolved_at, Some(stamp));

    let (again, _) = store
        .record_update(event.id, &new_update("resolved", user.id))
        .await
        .unwrap();
    assert_eq!(again.resolved_at, Some(stamp));
    assert_eq!(store.list_updates(event.id).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_updates_keep_every_history_row(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    let user = seed_user(&store, "op@example.com").await;
    let event_id = store
        .create_event(&new_incident(user.id, vec![]))
        .await
        .unwrap()
        .id;

    let mut handles = Vec::new();
    for status in ["identified", "resolved", "monitoring", "resolved"] {
        let store = Arc::clone(&store);
        let input = new_update(status, user.id);
        handles.push(tokio::spawn(async move {
            store.record_update(event_id, &input).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.list_updates(event_id).await.unwrap().len(), 4);
    assert!(store.find_event(event_id).await.unwrap().resolved_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn delete_cascades_history(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "op@example.com").await;
    let event = store
        .create_event(&new_incident(user.id, vec![Uuid::now_v7()]))
        .await
        .unwrap();
    store
        .record_update(event.id, &new_update("monitoring", user.id))
        .await
        .unwrap();

    store.delete_event(event.id).await.unwrap();
    assert_matches!(store.find_event(event.id).await, Err(StoreError::NotFound));
    assert!(store.list_updates(event.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn list_filters_by_type(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "op@example.com").await;
    store.create_event(&new_incident(user.id, vec![])).await.unwrap();
    let mut maintenance = new_incident(user.id, vec![]);
    maintenance.event_type = EventType::Maintenance;
    maintenance.status = EventStatus::Scheduled;
    maintenance.severity = None;
    store.create_event(&maintenance).await.unwrap();

    let only = store
        .list_events(&EventFilters {
            event_type: Some(EventType::Maintenance),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].status, EventStatus::Scheduled);
}

// ---------------------------------------------------------------------------
// Templates and subscribers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn template_crud(pool: PgPool) {
    let store = PgStore::new(pool);
    let input = CreateEventTemplate {
        slug: "api-degraded".to_string(),
        event_type: EventType::Incident,
        title_template: "{{service_name}} degraded".to_string(),
        body_template: "Since {{started_at}}".to_string(),
    };
    let created = store.create_template(&input).await.unwrap();
    assert_matches!(store.create_template(&input).await, Err(StoreError::AlreadyExists));

    let updated = store
        .update_template(
            created.id,
            &UpdateEventTemplate {
                body_template: Some("Investigating".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.body_template, "Investigating");
    assert_eq!(updated.title_template, input.title_template);

    store.delete_template(created.id).await.unwrap();
    assert_matches!(
        store.find_template_by_slug("api-degraded").await,
        Err(StoreError::NotFound)
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn subscribers_for_services_includes_wildcards(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let service = Uuid::now_v7();
    let targeted = seed_user(&store, "targeted@example.com").await;
    let wildcard = seed_user(&store, "all@example.com").await;
    let other = seed_user(&store, "other@example.com").await;

    for user in [&targeted, &wildcard, &other] {
        SubscriberRepo::create_channel(
            &pool,
            &CreateNotificationChannel {
                user_id: user.id,
                channel_type: ChannelType::Email,
                target: user.email.clone(),
                is_enabled: true,
                is_verified: true,
            },
        )
        .await
        .unwrap();
    }
    SubscriberRepo::set_subscription(&pool, targeted.id, &[service]).await.unwrap();
    SubscriberRepo::set_subscription(&pool, wildcard.id, &[]).await.unwrap();
    SubscriberRepo::set_subscription(&pool, other.id, &[Uuid::now_v7()]).await.unwrap();

    let subscribers = store.subscribers_for_services(&[service]).await.unwrap();
    let mut users: Vec<_> = subscribers.iter().map(|s| s.user_id).collect();
    users.sort();
    let mut expected = vec![targeted.id, wildcard.id];
    expected.sort();
    assert_eq!(users, expected);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn subscription_lifecycle(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "sub@example.com").await;
    let service = Uuid::now_v7();

    assert_matches!(store.find_subscription(user.id).await, Err(StoreError::NotFound));

    let created = store.set_subscription(user.id, &[service, service]).await.unwrap();
    assert_eq!(created.service_ids, vec![service]);

    let widened = store.set_subscription(user.id, &[]).await.unwrap();
    assert_eq!(widened.id, created.id);
    assert!(widened.service_ids.is_empty());

    store.delete_subscription(user.id).await.unwrap();
    assert_matches!(store.delete_subscription(user.id).await, Err(StoreError::NotFound));
    assert_matches!(
        store.set_subscription(Uuid::now_v7(), &[service]).await,
        Err(StoreError::NotFound)
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn expired_refresh_tokens_are_swept(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "sweep@example.com").await;
    for (hash, expires_at) in [
        ("expired", Utc::now() - Duration::hours(1)),
        ("live", Utc::now() + Duration::days(1)),
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

    assert_eq!(store.delete_expired_refresh_tokens().await.unwrap(), 1);
    assert!(store.take_refresh_token("live").await.is_ok());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn event_referencing_deleted_template_is_not_found(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "op@example.com").await;
    let template = store
        .create_template(&CreateEventTemplate {
            slug: "gone".to_string(),
            event_type: EventType::Incident,
            title_template: "Outage".to_string(),
            body_template: "Investigating".to_string(),
        })
        .await
        .unwrap();
    store.delete_template(template.id).await.unwrap();

    let mut input = new_incident(user.id, vec![]);
    input.template_id = Some(template.id);
    assert_matches!(store.create_event(&input).await, Err(StoreError::NotFound));
}
