//! HTTP-level integration tests for `/me/subscriptions` and the
//! notifications it routes.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get, get_auth, post_json_auth};
use serde_json::json;
use statuspage_core::roles::Role;
use statuspage_core::types::DbId;
use statuspage_db::models::subscriber::{ChannelType, CreateNotificationChannel};
use uuid::Uuid;

/// Create a `user`-role account with a verified email channel. Returns the
/// access token and the user id.
async fn reader(test: &common::TestApp, email: &str) -> (String, DbId) {
    let token = test.token_for(email, Role::User).await;
    let me = body_json(get_auth(test.app(), "/api/v1/me", &token).await).await;
    let user_id: DbId = me["data"]["id"].as_str().unwrap().parse().unwrap();
    test.store
        .add_channel(CreateNotificationChannel {
            user_id,
            channel_type: ChannelType::Email,
            target: email.to_string(),
            is_enabled: true,
            is_verified: true,
        })
        .await;
    (token, user_id)
}

#[tokio::test]
async fn subscriptions_require_auth() {
    let test = common::build_test_app();
    let response = get(test.app(), "/api/v1/me/subscriptions").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscribe_replace_and_unsubscribe() {
    let test = common::build_test_app();
    let (token, user_id) = reader(&test, "reader@example.com").await;
    let service = Uuid::new_v4();

    let missing = get_auth(test.app(), "/api/v1/me/subscriptions", &token).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["code"], "NOT_FOUND");

    let created = post_json_auth(
        test.app(),
        "/api/v1/me/subscriptions",
        json!({ "service_ids": [service, service] }),
        &token,
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);
    let created = body_json(created).await;
    assert_eq!(created["data"]["user_id"], user_id.to_string());
    assert_eq!(created["data"]["service_ids"], json!([service]));

    let widened =
        post_json_auth(test.app(), "/api/v1/me/subscriptions", json!({}), &token).await;
    assert_eq!(widened.status(), StatusCode::OK);
    let widened = body_json(widened).await;
    assert_eq!(widened["data"]["id"], created["data"]["id"]);
    assert_eq!(widened["data"]["service_ids"], json!([]));

    let fetched = get_auth(test.app(), "/api/v1/me/subscriptions", &token).await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let removed = delete_auth(test.app(), "/api/v1/me/subscriptions", &token).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let again = delete_auth(test.app(), "/api/v1/me/subscriptions", &token).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(again).await["error"], "Subscription not found");
}

#[tokio::test]
async fn event_notifications_reach_subscribers_of_its_services() {
    let test = common::build_test_app();
    let operator = test.operator_token().await;
    let api = Uuid::new_v4();
    let billing = Uuid::new_v4();

    let (watcher, _) = reader(&test, "watcher@example.com").await;
    let (elsewhere, _) = reader(&test, "billing@example.com").await;
    reader(&test, "lurker@example.com").await;

    for (token, service) in [(&watcher, api), (&elsewhere, billing)] {
        let response = post_json_auth(
            test.app(),
            "/api/v1/me/subscriptions",
            json!({ "service_ids": [service] }),
            token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let created = post_json_auth(
        test.app(),
        "/api/v1/events",
        json!({
            "title": "API latency",
            "type": "incident",
            "status": "investigating",
            "severity": "minor",
            "description": "Requests are slow",
            "notify_subscribers": true,
            "service_ids": [api],
        }),
        &operator,
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    test.outbox.wait_for(1).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let sent = test.outbox.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "watcher@example.com");
    assert_eq!(sent[0].subject, "[incident] API latency");
    assert_eq!(sent[0].body, "Requests are slow");
}
