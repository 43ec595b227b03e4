#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use statuspage_api::auth::jwt::{Hs256Keyring, JwtConfig};
use statuspage_api::auth::password::{Argon2Hasher, PasswordConfig};
use statuspage_api::auth::service::AuthService;
use statuspage_api::config::{LogFormat, ServerConfig};
use statuspage_api::router::build_app_router;
use statuspage_api::services::events::EventService;
use statuspage_api::services::subscriptions::SubscriptionService;
use statuspage_api::state::AppState;
use statuspage_core::roles::Role;
use statuspage_db::models::subscriber::ChannelType;
use statuspage_db::models::user::CreateUser;
use statuspage_db::{CredentialStore, MemoryStore};
use statuspage_events::{Dispatcher, Notification, SendError, Sender};
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "password123";

/// Build a test `ServerConfig` with safe defaults and the cheapest legal
/// Argon2 parameters.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        log_format: LogFormat::Pretty,
        token_cleanup_interval_secs: 3600,
        jwt: JwtConfig {
            key_id: "test".to_string(),
            secret: TEST_SECRET.to_string(),
            previous_keys: Vec::new(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        password: PasswordConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
    }
}

/// Email sender that keeps every notification instead of delivering it.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait::async_trait]
impl Sender for Outbox {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

impl Outbox {
    /// Wait until at least `count` notifications arrived, or give up after
    /// about a second. Dispatch runs detached from the request.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let sent = self.sent.lock().await.clone();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.sent.lock().await.clone()
    }
}

/// A router over an in-memory store, plus the store for seeding and the
/// outbox that collects email notifications.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub hasher: Argon2Hasher,
    pub outbox: Arc<Outbox>,
}

/// Build the full application router with all middleware layers over a
/// fresh [`MemoryStore`]. Email notifications land in [`TestApp::outbox`].
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let hasher = Argon2Hasher::new(config.password).unwrap();

    let auth = AuthService::new(
        store.clone(),
        Arc::new(Hs256Keyring::new(&config.jwt)),
        hasher.clone(),
        Duration::days(config.jwt.refresh_token_expiry_days),
    );
    let outbox = Arc::new(Outbox::default());
    let dispatcher = Dispatcher::new(store.clone(), vec![outbox.clone() as Arc<dyn Sender>]);
    let events = EventService::new(store.clone(), Some(Arc::new(dispatcher)));
    let subscriptions = SubscriptionService::new(store.clone());

    let state = AppState {
        auth: Arc::new(auth),
        events: Arc::new(events),
        subscriptions: Arc::new(subscriptions),
        health: store.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        hasher,
        outbox,
    }
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Insert a user with the given role directly into the store and log in
    /// through the API. Returns the access token.
    pub async fn token_for(&self, email: &str, role: Role) -> String {
        self.store
            .create_user(&CreateUser {
                email: email.to_string(),
                password_hash: self.hasher.hash(TEST_PASSWORD).unwrap(),
                first_name: None,
                last_name: None,
                role,
            })
            .await
            .unwrap();
        let json = login(self.app(), email, TEST_PASSWORD).await;
        json["data"]["tokens"]["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub async fn operator_token(&self) -> String {
        self.token_for("operator@example.com", Role::Operator).await
    }

    pub async fn admin_token(&self) -> String {
        self.token_for("admin@example.com", Role::Admin).await
    }
}

/// Log in via the API, asserting success, and return the JSON body.
pub async fn login(app: Router, email: &str, password: &str) -> Value {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
