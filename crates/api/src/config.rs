use crate::auth::jwt::JwtConfig;
use crate::auth::password::PasswordConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Per-request deadline in seconds (default: `30`). Expiry drops the
    /// handler future, cancelling any store call it is awaiting.
    pub request_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
    /// Seconds between sweeps of expired refresh tokens (default: `3600`).
    pub token_cleanup_interval_secs: u64,
    /// Signing keys and token lifetimes.
    pub jwt: JwtConfig,
    /// Argon2id cost parameters.
    pub password: PasswordConfig,
}

/// Database connection settings. Kept apart from [`ServerConfig`] because
/// only the binary entrypoint needs them; tests run over the in-memory store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8080`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `LOG_FORMAT`           | `pretty` (or `json`)       |
    /// | `TOKEN_CLEANUP_INTERVAL_SECS` | `3600`              |
    ///
    /// JWT and password hashing settings are read by [`JwtConfig::from_env`]
    /// and [`PasswordConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let token_cleanup_interval_secs: u64 = std::env::var("TOKEN_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("TOKEN_CLEANUP_INTERVAL_SECS must be a valid u64");
        assert!(
            token_cleanup_interval_secs > 0,
            "TOKEN_CLEANUP_INTERVAL_SECS must be positive"
        );

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => panic!("LOG_FORMAT must be `pretty` or `json`, got {other:?}"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            log_format,
            token_cleanup_interval_secs,
            jwt: JwtConfig::from_env(),
            password: PasswordConfig::from_env(),
        }
    }
}

impl DatabaseConfig {
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `DATABASE_URL`             | **yes**  | --      |
    /// | `DATABASE_MAX_CONNECTIONS` | no       | `20`    |
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DATABASE_MAX_CONNECTIONS must be a valid u32");
        Self {
            url,
            max_connections,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
