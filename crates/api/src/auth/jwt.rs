//! Access-token signing/verification and refresh-token helpers.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload and a
//! `kid` header naming the signing key. Refresh tokens are opaque random
//! strings; only their SHA-256 hash is stored server-side so a database leak
//! does not compromise active sessions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use statuspage_core::identity::AuthError;
use statuspage_core::types::DbId;
use uuid::Uuid;

/// Bytes of entropy in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's id.
    pub sub: DbId,
    /// The user's role name (e.g. `"admin"`, `"user"`).
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// `kid` written into newly signed tokens.
    pub key_id: String,
    /// HMAC-SHA256 secret of the active key.
    pub secret: String,
    /// Retired `(kid, secret)` pairs still accepted when verifying.
    pub previous_keys: Vec<(String, String)>,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

const DEFAULT_KEY_ID: &str = "primary";
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default   |
    /// |----------------------------|----------|-----------|
    /// | `JWT_SECRET`               | **yes**  | --        |
    /// | `JWT_KEY_ID`               | no       | `primary` |
    /// | `JWT_PREVIOUS_SECRETS`     | no       | empty     |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`      |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`       |
    ///
    /// `JWT_PREVIOUS_SECRETS` is a comma-separated list of `kid=secret` pairs.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty, or if any value is malformed.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let key_id = std::env::var("JWT_KEY_ID").unwrap_or_else(|_| DEFAULT_KEY_ID.into());

        let previous_keys = parse_previous_keys(
            &std::env::var("JWT_PREVIOUS_SECRETS").unwrap_or_default(),
        )
        .expect("JWT_PREVIOUS_SECRETS must be a comma-separated list of kid=secret pairs");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            key_id,
            secret,
            previous_keys,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }
}

/// Parse `kid=secret,kid=secret`. Empty input yields no keys.
fn parse_previous_keys(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((kid, secret)) if !kid.trim().is_empty() && !secret.is_empty() => {
                Ok((kid.trim().to_string(), secret.to_string()))
            }
            _ => Err(format!("malformed key entry {entry:?}")),
        })
        .collect()
}

/// Identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: DbId,
    pub role: String,
}

/// Signs and verifies access tokens.
///
/// Injected into [`AuthService`](super::service::AuthService) so tests can
/// swap keys and deployments can rotate them.
pub trait TokenSigner: Send + Sync {
    /// Sign a token for the user, returning it with its lifetime in seconds.
    fn sign(&self, user_id: DbId, role: &str) -> Result<(String, i64), AuthError>;

    /// Check signature, algorithm and expiry. Expiry is reported as
    /// [`AuthError::TokenExpired`], anything else as [`AuthError::InvalidToken`].
    fn verify(&self, token: &str) -> Result<AccessClaims, AuthError>;
}

/// HS256 signer with one active key and any number of verify-only keys.
pub struct Hs256Keyring {
    active_kid: String,
    encoding: EncodingKey,
    decoding: Vec<(String, DecodingKey)>,
    access_ttl_secs: i64,
    validation: Validation,
}

impl Hs256Keyring {
    pub fn new(config: &JwtConfig) -> Self {
        let mut decoding = vec![(
            config.key_id.clone(),
            DecodingKey::from_secret(config.secret.as_bytes()),
        )];
        decoding.extend(
            config
                .previous_keys
                .iter()
                .map(|(kid, secret)| (kid.clone(), DecodingKey::from_secret(secret.as_bytes()))),
        );

        // Only HS256 is accepted; a token declaring any other algorithm fails.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            active_kid: config.key_id.clone(),
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding,
            access_ttl_secs: config.access_token_expiry_mins * 60,
            validation,
        }
    }

    fn decoding_key(&self, kid: Option<&str>) -> Option<&DecodingKey> {
        let kid = kid.unwrap_or(&self.active_kid);
        self.decoding
            .iter()
            .find(|(candidate, _)| candidate == kid)
            .map(|(_, key)| key)
    }
}

impl TokenSigner for Hs256Keyring {
    fn sign(&self, user_id: DbId, role: &str) -> Result<(String, i64), AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            role: role.to_string(),
            exp: now + self.access_ttl_secs,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        let header = Header {
            kid: Some(self.active_kid.clone()),
            ..Header::new(Algorithm::HS256)
        };
        let token = encode(&header, &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign access token: {e}")))?;
        Ok((token, self.access_ttl_secs))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let key = self
            .decoding_key(header.kid.as_deref())
            .ok_or(AuthError::InvalidToken)?;
        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;
        Ok(AccessClaims {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// Generate a refresh token: 32 random bytes, URL-safe base64 without padding.
///
/// Returns `(plaintext_token, sha256_hex_hash)`. The plaintext goes to the
/// client; only the hash is persisted.
pub fn generate_refresh_token() -> (String, String) {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            key_id: "k1".to_string(),
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            previous_keys: Vec::new(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn encode_with(claims: &Claims, header: Header, secret: &str) -> String {
        encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("encoding should succeed")
    }

    fn claims_expiring_at(exp: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            role: "user".to_string(),
            exp,
            iat: exp - 900,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn sign_then_verify_round_trips_identity() {
        let keyring = Hs256Keyring::new(&test_config());
        let user_id = Uuid::new_v4();

        let (token, expires_in) = keyring.sign(user_id, "admin").expect("sign");
        assert_eq!(expires_in, 900);

        let claims = keyring.verify(&token).expect("verify");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, "admin");

        let header = decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("k1"));
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let config = test_config();
        let keyring = Hs256Keyring::new(&config);
        // Well beyond the default 60-second leeway.
        let claims = claims_expiring_at(chrono::Utc::now().timestamp() - 300);
        let token = encode_with(&claims, Header::new(Algorithm::HS256), &config.secret);

        assert_matches!(keyring.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let keyring = Hs256Keyring::new(&test_config());
        let claims = claims_expiring_at(chrono::Utc::now().timestamp() + 600);
        let token = encode_with(&claims, Header::new(Algorithm::HS256), "some-other-secret");

        assert_matches!(keyring.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let config = test_config();
        let keyring = Hs256Keyring::new(&config);
        let claims = claims_expiring_at(chrono::Utc::now().timestamp() + 600);
        let token = encode_with(&claims, Header::new(Algorithm::HS512), &config.secret);

        assert_matches!(keyring.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_is_invalid() {
        let keyring = Hs256Keyring::new(&test_config());
        assert_matches!(keyring.verify("not-a-jwt"), Err(AuthError::InvalidToken));
        assert_matches!(keyring.verify(""), Err(AuthError::InvalidToken));
    }

    #[test]
    fn previous_key_still_verifies_after_rotation() {
        let old = test_config();
        let old_keyring = Hs256Keyring::new(&old);
        let (token, _) = old_keyring.sign(Uuid::new_v4(), "operator").unwrap();

        let rotated = JwtConfig {
            key_id: "k2".to_string(),
            secret: "a-brand-new-secret".to_string(),
            previous_keys: vec![("k1".to_string(), old.secret.clone())],
            ..old.clone()
        };
        let keyring = Hs256Keyring::new(&rotated);
        assert_eq!(keyring.verify(&token).unwrap().role, "operator");

        let retired = JwtConfig {
            previous_keys: Vec::new(),
            ..rotated
        };
        assert_matches!(
            Hs256Keyring::new(&retired).verify(&token),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn unknown_kid_is_invalid() {
        let config = test_config();
        let keyring = Hs256Keyring::new(&config);
        let claims = claims_expiring_at(chrono::Utc::now().timestamp() + 600);
        let header = Header {
            kid: Some("nope".to_string()),
            ..Header::new(Algorithm::HS256)
        };
        let token = encode_with(&claims, header, &config.secret);

        assert_matches!(keyring.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn refresh_tokens_are_url_safe_and_hash_stably() {
        let (plaintext, hash) = generate_refresh_token();

        // 32 bytes encode to 43 unpadded base64 characters.
        assert_eq!(plaintext.len(), 43);
        assert!(plaintext
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        assert_eq!(hash, hash_refresh_token(&plaintext));
        assert_eq!(hash.len(), 64);

        let (other, _) = generate_refresh_token();
        assert_ne!(plaintext, other);
    }

    #[test]
    fn previous_keys_parse() {
        assert!(parse_previous_keys("").unwrap().is_empty());
        assert_eq!(
            parse_previous_keys("old=s1, older=s=2").unwrap(),
            vec![
                ("old".to_string(), "s1".to_string()),
                ("older".to_string(), "s=2".to_string())
            ]
        );
        assert!(parse_previous_keys("missing-separator").is_err());
        assert!(parse_previous_keys("=secret").is_err());
    }
}
