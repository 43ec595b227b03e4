//! Authentication engine and its primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access-token signing/verification and refresh-token helpers.
//! - [`service`] -- [`service::AuthService`], which ties both to a credential store.

pub mod jwt;
pub mod password;
pub mod service;
