//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a Bearer access token.
//! - [`rbac::RequireOperator`] -- Requires `operator` or higher.
//! - [`rbac::RequireAdmin`] -- Requires `admin`.

pub mod auth;
pub mod rbac;
