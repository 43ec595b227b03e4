//! Domain types and pure rules for the status page backend.
//!
//! Nothing in this crate performs I/O. Persistence lives in `statuspage-db`,
//! HTTP and the authentication engine in `statuspage-api`.

pub mod error;
pub mod events;
pub mod identity;
pub mod pagination;
pub mod roles;
pub mod templates;
pub mod types;
