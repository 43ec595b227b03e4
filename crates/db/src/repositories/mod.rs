//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod event_repo;
pub mod event_template_repo;
pub mod refresh_token_repo;
pub mod subscriber_repo;
pub mod user_repo;

pub use event_repo::EventRepo;
pub use event_template_repo::EventTemplateRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use subscriber_repo::SubscriberRepo;
pub use user_repo::UserRepo;
