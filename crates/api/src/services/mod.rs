//! Domain services sitting between handlers and the store traits.

pub mod events;
pub mod subscriptions;
