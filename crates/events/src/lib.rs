//! Notification fan-out for event announcements.
//!
//! A [`Dispatcher`] looks up the subscribers of a set of services and hands a
//! [`Notification`] to the [`Sender`] registered for each of their channel
//! types. Delivery is best effort: failures are logged and counted, never
//! retried.

pub mod dispatcher;
pub mod email;
pub mod sender;
pub mod telegram;

pub use dispatcher::{DispatchError, DispatchReport, Dispatcher};
pub use email::{EmailConfig, EmailSender};
pub use sender::{Notification, SendError, Sender};
pub use telegram::{TelegramConfig, TelegramSender};
