//! Notifier registry and webhook delivery
//!
//! Checks reference notifiers by name. The [`registry`] resolves those
//! names and the [`webhook`] dispatcher renders and posts the message.
//!
//! # Modules
//!
//! - [`registry`]: Name lookup over configured notifiers
//! - [`webhook`]: Payload rendering and delivery through a [`NotificationSink`]

pub mod registry;
pub mod webhook;

pub use registry::NotifierRegistry;
pub use webhook::{NotificationSink, NotifierKind, PostResponse, ReqwestSink, WebhookDispatcher};
