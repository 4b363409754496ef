//! Notification delivery seam for Greenlight.
//!
//! The workflow core produces [`Notice`](greenlight_models::Notice) values
//! and hands them to a [`Notify`] implementation after a successful commit.
//! Delivery is fire-and-forget: a failing or slow transport must never fail
//! the workflow transaction, so the trait is infallible from the caller's
//! point of view and implementations log their own trouble.

pub mod dispatcher;
pub mod error;
pub mod notifier;

pub use dispatcher::Dispatcher;
pub use error::{EventError, Result};
pub use notifier::{Notify, NullNotifier, Recorder};
