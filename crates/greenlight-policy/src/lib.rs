//! Access-level authorization policy for Greenlight.
//!
//! A pure function library: callers resolve every entity and actor up front,
//! then ask [`authorize`] whether an operation is allowed. The policy never
//! touches storage, never fails, and expresses every refusal as a typed
//! [`DenyReason`] whose `Display` output is the client-visible message.

pub mod access;
pub mod decision;

pub use access::{authorize, Operation};
pub use decision::{Decision, DenyReason};
