//! Application layer for the AI sommelier.
//!
//! Coordinates the core pipeline pieces (validator, quota store, reply
//! parser) with the upstream-facing adapters. [`SommelierService`] is the
//! only surface the chat UI talks to.

pub mod query_dispatcher;
pub mod sommelier_service;

pub use query_dispatcher::QueryDispatcher;
pub use sommelier_service::{SommelierService, SubmitRejection};
