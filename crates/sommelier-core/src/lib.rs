//! Domain layer of the AI sommelier pipeline.
//!
//! Holds the data model and every pure piece of the pipeline: the device
//! fingerprint, the tamper-evident quota store, the input validator and
//! the resilient reply parser. I/O is reached only through the port traits
//! in [`storage`], [`clock`] and [`generation`].

pub mod catalog;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod fingerprint;
pub mod generation;
pub mod quota;
pub mod response;
pub mod storage;
pub mod validation;

// Re-export common error type
pub use error::{Result, SommelierError};
