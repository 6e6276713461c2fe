//! Shared types for the Restock import service
//!
//! Provides the error type, the import event stream definitions with the
//! broadcast EventBus, duration display formatting, and TOML configuration
//! loading used by the service crates.

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
