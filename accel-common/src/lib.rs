//! # Acceleration Common Library
//!
//! Shared code for the acceleration engine and its tooling:
//! - Error types
//! - Configuration schema, loading and validation
//! - Persisted engine state (opt-in registry, scan ledger, bounded queues)
//! - JSON state store
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod time;

pub use config::{AccelerationConfig, Config, TierSpec};
pub use error::{Error, Result};
pub use state::EngineState;
