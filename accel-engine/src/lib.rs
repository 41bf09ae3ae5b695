//! # Acceleration Engine Library (accel-engine)
//!
//! Scores a user's historical affinity toward a fixed set of topic
//! communities, classifies it into a named tier, keeps an opt-in label in
//! sync with that tier, and alerts moderators once when affinity is strongly
//! negative.
//!
//! **Architecture:** pure scoring pieces (`karma`, `tier`, `label`) driven by
//! `AccelerationEngine`, which owns the configuration and borrows the external
//! collaborators. All state lives in one `EngineState` passed in by the caller
//! for each operation; cycles are sequential and externally triggered.

pub mod adapters;
pub mod collaborators;
pub mod engine;
pub mod error;
pub mod karma;
pub mod label;
pub mod tier;

pub use collaborators::{
    HistoryItem, HistoryProvider, IntentClassifier, LabelStore, ModeratorNotifier, StreamKind,
};
pub use engine::{AccelerationEngine, AlertOutcome, CommandEvent, CycleReport, Intent};
pub use error::Fault;
