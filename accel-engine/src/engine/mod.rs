//! Acceleration engine
//!
//! **Module Structure:**
//! - `core.rs`: engine construction, evaluation (aggregate + classify), label writes
//! - `registry.rs`: opt-in enable / disable / lookup
//! - `scan_queue.rs`: background scan enqueue and the rate-limited drainer
//! - `refresh.rs`: lazy refresh of due opted-in users
//! - `alert.rs`: one-shot moderator alerts with dedup
//! - `command.rs`: single-event command dispatch
//! - `cycle.rs`: per-cycle orchestration and reporting

mod alert;
mod command;
mod core;
mod cycle;
mod refresh;
mod registry;
mod scan_queue;

pub use self::alert::{compose_alert, AlertOutcome};
pub use self::command::{CommandEvent, Intent};
pub use self::core::{AccelerationEngine, Evaluation};
pub use self::cycle::CycleReport;
pub use self::refresh::RefreshSummary;
pub use self::scan_queue::{DrainSummary, EnqueueOutcome};
