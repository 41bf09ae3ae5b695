//! Per-cycle orchestration
//!
//! A cycle runs the refresh scheduler over due opted-in users, then drains a
//! bounded slice of the background scan queue. Work is sequential and every
//! per-user unit is isolated: a fault is logged and the cycle moves on.

use super::core::AccelerationEngine;
use super::refresh::RefreshSummary;
use super::scan_queue::DrainSummary;
use accel_common::state::EngineState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Outcome of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub refresh: RefreshSummary,
    pub drain: DrainSummary,
    /// Usernames still waiting after the drain
    pub queue_remaining: usize,
}

impl AccelerationEngine<'_> {
    /// Refresh due opted-in users, then drain the scan queue
    pub fn run_cycle(&self, state: &mut EngineState, now: DateTime<Utc>) -> CycleReport {
        if !self.config.enabled {
            info!("Acceleration disabled, skipping cycle");
            return CycleReport {
                queue_remaining: state.scan_queue.len(),
                ..CycleReport::default()
            };
        }

        let refresh = self.refresh_opted_in(state, now);
        let drain = self.drain_scan_queue(state, now);
        let report = CycleReport {
            refresh,
            drain,
            queue_remaining: state.scan_queue.len(),
        };

        info!(
            refreshed = report.refresh.refreshed,
            label_faults = report.refresh.label_faults,
            scanned = report.drain.scanned,
            skipped_opted_in = report.drain.skipped_opted_in,
            alerts_sent = report.drain.alerts_sent,
            alert_faults = report.drain.alert_faults,
            queue_remaining = report.queue_remaining,
            "Cycle complete"
        );
        report
    }
}
