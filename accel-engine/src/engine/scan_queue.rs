//! Background scan queue and drainer
//!
//! **Responsibilities:**
//! - Enqueue users for a passive scan, skipping opted-in, recently scanned
//!   and already queued users
//! - Drain at most `max_scans_per_cycle` entries per cycle with a lighter
//!   scan that only feeds the alert dispatcher (labels are never touched)

use super::alert::AlertOutcome;
use super::core::AccelerationEngine;
use accel_common::state::{BackgroundScanRecord, EngineState};
use accel_common::time;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Why an enqueue request did or did not grow the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnqueueOutcome {
    Queued,
    FeatureDisabled,
    OptedIn,
    RecentlyScanned,
    AlreadyQueued,
}

/// Counts from one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    /// Entries popped from the queue (bounded by the per-cycle budget)
    pub popped: usize,
    /// Users actually scanned
    pub scanned: usize,
    /// Popped users skipped because they opted in meanwhile
    pub skipped_opted_in: usize,
    /// Scans whose history read failed and degraded to zero
    pub degraded: usize,
    pub alerts_sent: usize,
    pub alert_faults: usize,
}

impl AccelerationEngine<'_> {
    /// Queue a user for a passive scan
    pub fn enqueue_background_scan(
        &self,
        state: &mut EngineState,
        username: &str,
        now: DateTime<Utc>,
    ) -> EnqueueOutcome {
        if !self.config.enabled {
            return EnqueueOutcome::FeatureDisabled;
        }
        if state.is_opted_in(username) {
            return EnqueueOutcome::OptedIn;
        }
        if let Some(record) = state.scanned_users.get(username) {
            if !time::is_due(record.last_scanned, now, self.config.background_refresh_ttl()) {
                return EnqueueOutcome::RecentlyScanned;
            }
        }
        if !state.scan_queue.push(username) {
            return EnqueueOutcome::AlreadyQueued;
        }

        debug!(username, queued = state.scan_queue.len(), "Queued for background scan");
        EnqueueOutcome::Queued
    }

    /// Pop and scan up to `max_scans_per_cycle` queued users
    pub fn drain_scan_queue(&self, state: &mut EngineState, now: DateTime<Utc>) -> DrainSummary {
        let mut summary = DrainSummary::default();
        if !self.config.enabled {
            return summary;
        }

        while summary.popped < self.config.max_scans_per_cycle {
            let Some(username) = state.scan_queue.pop_front() else {
                break;
            };
            summary.popped += 1;

            if state.is_opted_in(&username) {
                summary.skipped_opted_in += 1;
                continue;
            }

            let tally = self.aggregator.tally(
                self.history,
                &username,
                self.config.background_scan_limit,
            );
            if tally.degraded {
                summary.degraded += 1;
            }

            state.scanned_users.record(BackgroundScanRecord {
                username: username.clone(),
                last_scanned: now,
                topic_karma: tally.topic_karma,
            });
            summary.scanned += 1;

            match self.alert_if_negative(state, &username, tally.topic_karma) {
                AlertOutcome::Sent | AlertOutcome::Recorded => summary.alerts_sent += 1,
                AlertOutcome::Failed => summary.alert_faults += 1,
                AlertOutcome::NotNegative | AlertOutcome::Suppressed => {}
            }

            info!(
                username = %username,
                topic_karma = tally.topic_karma,
                remaining = state.scan_queue.len(),
                "Background scan complete"
            );
        }

        state.enforce_bounds();
        summary
    }
}
