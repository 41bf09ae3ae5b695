//! Lazy refresh of opted-in users
//!
//! Each cycle walks a snapshot of the registry and recomputes only records
//! whose last calculation is at least the refresh TTL old (or every record
//! when `force_refresh` is set). Nothing is recomputed outside a cycle.

use super::core::AccelerationEngine;
use crate::label::LabelEdit;
use accel_common::state::EngineState;
use accel_common::time;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Counts from one refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Records recomputed and overwritten
    pub refreshed: usize,
    /// Records not yet due
    pub not_due: usize,
    /// Refreshed records whose label write failed
    pub label_faults: usize,
}

impl AccelerationEngine<'_> {
    /// Recompute every due opted-in record and its label
    pub fn refresh_opted_in(&self, state: &mut EngineState, now: DateTime<Utc>) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        if !self.config.enabled || state.opted_in_users.is_empty() {
            return summary;
        }

        let ttl = self.config.refresh_ttl();
        let due: Vec<String> = state
            .opted_in_users
            .values()
            .filter(|r| self.config.force_refresh || time::is_due(r.last_calculated, now, ttl))
            .map(|r| r.username.clone())
            .collect();
        summary.not_due = state.opted_in_users.len() - due.len();

        info!(
            due = due.len(),
            total = state.opted_in_users.len(),
            "Refreshing opted-in users"
        );

        for username in due {
            let evaluation = self.evaluate(&username, self.config.scan_limit);
            state.upsert_opt_in(evaluation.to_record(&username, now));
            if !self.write_label(&username, LabelEdit::Set(&evaluation.tier)) {
                summary.label_faults += 1;
            }
            summary.refreshed += 1;

            info!(
                username = %username,
                percent = evaluation.percent(),
                tier = %evaluation.tier,
                "Refreshed"
            );
        }

        summary
    }
}
