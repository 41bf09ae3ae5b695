//! Opt-in registry operations
//!
//! Enabling always recomputes affinity synchronously and overwrites the
//! record; disabling deletes it and strips the label segment.

use super::core::{AccelerationEngine, Evaluation};
use crate::label::LabelEdit;
use accel_common::state::{EngineState, UserAffinityRecord};
use chrono::{DateTime, Utc};
use tracing::info;

impl AccelerationEngine<'_> {
    /// Opt a user in: evaluate, upsert the record, set the label
    pub fn enable_user(
        &self,
        state: &mut EngineState,
        username: &str,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let evaluation = self.evaluate(username, self.config.scan_limit);
        state.upsert_opt_in(evaluation.to_record(username, now));
        // Opted-in users are never tracked by the background queue
        state.scan_queue.remove(username);
        self.write_label(username, LabelEdit::Set(&evaluation.tier));

        info!(
            username,
            percent = evaluation.percent(),
            tier = %evaluation.tier,
            "Opted in"
        );
        evaluation
    }

    /// Opt a user out: delete the record and strip the label segment
    ///
    /// The label is cleaned up even if the user was not registered.
    pub fn disable_user(
        &self,
        state: &mut EngineState,
        username: &str,
    ) -> Option<UserAffinityRecord> {
        let removed = state.remove_opt_in(username);
        self.write_label(username, LabelEdit::Remove);

        info!(username, was_registered = removed.is_some(), "Opted out");
        removed
    }

    /// Registry lookup
    pub fn lookup<'s>(&self, state: &'s EngineState, username: &str) -> Option<&'s UserAffinityRecord> {
        state.opted_in(username)
    }
}
