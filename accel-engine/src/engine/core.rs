//! Engine core
//!
//! **Responsibilities:**
//! - Own configuration, tier table and aggregator
//! - Borrow the external collaborators for the duration of a cycle
//! - Evaluate a user (aggregate + classify)
//! - Label writes with dry-run and fault isolation

use crate::collaborators::{HistoryProvider, LabelStore, ModeratorNotifier};
use crate::karma::{ratio_percent, KarmaAggregator, KarmaTally};
use crate::label::{self, LabelEdit};
use crate::tier::TierTable;
use accel_common::config::AccelerationConfig;
use accel_common::state::UserAffinityRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Aggregated and classified affinity of one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub tally: KarmaTally,
    pub ratio: f64,
    pub tier: String,
}

impl Evaluation {
    /// Integer percentage shown in replies
    pub fn percent(&self) -> u32 {
        ratio_percent(self.ratio)
    }

    /// Registry record for an opted-in user, stamped `now`
    pub fn to_record(&self, username: &str, now: DateTime<Utc>) -> UserAffinityRecord {
        UserAffinityRecord {
            username: username.to_string(),
            enabled: true,
            last_calculated: now,
            topic_karma: self.tally.topic_karma,
            total_karma: self.tally.total_karma,
            ratio: self.ratio,
            tier: self.tier.clone(),
        }
    }
}

/// Tiering-and-queue engine
///
/// Stateless between calls: every operation takes the `EngineState` to mutate.
pub struct AccelerationEngine<'a> {
    pub(super) config: AccelerationConfig,
    pub(super) tiers: TierTable,
    pub(super) aggregator: KarmaAggregator,
    pub(super) history: &'a dyn HistoryProvider,
    pub(super) labels: &'a dyn LabelStore,
    pub(super) notifier: &'a dyn ModeratorNotifier,
}

impl<'a> AccelerationEngine<'a> {
    pub fn new(
        config: AccelerationConfig,
        history: &'a dyn HistoryProvider,
        labels: &'a dyn LabelStore,
        notifier: &'a dyn ModeratorNotifier,
    ) -> Self {
        let tiers = TierTable::from_config(&config);
        let aggregator = KarmaAggregator::new(&config.topic_communities);
        Self {
            config,
            tiers,
            aggregator,
            history,
            labels,
            notifier,
        }
    }

    pub fn config(&self) -> &AccelerationConfig {
        &self.config
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Aggregate and classify with the given per-stream scan limit
    pub fn evaluate(&self, username: &str, scan_limit: usize) -> Evaluation {
        let tally = self.aggregator.tally(self.history, username, scan_limit);
        let ratio = tally.ratio();
        let tier = self.tiers.classify(ratio).to_string();
        debug!(username, ratio, tier = %tier, "Evaluated affinity");
        Evaluation { tally, ratio, tier }
    }

    /// Apply a label edit, logging rather than propagating faults
    ///
    /// Returns false when the write failed. In dry-run mode nothing is written.
    pub(super) fn write_label(&self, username: &str, edit: LabelEdit<'_>) -> bool {
        if self.config.dry_run {
            debug!(username, ?edit, "Dry run: label not written");
            return true;
        }

        match label::apply_edit(self.labels, username, edit) {
            Ok(_) => true,
            Err(fault) => {
                warn!(username, "Label update failed, registry and label may diverge: {}", fault);
                false
            }
        }
    }
}
