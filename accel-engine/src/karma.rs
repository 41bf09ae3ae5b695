//! Karma aggregation
//!
//! Scans a bounded window of a user's comments and submissions and sums item
//! scores: all of them into `total_karma`, and those posted in a topic
//! community into `topic_karma`.
//!
//! A fault from the history provider at any point discards the partial sums;
//! the tally degrades to zero affinity instead of reporting a half-scanned
//! window.

use crate::collaborators::{HistoryProvider, StreamKind};
use crate::error::Fault;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Scores gathered for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KarmaTally {
    pub topic_karma: i64,
    pub total_karma: i64,
    /// True when the scan failed and the sums were reset to zero
    pub degraded: bool,
}

impl KarmaTally {
    /// Zero affinity after a failed scan
    pub fn degraded() -> Self {
        Self {
            topic_karma: 0,
            total_karma: 0,
            degraded: true,
        }
    }

    /// Affinity ratio of this tally
    pub fn ratio(&self) -> f64 {
        affinity_ratio(self.topic_karma, self.total_karma)
    }
}

/// `topic / total` when `total > 0`, else 0, clamped to [0, 1]
///
/// Negative items outside the topic set can push topic above total, and
/// negative topic karma can make the quotient negative; both are clamped.
pub fn affinity_ratio(topic_karma: i64, total_karma: i64) -> f64 {
    if total_karma <= 0 {
        return 0.0;
    }
    (topic_karma as f64 / total_karma as f64).clamp(0.0, 1.0)
}

/// Integer percentage shown to users (floor of ratio * 100)
pub fn ratio_percent(ratio: f64) -> u32 {
    (ratio.clamp(0.0, 1.0) * 100.0).floor() as u32
}

/// Sums karma over a user's history for a fixed topic community set
#[derive(Debug, Clone)]
pub struct KarmaAggregator {
    /// Lowercased community names
    topic_communities: HashSet<String>,
}

impl KarmaAggregator {
    pub fn new<S: AsRef<str>>(topic_communities: &[S]) -> Self {
        Self {
            topic_communities: topic_communities
                .iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Case-insensitive topic community membership
    pub fn is_topic(&self, community: &str) -> bool {
        self.topic_communities.contains(&community.to_lowercase())
    }

    /// Tally up to `scan_limit` items per stream
    ///
    /// Never fails: a provider fault yields `KarmaTally::degraded()`.
    pub fn tally(
        &self,
        history: &dyn HistoryProvider,
        username: &str,
        scan_limit: usize,
    ) -> KarmaTally {
        match self.try_tally(history, username, scan_limit) {
            Ok(tally) => {
                debug!(
                    username,
                    topic_karma = tally.topic_karma,
                    total_karma = tally.total_karma,
                    "Karma scan complete"
                );
                tally
            }
            Err(fault) => {
                warn!(username, "Karma scan failed, degrading to zero affinity: {}", fault);
                KarmaTally::degraded()
            }
        }
    }

    fn try_tally(
        &self,
        history: &dyn HistoryProvider,
        username: &str,
        scan_limit: usize,
    ) -> Result<KarmaTally, Fault> {
        let mut tally = KarmaTally::default();

        for stream in StreamKind::ALL {
            let items = history.get_history(username, stream, scan_limit)?;
            for item in items.iter().take(scan_limit) {
                tally.total_karma = tally.total_karma.saturating_add(item.score);
                if self.is_topic(&item.community) {
                    tally.topic_karma = tally.topic_karma.saturating_add(item.score);
                }
            }
        }

        Ok(tally)
    }
}
