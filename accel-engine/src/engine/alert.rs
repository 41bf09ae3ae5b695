//! Moderator alerts
//!
//! At most one alert per user while the user stays in the bounded
//! `AlertedSet`. A failed notice leaves the user unmarked so the next
//! threshold crossing retries.

use super::core::AccelerationEngine;
use accel_common::state::EngineState;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What happened when an alert was considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertOutcome {
    /// Topic karma not below the threshold
    NotNegative,
    /// User already alerted
    Suppressed,
    /// Notice delivered and user recorded
    Sent,
    /// Dry run: user recorded, nothing delivered
    Recorded,
    /// Delivery failed, user not recorded
    Failed,
}

/// Subject and body of a negative-affinity notice
pub fn compose_alert<S: AsRef<str>>(
    username: &str,
    score: i64,
    topic_communities: &[S],
) -> (String, String) {
    let communities: Vec<&str> = topic_communities.iter().map(|c| c.as_ref()).collect();
    let subject = format!("Negative Acceleration Alert: u/{}", username);
    let body = format!(
        "User **u/{}** has **{}** net karma across the topic communities.\n\n\
         **Communities scanned:** {}\n\n\
         This user may be a bad actor. Consider reviewing their activity.\n\n\
         ---\n*Automated alert*",
        username,
        score,
        communities.join(", ")
    );
    (subject, body)
}

impl AccelerationEngine<'_> {
    /// Alert moderators once if `topic_karma` is below the threshold
    pub fn alert_if_negative(
        &self,
        state: &mut EngineState,
        username: &str,
        topic_karma: i64,
    ) -> AlertOutcome {
        if topic_karma >= self.config.alert_threshold {
            return AlertOutcome::NotNegative;
        }
        if state.alerted_users.contains(username) {
            debug!(username, "Already alerted, suppressing");
            return AlertOutcome::Suppressed;
        }

        if self.config.dry_run {
            state.alerted_users.insert(username);
            info!(username, topic_karma, "Dry run: alert recorded, not sent");
            return AlertOutcome::Recorded;
        }

        let (subject, body) = compose_alert(username, topic_karma, &self.config.topic_communities);
        match self.notifier.send_moderator_notice(&subject, &body) {
            Ok(()) => {
                state.alerted_users.insert(username);
                info!(username, topic_karma, "Sent moderator alert");
                AlertOutcome::Sent
            }
            Err(fault) => {
                warn!(username, "Moderator alert failed, will retry on next crossing: {}", fault);
                AlertOutcome::Failed
            }
        }
    }
}
