//! External collaborator capabilities
//!
//! The engine never talks to the network or disk directly. History reads,
//! label writes and moderator notices go through these traits; every call is
//! synchronous and fallible.

use crate::engine::Intent;
use crate::error::Fault;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Independently paginated content streams of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Comments,
    Submissions,
}

impl StreamKind {
    /// Scan order used by the aggregator
    pub const ALL: [StreamKind; 2] = [StreamKind::Comments, StreamKind::Submissions];
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Comments => write!(f, "comments"),
            StreamKind::Submissions => write!(f, "submissions"),
        }
    }
}

/// One scored item from a user's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Community the item was posted in
    pub community: String,
    /// Net score of the item
    pub score: i64,
}

impl HistoryItem {
    pub fn new(community: &str, score: i64) -> Self {
        Self {
            community: community.to_string(),
            score,
        }
    }
}

/// Read access to a user's scored history
pub trait HistoryProvider {
    /// Newest-first items of one stream, at most `limit` of them
    fn get_history(
        &self,
        username: &str,
        stream: StreamKind,
        limit: usize,
    ) -> Result<Vec<HistoryItem>, Fault>;
}

/// The user-facing label attached to a user within the community
pub trait LabelStore {
    /// Current label text, `None` when the user has no label
    fn get_label(&self, username: &str) -> Result<Option<String>, Fault>;

    /// Replace the label; `None` clears it entirely
    fn set_label(&self, username: &str, text: Option<&str>) -> Result<(), Fault>;
}

/// Delivery of notices to the moderator team
pub trait ModeratorNotifier {
    fn send_moderator_notice(&self, subject: &str, body: &str) -> Result<(), Fault>;
}

/// Classifies the text of a triggering event into an intent
pub trait IntentClassifier {
    fn classify(&self, trigger_text: &str) -> Result<Intent, Fault>;
}
