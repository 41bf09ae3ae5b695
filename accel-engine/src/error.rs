//! Collaborator fault types
//!
//! Every collaborator operation returns `Result<_, Fault>`. The variants are
//! the complete set of fault categories the engine handles; none of them is
//! fatal to a cycle.

use thiserror::Error;

/// A failed call to an external collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// History read failed mid-scan; the partial tally is discarded
    #[error("History read failed for u/{username}: {reason}")]
    Aggregation { username: String, reason: String },

    /// Label read or write failed; registry and label may now diverge
    #[error("Label write failed for u/{username}: {reason}")]
    LabelWrite { username: String, reason: String },

    /// Moderator notice could not be delivered
    #[error("Moderator notice '{subject}' failed: {reason}")]
    Notification { subject: String, reason: String },

    /// Intent classifier failed; treated as no intent
    #[error("Intent classification failed: {reason}")]
    Classification { reason: String },
}

impl Fault {
    pub fn aggregation(username: &str, reason: impl Into<String>) -> Self {
        Fault::Aggregation {
            username: username.to_string(),
            reason: reason.into(),
        }
    }

    pub fn label_write(username: &str, reason: impl Into<String>) -> Self {
        Fault::LabelWrite {
            username: username.to_string(),
            reason: reason.into(),
        }
    }

    pub fn notification(subject: &str, reason: impl Into<String>) -> Self {
        Fault::Notification {
            subject: subject.to_string(),
            reason: reason.into(),
        }
    }

    pub fn classification(reason: impl Into<String>) -> Self {
        Fault::Classification {
            reason: reason.into(),
        }
    }
}
