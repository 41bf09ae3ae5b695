//! Command dispatch for a single user-triggered event
//!
//! Intents:
//! - `Enable`: evaluate, upsert the registry, set the label
//! - `Disable`: delete from the registry, strip the label
//! - `Inspect`: evaluate only, report whether the label is active
//! - `None`: no-op
//!
//! After `Enable` and `Inspect` a negative topic score alerts moderators once,
//! whether or not the user is enrolled.

use super::core::{AccelerationEngine, Evaluation};
use crate::collaborators::IntentClassifier;
use accel_common::state::EngineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Pre-classified intent of a triggering event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Enable,
    Disable,
    Inspect,
    None,
}

impl Intent {
    /// Map a classifier's one-word answer (`ON` / `OFF` / `CHECK`) to an intent
    ///
    /// Anything else, including `NONE`, is no intent.
    pub fn from_reply(reply: &str) -> Self {
        match reply.trim().to_uppercase().as_str() {
            "ON" => Intent::Enable,
            "OFF" => Intent::Disable,
            "CHECK" => Intent::Inspect,
            _ => Intent::None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Enable => write!(f, "enable"),
            Intent::Disable => write!(f, "disable"),
            Intent::Inspect => write!(f, "inspect"),
            Intent::None => write!(f, "none"),
        }
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enable" | "on" => Ok(Intent::Enable),
            "disable" | "off" => Ok(Intent::Disable),
            "inspect" | "check" => Ok(Intent::Inspect),
            "none" => Ok(Intent::None),
            other => Err(format!("unknown intent '{}'", other)),
        }
    }
}

/// One user-triggered event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEvent<'e> {
    /// Author of the triggering event; deleted authors are `None`
    pub author: Option<&'e str>,
    pub intent: Intent,
}

impl<'e> CommandEvent<'e> {
    pub fn new(author: &'e str, intent: Intent) -> Self {
        Self {
            author: Some(author),
            intent,
        }
    }
}

fn enabled_reply(evaluation: &Evaluation) -> String {
    format!(
        "Your Acceleration flair is now active! 🚀\n\n\
         **Focus:** {}% of your karma is from the topic communities\n\
         **Tier:** {}\n\n\
         Your flair will update weekly. To turn it off, just ask me!",
        evaluation.percent(),
        evaluation.tier
    )
}

fn status_reply(evaluation: &Evaluation, active: bool) -> String {
    let status = if active {
        "Your flair is active!"
    } else {
        "Your flair is not active. Ask me to turn it on!"
    };
    format!(
        "Here's your Acceleration status:\n\n\
         **Focus:** {}% of your karma is from the topic communities\n\
         **Tier:** {}\n\n\
         {}",
        evaluation.percent(),
        evaluation.tier,
        status
    )
}

const DISABLED_REPLY: &str = "Done! I've removed your Acceleration flair. \
     You can turn it back on anytime by asking me. 🚀";

impl AccelerationEngine<'_> {
    /// Run one event; returns the reply text, or `None` when nothing was done
    pub fn handle_command(
        &self,
        state: &mut EngineState,
        event: CommandEvent<'_>,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        let username = event.author?;
        debug!(username, intent = %event.intent, "Handling command");

        match event.intent {
            Intent::None => None,
            Intent::Disable => {
                self.disable_user(state, username);
                Some(DISABLED_REPLY.to_string())
            }
            Intent::Enable => {
                let evaluation = self.enable_user(state, username, now);
                self.alert_if_negative(state, username, evaluation.tally.topic_karma);
                Some(enabled_reply(&evaluation))
            }
            Intent::Inspect => {
                let evaluation = self.evaluate(username, self.config.scan_limit);
                let active = state.is_opted_in(username);
                self.alert_if_negative(state, username, evaluation.tally.topic_karma);
                Some(status_reply(&evaluation, active))
            }
        }
    }

    /// Classify the event text, then dispatch
    ///
    /// A classifier fault is treated as no intent.
    pub fn classify_and_handle(
        &self,
        state: &mut EngineState,
        classifier: &dyn IntentClassifier,
        author: Option<&str>,
        trigger_text: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        let intent = match classifier.classify(trigger_text) {
            Ok(intent) => intent,
            Err(fault) => {
                warn!("Intent classification failed, ignoring event: {}", fault);
                Intent::None
            }
        };
        self.handle_command(state, CommandEvent { author, intent }, now)
    }
}
