//! Label composition
//!
//! A label is opaque text that may hold several pipe-delimited segments, only
//! one of which belongs to this engine: `Acceleration: <tier>`. The label is
//! split into trimmed segments, the acceleration segment is replaced, appended
//! or dropped, and the segments are joined back with `" | "`. Empty segments
//! (stray leading or trailing delimiters) are discarded.

use crate::collaborators::LabelStore;
use crate::error::Fault;
use tracing::debug;

/// Key of the segment owned by this engine
pub const LABEL_KEY: &str = "Acceleration";

const DELIMITER: char = '|';
const JOINER: &str = " | ";

/// Change to apply to a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelEdit<'a> {
    /// Set the acceleration segment to this tier name
    Set(&'a str),
    /// Strip the acceleration segment
    Remove,
}

/// Label text split into its segments
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segments(Vec<String>);

impl Segments {
    fn parse(label: &str) -> Self {
        Segments(
            label
                .split(DELIMITER)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    fn render(&self) -> String {
        self.0.join(JOINER)
    }
}

/// True for a segment of the form `Acceleration: <value>`
fn is_acceleration_segment(segment: &str) -> bool {
    segment
        .split_once(':')
        .map(|(key, _)| key.trim() == LABEL_KEY)
        .unwrap_or(false)
}

/// Segment text for a tier
pub fn acceleration_segment(tier: &str) -> String {
    format!("{}: {}", LABEL_KEY, tier)
}

/// Apply `edit` to `label`, returning the new label text
///
/// Setting replaces an existing acceleration segment in place, or appends one.
/// Removing strips every acceleration segment. An empty result means the
/// label should be cleared.
pub fn compose(label: &str, edit: LabelEdit<'_>) -> String {
    let mut segments = Segments::parse(label);

    match edit {
        LabelEdit::Remove => {
            segments.0.retain(|s| !is_acceleration_segment(s));
        }
        LabelEdit::Set(tier) => {
            let replacement = acceleration_segment(tier);
            match segments.0.iter().position(|s| is_acceleration_segment(s)) {
                Some(idx) => {
                    segments.0[idx] = replacement;
                    // Collapse duplicates left by hand edits
                    let mut seen = 0;
                    segments.0.retain(|s| {
                        if is_acceleration_segment(s) {
                            seen += 1;
                            seen == 1
                        } else {
                            true
                        }
                    });
                }
                None => segments.0.push(replacement),
            }
        }
    }

    segments.render()
}

/// Tier value carried by a label, if any
pub fn current_tier(label: &str) -> Option<String> {
    Segments::parse(label)
        .0
        .iter()
        .find(|s| is_acceleration_segment(s))
        .and_then(|s| s.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
}

/// Read the user's label, apply `edit`, and write it back
///
/// Returns the written text; `None` when the label was cleared.
pub fn apply_edit(
    labels: &dyn LabelStore,
    username: &str,
    edit: LabelEdit<'_>,
) -> Result<Option<String>, Fault> {
    let current = labels.get_label(username)?.unwrap_or_default();
    let updated = compose(&current, edit);
    let text = if updated.is_empty() {
        None
    } else {
        Some(updated)
    };

    labels.set_label(username, text.as_deref())?;
    debug!(username, label = ?text, "Label updated");
    Ok(text)
}
