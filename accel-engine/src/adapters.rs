//! File-backed collaborators
//!
//! Used by the `accel-engine` binary to run the engine against local data:
//! - `history.json`: username → `{ "comments": [...], "submissions": [...] }`
//!   where each item is `{ "community": "...", "score": n }`
//! - `labels.json`: username → label text
//! - `outbox.jsonl`: one JSON object per moderator notice
//!
//! Every call re-reads its file, so a file edited between calls is picked up
//! and I/O errors surface as the matching `Fault`.

use crate::collaborators::{
    HistoryItem, HistoryProvider, IntentClassifier, LabelStore, ModeratorNotifier, StreamKind,
};
use crate::engine::Intent;
use crate::error::Fault;
use accel_common::time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One user's recorded history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserHistory {
    pub comments: Vec<HistoryItem>,
    pub submissions: Vec<HistoryItem>,
}

impl UserHistory {
    fn stream(&self, stream: StreamKind) -> &[HistoryItem] {
        match stream {
            StreamKind::Comments => &self.comments,
            StreamKind::Submissions => &self.submissions,
        }
    }
}

/// History provider reading `history.json`
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryProvider for FileHistory {
    fn get_history(
        &self,
        username: &str,
        stream: StreamKind,
        limit: usize,
    ) -> Result<Vec<HistoryItem>, Fault> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Fault::aggregation(username, format!("{}: {}", self.path.display(), e)))?;
        let users: BTreeMap<String, UserHistory> = serde_json::from_str(&content)
            .map_err(|e| Fault::aggregation(username, format!("{}: {}", self.path.display(), e)))?;

        Ok(users
            .get(username)
            .map(|h| h.stream(stream).iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Label store persisted in `labels.json`
#[derive(Debug, Clone)]
pub struct FileLabelStore {
    path: PathBuf,
}

impl FileLabelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self, username: &str) -> Result<BTreeMap<String, String>, Fault> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Fault::label_write(username, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Fault::label_write(username, e.to_string()))
    }

    fn write_all(&self, username: &str, labels: &BTreeMap<String, String>) -> Result<(), Fault> {
        let json = serde_json::to_string_pretty(labels)
            .map_err(|e| Fault::label_write(username, e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Fault::label_write(username, e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Fault::label_write(username, e.to_string()))
    }
}

impl LabelStore for FileLabelStore {
    fn get_label(&self, username: &str) -> Result<Option<String>, Fault> {
        Ok(self.read_all(username)?.remove(username))
    }

    fn set_label(&self, username: &str, text: Option<&str>) -> Result<(), Fault> {
        let mut labels = self.read_all(username)?;
        match text {
            Some(text) => {
                labels.insert(username.to_string(), text.to_string());
            }
            None => {
                labels.remove(username);
            }
        }
        self.write_all(username, &labels)
    }
}

/// Notice as written to the outbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxNotice {
    pub sent_at: chrono::DateTime<chrono::Utc>,
    pub subject: String,
    pub body: String,
}

/// Moderator notifier appending to `outbox.jsonl`
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModeratorNotifier for OutboxNotifier {
    fn send_moderator_notice(&self, subject: &str, body: &str) -> Result<(), Fault> {
        let notice = OutboxNotice {
            sent_at: time::now(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let line = serde_json::to_string(&notice)
            .map_err(|e| Fault::notification(subject, e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Fault::notification(subject, e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| Fault::notification(subject, e.to_string()))
    }
}

/// Classifier for text that already is a classifier answer (`ON`, `OFF`, ...)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyClassifier;

impl IntentClassifier for ReplyClassifier {
    fn classify(&self, trigger_text: &str) -> Result<Intent, Fault> {
        Ok(Intent::from_reply(trigger_text))
    }
}

/// The three file-backed collaborators rooted in one data directory
#[derive(Debug, Clone)]
pub struct FileCollaborators {
    pub history: FileHistory,
    pub labels: FileLabelStore,
    pub notifier: OutboxNotifier,
}

impl FileCollaborators {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            history: FileHistory::new(data_dir.join("history.json")),
            labels: FileLabelStore::new(data_dir.join("labels.json")),
            notifier: OutboxNotifier::new(data_dir.join("outbox.jsonl")),
        }
    }
}
