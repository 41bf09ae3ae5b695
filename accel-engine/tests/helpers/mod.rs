//! In-memory collaborators with fault injection
//!
//! Shared by the engine integration tests.

#![allow(dead_code)]

use accel_common::config::AccelerationConfig;
use accel_engine::{
    Fault, HistoryItem, HistoryProvider, LabelStore, ModeratorNotifier, StreamKind,
};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Fixed reference time for deterministic tests
pub fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000, 0).unwrap()
}

/// Default config with a small topic set and a drain budget of `k`
pub fn config_with_budget(k: usize) -> AccelerationConfig {
    AccelerationConfig {
        topic_communities: vec!["accelerate".to_string(), "ProAI".to_string()],
        max_scans_per_cycle: k,
        ..AccelerationConfig::default()
    }
}

#[derive(Default)]
pub struct FakeHistory {
    users: RefCell<HashMap<String, HashMap<StreamKind, Vec<HistoryItem>>>>,
    failing: RefCell<HashSet<String>>,
    /// (username, stream, limit) of every call
    pub calls: RefCell<Vec<(String, StreamKind, usize)>>,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `username` one comment per (community, score)
    pub fn with_comments(self, username: &str, items: &[(&str, i64)]) -> Self {
        self.set_stream(username, StreamKind::Comments, items);
        self
    }

    pub fn set_stream(&self, username: &str, stream: StreamKind, items: &[(&str, i64)]) {
        self.users
            .borrow_mut()
            .entry(username.to_string())
            .or_default()
            .insert(
                stream,
                items.iter().map(|(c, s)| HistoryItem::new(c, *s)).collect(),
            );
    }

    pub fn fail_for(&self, username: &str) {
        self.failing.borrow_mut().insert(username.to_string());
    }

    pub fn heal(&self, username: &str) {
        self.failing.borrow_mut().remove(username);
    }

    pub fn calls_for(&self, username: &str) -> usize {
        self.calls.borrow().iter().filter(|(u, _, _)| u == username).count()
    }
}

impl HistoryProvider for FakeHistory {
    fn get_history(
        &self,
        username: &str,
        stream: StreamKind,
        limit: usize,
    ) -> Result<Vec<HistoryItem>, Fault> {
        self.calls
            .borrow_mut()
            .push((username.to_string(), stream, limit));
        if self.failing.borrow().contains(username) {
            return Err(Fault::aggregation(username, "simulated outage"));
        }
        Ok(self
            .users
            .borrow()
            .get(username)
            .and_then(|streams| streams.get(&stream))
            .map(|items| items.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeLabels {
    labels: RefCell<HashMap<String, String>>,
    failing: Cell<bool>,
    pub writes: Cell<usize>,
}

impl FakeLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(&self, username: &str, text: &str) {
        self.labels
            .borrow_mut()
            .insert(username.to_string(), text.to_string());
    }

    pub fn label(&self, username: &str) -> Option<String> {
        self.labels.borrow().get(username).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl LabelStore for FakeLabels {
    fn get_label(&self, username: &str) -> Result<Option<String>, Fault> {
        Ok(self.label(username))
    }

    fn set_label(&self, username: &str, text: Option<&str>) -> Result<(), Fault> {
        if self.failing.get() {
            return Err(Fault::label_write(username, "simulated write failure"));
        }
        self.writes.set(self.writes.get() + 1);
        let mut labels = self.labels.borrow_mut();
        match text {
            Some(text) => {
                labels.insert(username.to_string(), text.to_string());
            }
            None => {
                labels.remove(username);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub sent: RefCell<Vec<(String, String)>>,
    failing: Cell<bool>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl ModeratorNotifier for FakeNotifier {
    fn send_moderator_notice(&self, subject: &str, body: &str) -> Result<(), Fault> {
        if self.failing.get() {
            return Err(Fault::notification(subject, "simulated delivery failure"));
        }
        self.sent
            .borrow_mut()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
