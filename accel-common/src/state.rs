//! Persisted engine state
//!
//! One explicit, versioned aggregate that is loaded at cycle start, mutated in
//! place during the cycle, and saved at cycle end. Every field has a default so
//! an empty or older state file deserializes without presence checks.
//!
//! **Bounds:**
//! - `scan_queue`: 500 usernames, overflow keeps the most recently added
//! - `scanned_users`: 2000 records, oldest `last_scanned` evicted first
//! - `alerted_users`: 500 usernames, oldest evicted first

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Current state schema version
pub const STATE_VERSION: u32 = 1;

/// Max usernames waiting for a background scan
pub const SCAN_QUEUE_CAPACITY: usize = 500;

/// Max background scan records retained
pub const SCANNED_USERS_CAPACITY: usize = 2000;

/// Max usernames remembered as already alerted
pub const ALERTED_USERS_CAPACITY: usize = 500;

/// Affinity record for a user who opted in to the label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAffinityRecord {
    pub username: String,
    pub enabled: bool,
    /// When topic/total karma were last computed
    pub last_calculated: DateTime<Utc>,
    pub topic_karma: i64,
    pub total_karma: i64,
    /// topic_karma / total_karma, clamped to [0, 1]
    pub ratio: f64,
    pub tier: String,
}

/// Result of the most recent passive scan of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundScanRecord {
    pub username: String,
    pub last_scanned: DateTime<Utc>,
    pub topic_karma: i64,
}

/// Ordered, deduplicated FIFO of usernames awaiting a background scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanQueue {
    entries: VecDeque<String>,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a username unless it is already queued
    ///
    /// Returns true if the queue grew. Overflow beyond capacity drops the
    /// oldest entries so the most recent `SCAN_QUEUE_CAPACITY` remain.
    pub fn push(&mut self, username: &str) -> bool {
        if self.contains(username) {
            return false;
        }
        self.entries.push_back(username.to_string());
        self.truncate_to_capacity();
        true
    }

    /// Take the oldest queued username
    pub fn pop_front(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    /// Drop a queued username; returns true if it was queued
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|u| u != username);
        self.entries.len() != before
    }

    pub fn contains(&self, username: &str) -> bool {
        self.entries.iter().any(|u| u == username)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued usernames, front first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Dedupe (latest position wins) and re-apply the capacity
    fn normalize(&mut self) {
        dedupe_keep_last(&mut self.entries);
        self.truncate_to_capacity();
    }

    fn truncate_to_capacity(&mut self) {
        if self.entries.len() > SCAN_QUEUE_CAPACITY {
            let excess = self.entries.len() - SCAN_QUEUE_CAPACITY;
            self.entries.drain(..excess);
        }
    }
}

/// Usernames that already triggered a negative-affinity alert
///
/// Bounded; once a name is evicted it may be alerted again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertedSet {
    names: VecDeque<String>,
}

impl AlertedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.names.iter().any(|u| u == username)
    }

    /// Record a username, evicting the oldest past capacity
    ///
    /// Returns false if it was already present.
    pub fn insert(&mut self, username: &str) -> bool {
        if self.contains(username) {
            return false;
        }
        self.names.push_back(username.to_string());
        self.truncate_to_capacity();
        true
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn normalize(&mut self) {
        dedupe_keep_last(&mut self.names);
        self.truncate_to_capacity();
    }

    fn truncate_to_capacity(&mut self) {
        if self.names.len() > ALERTED_USERS_CAPACITY {
            let excess = self.names.len() - ALERTED_USERS_CAPACITY;
            self.names.drain(..excess);
        }
    }
}

/// Drop earlier duplicates, keeping each name at its last position
fn dedupe_keep_last(names: &mut VecDeque<String>) {
    let mut seen = HashSet::new();
    let mut kept: Vec<String> = names
        .drain(..)
        .rev()
        .filter(|name| seen.insert(name.clone()))
        .collect();
    kept.reverse();
    *names = kept.into();
}

/// Background scan records keyed by username
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanLedger {
    records: BTreeMap<String, BackgroundScanRecord>,
}

impl ScanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&BackgroundScanRecord> {
        self.records.get(username)
    }

    /// Insert or overwrite a record, evicting the stalest past capacity
    pub fn record(&mut self, record: BackgroundScanRecord) {
        self.records.insert(record.username.clone(), record);
        self.truncate_to_capacity();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn truncate_to_capacity(&mut self) {
        if self.records.len() <= SCANNED_USERS_CAPACITY {
            return;
        }
        let mut by_age: Vec<(DateTime<Utc>, String)> = self
            .records
            .values()
            .map(|r| (r.last_scanned, r.username.clone()))
            .collect();
        by_age.sort();
        let excess = self.records.len() - SCANNED_USERS_CAPACITY;
        for (_, username) in by_age.into_iter().take(excess) {
            self.records.remove(&username);
        }
    }
}

/// Full engine state, persisted between cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineState {
    /// Schema version of the persisted document
    pub version: u32,

    /// Opt-in registry
    pub opted_in_users: BTreeMap<String, UserAffinityRecord>,

    /// Passive scan results
    pub scanned_users: ScanLedger,

    /// Users already reported to moderators
    pub alerted_users: AlertedSet,

    /// Users awaiting a passive scan
    pub scan_queue: ScanQueue,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            opted_in_users: BTreeMap::new(),
            scanned_users: ScanLedger::new(),
            alerted_users: AlertedSet::new(),
            scan_queue: ScanQueue::new(),
        }
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sole test of opted-in status
    pub fn is_opted_in(&self, username: &str) -> bool {
        self.opted_in_users.contains_key(username)
    }

    pub fn opted_in(&self, username: &str) -> Option<&UserAffinityRecord> {
        self.opted_in_users.get(username)
    }

    /// Create or overwrite the registry entry for `record.username`
    pub fn upsert_opt_in(&mut self, record: UserAffinityRecord) {
        self.opted_in_users.insert(record.username.clone(), record);
    }

    pub fn remove_opt_in(&mut self, username: &str) -> Option<UserAffinityRecord> {
        self.opted_in_users.remove(username)
    }

    /// Re-apply container invariants (state files may have been edited by hand)
    pub fn enforce_bounds(&mut self) {
        self.scan_queue.normalize();
        self.alerted_users.normalize();
        self.scanned_users.truncate_to_capacity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn scan(username: &str, secs: i64) -> BackgroundScanRecord {
        BackgroundScanRecord {
            username: username.to_string(),
            last_scanned: at(secs),
            topic_karma: 0,
        }
    }

    #[test]
    fn test_queue_push_deduplicates() {
        let mut queue = ScanQueue::new();
        assert!(queue.push("alice"));
        assert!(!queue.push("alice"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_queue_fifo_order() {
        let mut queue = ScanQueue::new();
        queue.push("a");
        queue.push("b");
        queue.push("c");
        assert_eq!(queue.pop_front().as_deref(), Some("a"));
        assert_eq!(queue.pop_front().as_deref(), Some("b"));
        assert_eq!(queue.pop_front().as_deref(), Some("c"));
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_queue_overflow_keeps_most_recent() {
        let mut queue = ScanQueue::new();
        for i in 0..(SCAN_QUEUE_CAPACITY + 25) {
            queue.push(&format!("user{}", i));
        }
        assert_eq!(queue.len(), SCAN_QUEUE_CAPACITY);
        assert_eq!(queue.iter().next(), Some("user25"));
        assert!(!queue.contains("user24"));
        assert!(queue.contains(&format!("user{}", SCAN_QUEUE_CAPACITY + 24)));
    }

    #[test]
    fn test_queue_remove() {
        let mut queue = ScanQueue::new();
        queue.push("a");
        queue.push("b");
        assert!(queue.remove("a"));
        assert!(!queue.remove("a"));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_alerted_set_evicts_oldest() {
        let mut alerted = AlertedSet::new();
        for i in 0..=ALERTED_USERS_CAPACITY {
            alerted.insert(&format!("user{}", i));
        }
        assert_eq!(alerted.len(), ALERTED_USERS_CAPACITY);
        assert!(!alerted.contains("user0"));
        assert!(alerted.contains("user1"));
    }

    #[test]
    fn test_alerted_set_insert_is_idempotent() {
        let mut alerted = AlertedSet::new();
        assert!(alerted.insert("bob"));
        assert!(!alerted.insert("bob"));
        assert_eq!(alerted.len(), 1);
    }

    #[test]
    fn test_ledger_evicts_oldest_scan() {
        let mut ledger = ScanLedger::new();
        for i in 0..SCANNED_USERS_CAPACITY as i64 {
            ledger.record(scan(&format!("user{}", i), 1_000 + i));
        }
        ledger.record(scan("newest", 1_000_000));
        assert_eq!(ledger.len(), SCANNED_USERS_CAPACITY);
        assert!(ledger.get("user0").is_none());
        assert!(ledger.get("user1").is_some());
        assert!(ledger.get("newest").is_some());
    }

    #[test]
    fn test_ledger_overwrite_does_not_grow() {
        let mut ledger = ScanLedger::new();
        ledger.record(scan("carol", 10));
        ledger.record(scan("carol", 20));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("carol").unwrap().last_scanned, at(20));
    }

    #[test]
    fn test_empty_document_deserializes_to_default() {
        let state: EngineState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, EngineState::default());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_bounds_enforced_after_load() {
        let names: Vec<String> = (0..600).map(|i| format!("u{}", i)).collect();
        let json = serde_json::json!({ "scan_queue": names, "alerted_users": names });
        let mut state: EngineState = serde_json::from_value(json).unwrap();
        state.enforce_bounds();
        assert_eq!(state.scan_queue.len(), SCAN_QUEUE_CAPACITY);
        assert_eq!(state.alerted_users.len(), ALERTED_USERS_CAPACITY);
        assert_eq!(state.scan_queue.iter().next(), Some("u100"));
    }

    #[test]
    fn test_duplicates_collapse_to_last_occurrence() {
        let json = serde_json::json!({
            "scan_queue": ["a", "b", "a", "c"],
            "alerted_users": ["x", "x", "y"]
        });
        let mut state: EngineState = serde_json::from_value(json).unwrap();
        state.enforce_bounds();
        assert_eq!(state.scan_queue.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(state.alerted_users.len(), 2);
        assert!(!state.scan_queue.push("a"));
    }

    #[test]
    fn test_opt_in_roundtrip() {
        let mut state = EngineState::new();
        state.upsert_opt_in(UserAffinityRecord {
            username: "dave".to_string(),
            enabled: true,
            last_calculated: at(100),
            topic_karma: 10,
            total_karma: 20,
            ratio: 0.5,
            tier: "Supersonic".to_string(),
        });
        assert!(state.is_opted_in("dave"));
        assert_eq!(state.opted_in("dave").unwrap().tier, "Supersonic");
        assert!(state.remove_opt_in("dave").is_some());
        assert!(!state.is_opted_in("dave"));
    }
}
