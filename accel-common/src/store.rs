//! JSON state store
//!
//! Loads `EngineState` at cycle start and saves it at cycle end. Saves are
//! atomic: the document is written to `<path>.tmp` and renamed over the target.

use crate::state::{EngineState, STATE_VERSION};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed persistence for engine state
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state, or a fresh default when the file does not exist yet
    pub fn load(&self) -> Result<EngineState> {
        if !self.path.exists() {
            info!("No state file at {}, starting fresh", self.path.display());
            return Ok(EngineState::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut state: EngineState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(Error::InvalidInput(format!(
                "state file {} has version {}, newer than supported {}",
                self.path.display(),
                state.version,
                STATE_VERSION
            )));
        }
        state.version = STATE_VERSION;
        state.enforce_bounds();

        debug!(
            opted_in = state.opted_in_users.len(),
            scanned = state.scanned_users.len(),
            alerted = state.alerted_users.len(),
            queued = state.scan_queue.len(),
            "Loaded state from {}",
            self.path.display()
        );
        Ok(state)
    }

    /// Save state atomically
    pub fn save(&self, state: &EngineState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
