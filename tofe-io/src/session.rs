//! Per-session analysis state, keyed by measurement name.
//!
//! Remembers which cut files and selection file each measurement used
//! last, so reopening a session restores the previous analysis setup.
//! The store is plain data passed explicitly to whoever needs it; it is
//! persisted as JSON next to the request.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Remembered state of one measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSession {
    /// Selection file used last, relative to the measurement directory.
    pub selection_file: Option<String>,
    /// Cut files checked in the last analysis.
    pub checked_cuts: Vec<String>,
    /// Reference cut of the last element-loss run.
    pub reference_cut: Option<String>,
}

/// All measurement sessions of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStore {
    sessions: BTreeMap<String, MeasurementSession>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from `path`; a missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable files or invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Persists the store as pretty JSON.
    ///
    /// # Errors
    ///
    /// Propagates filesystem and serialization errors.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The session of `measurement`, if it has one.
    #[must_use]
    pub fn get(&self, measurement: &str) -> Option<&MeasurementSession> {
        self.sessions.get(measurement)
    }

    /// Mutable session of `measurement`, created empty when absent.
    pub fn entry(&mut self, measurement: &str) -> &mut MeasurementSession {
        self.sessions.entry(measurement.to_string()).or_default()
    }

    /// Forgets the session of `measurement`.
    pub fn remove(&mut self, measurement: &str) {
        self.sessions.remove(measurement);
    }
}
