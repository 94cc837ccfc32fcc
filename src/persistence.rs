//! Persistence of the cumulative energy state
//!
//! The state file holds one total and one marker:
//! `{"total": 12.5, "last_applied_end": "2024-01-01T00:30:00+09:00"}`.
//! Loading is lenient about how the total was written; saving replaces the
//! file atomically.

use crate::accumulator::{CumulativeEnergyAccumulator, CumulativeState};
use crate::error::{MeterError, Result};
use crate::logging::{StructuredLogger, get_logger};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Raw values read back from disk, before the accumulator interprets them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedValues {
    /// Total as text, whatever JSON type it was stored with
    pub total: Option<String>,
    pub last_applied_end: Option<String>,
}

/// File-backed store for [`CumulativeState`]
pub struct StateStore {
    file_path: PathBuf,
    logger: StructuredLogger,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            logger: get_logger("persistence"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read persisted values; `Ok(None)` when nothing has been saved yet
    pub fn load(&self) -> Result<Option<PersistedValues>> {
        if !self.file_path.exists() {
            self.logger
                .info("No persistent state file found, starting from zero");
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.file_path)?;
        let doc: Value = serde_json::from_str(&contents).map_err(|e| {
            MeterError::persistence(format!(
                "Corrupt state file {}: {e}",
                self.file_path.display()
            ))
        })?;

        let total = match doc.get("total") {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        let last_applied_end = doc
            .get("last_applied_end")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.logger.info("Loaded persistent state from disk");
        Ok(Some(PersistedValues {
            total,
            last_applied_end,
        }))
    }

    /// Build the accumulator from disk; unreadable state starts from zero
    pub fn restore_accumulator(&self) -> CumulativeEnergyAccumulator {
        match self.load() {
            Ok(Some(values)) => {
                CumulativeEnergyAccumulator::restore(values.total.as_deref(), values.last_applied_end)
            }
            Ok(None) => CumulativeEnergyAccumulator::restore(None, None),
            Err(e) => {
                self.logger
                    .error(&format!("Failed to load state, starting from zero: {e}"));
                CumulativeEnergyAccumulator::restore(None, None)
            }
        }
    }

    /// Write state via a temp file and rename
    pub fn save(&self, state: &CumulativeState) -> Result<()> {
        let contents = serde_json::to_string_pretty(&json!({
            "total": state.total,
            "last_applied_end": state.last_applied_end,
        }))?;

        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.file_path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.file_path)?;
        self.logger.debug("Saved persistent state to disk");

        Ok(())
    }
}
