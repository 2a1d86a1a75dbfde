//! Success ledger: how often clicking a given candidate text for a given label worked
//!
//! Storage schema: `{ "<label>": { "<candidate text>": { "successes": 3, "failures": 1 } } }`

use super::atomic_write;
use crate::error::{MemoryError, MemoryResult};
use crate::ranking::SuccessHistory;
use crate::text::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub successes: u32,
    pub failures: u32,
}

impl LedgerEntry {
    pub fn attempts(&self) -> u32 {
        self.successes + self.failures
    }

    pub fn rate(&self) -> Option<f64> {
        match self.attempts() {
            0 => None,
            n => Some(self.successes as f64 / n as f64),
        }
    }
}

type LedgerMap = BTreeMap<String, BTreeMap<String, LedgerEntry>>;

pub struct SuccessLedger {
    path: Option<PathBuf>,
    entries: LedgerMap,
}

impl SuccessLedger {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: LedgerMap::new(),
        }
    }

    /// Open (or start) a ledger file; a corrupt file is logged and ignored
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not load success ledger: {e}; starting fresh");
                LedgerMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn record_success(&mut self, label: &str, candidate: &str) -> MemoryResult<()> {
        self.entry_mut(label, candidate).successes += 1;
        self.persist()
    }

    pub fn record_failure(&mut self, label: &str, candidate: &str) -> MemoryResult<()> {
        self.entry_mut(label, candidate).failures += 1;
        self.persist()
    }

    pub fn get(&self, label: &str, candidate: &str) -> Option<LedgerEntry> {
        self.entries
            .get(&normalize(label))
            .and_then(|by_text| by_text.get(&normalize(candidate)))
            .copied()
    }

    pub fn forget(&mut self, label: &str) -> MemoryResult<()> {
        if self.entries.remove(&normalize(label)).is_some() {
            self.persist()
        } else {
            Ok(())
        }
    }

    fn entry_mut(&mut self, label: &str, candidate: &str) -> &mut LedgerEntry {
        self.entries
            .entry(normalize(label))
            .or_default()
            .entry(normalize(candidate))
            .or_default()
    }

    fn persist(&self) -> MemoryResult<()> {
        match &self.path {
            Some(path) => {
                let json = serde_json::to_vec_pretty(&self.entries)?;
                atomic_write(path, &json)
            }
            None => Ok(()),
        }
    }
}

impl SuccessHistory for SuccessLedger {
    fn success_rate(&self, label: &str, candidate: &str) -> Option<f64> {
        self.get(label, candidate).and_then(|entry| entry.rate())
    }
}

fn load(path: &Path) -> MemoryResult<LedgerMap> {
    if !path.exists() {
        return Ok(LedgerMap::new());
    }
    let bytes = std::fs::read(path).map_err(|source| MemoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| MemoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
