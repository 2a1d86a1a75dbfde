//! Persistent coordinate cache keyed by normalized label and region geometry
//!
//! Storage schema:
//! ```json
//! {
//!   "ok": {
//!     "a3f01b72c0d9e455": { "cx": 843, "cy": 412, "hits": 7, "last_used": "2026-02-26T12:00:00Z" }
//!   }
//! }
//! ```

use super::atomic_write;
use crate::error::{MemoryError, MemoryResult};
use crate::region::{CaptureRegion, ScreenPoint};
use crate::text::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default bound on (label, region) entries across the whole file
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub cx: i32,
    pub cy: i32,
    pub hits: u32,
    pub last_used: DateTime<Utc>,
}

/// normalizedLabel -> regionHash -> entry
type EntryMap = BTreeMap<String, BTreeMap<String, MemoryEntry>>;

/// Call counters, reset per process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub hits: u64,
    pub misses: u64,
    pub saves: u64,
    pub invalidations: u64,
    pub evictions: u64,
}

pub struct CoordinateMemory {
    path: Option<PathBuf>,
    entries: EntryMap,
    max_entries: usize,
    stats: MemoryStats,
}

impl CoordinateMemory {
    /// Create a memory that lives only for this process
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            path: None,
            entries: EntryMap::new(),
            max_entries: max_entries.max(1),
            stats: MemoryStats::default(),
        }
    }

    /// Open (or start) a memory file. An unreadable or corrupt file is logged and
    /// replaced by an empty memory on the next write.
    pub fn open(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not load coordinate memory: {e}; starting fresh");
                EntryMap::new()
            }
        };
        log::debug!(
            "Coordinate memory opened at {:?} ({} entries)",
            path,
            entries.values().map(BTreeMap::len).sum::<usize>()
        );
        Self {
            path: Some(path),
            entries,
            max_entries: max_entries.max(1),
            stats: MemoryStats::default(),
        }
    }

    /// Cached coordinate for `label` recorded under this exact region geometry.
    ///
    /// An entry saved under a different geometry is treated as absent, never adapted.
    pub fn get(&mut self, label: &str, region: &CaptureRegion) -> Option<ScreenPoint> {
        let key = normalize(label);
        let hash = region.geometry_hash();
        let found = self
            .entries
            .get(&key)
            .and_then(|by_region| by_region.get(&hash))
            .map(|entry| ScreenPoint::new(entry.cx, entry.cy));

        match found {
            Some(point) => {
                self.stats.hits += 1;
                Some(point)
            }
            None => {
                if self.entries.contains_key(&key) {
                    log::debug!("Memory for '{key}' exists under another layout; ignoring");
                }
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Hit count of an entry, if present
    pub fn hits(&self, label: &str, region: &CaptureRegion) -> Option<u32> {
        self.entries
            .get(&normalize(label))
            .and_then(|by_region| by_region.get(&region.geometry_hash()))
            .map(|entry| entry.hits)
    }

    /// Record a validated coordinate, refreshing hits and timestamp
    pub fn save(&mut self, label: &str, region: &CaptureRegion, x: i32, y: i32) -> MemoryResult<()> {
        self.save_at(label, region, x, y, Utc::now())
    }

    /// [`Self::save`] with an explicit timestamp
    pub fn save_at(
        &mut self,
        label: &str,
        region: &CaptureRegion,
        x: i32,
        y: i32,
        now: DateTime<Utc>,
    ) -> MemoryResult<()> {
        let key = normalize(label);
        let hash = region.geometry_hash();
        self.stats.saves += 1;

        let by_region = self.entries.entry(key.clone()).or_default();
        let hits = by_region.get(&hash).map(|e| e.hits).unwrap_or(0) + 1;
        by_region.insert(
            hash.clone(),
            MemoryEntry {
                cx: x,
                cy: y,
                hits,
                last_used: now,
            },
        );
        log::debug!("Memory saved: '{}' [{}] -> ({}, {}) hits={}", key, &hash[..8], x, y, hits);

        self.evict();
        self.persist()
    }

    /// Drop the entry for this label under this region
    pub fn invalidate(&mut self, label: &str, region: &CaptureRegion) -> MemoryResult<()> {
        let key = normalize(label);
        let hash = region.geometry_hash();
        self.stats.invalidations += 1;

        let removed = match self.entries.get_mut(&key) {
            Some(by_region) => {
                let removed = by_region.remove(&hash).is_some();
                if by_region.is_empty() {
                    self.entries.remove(&key);
                }
                removed
            }
            None => false,
        };

        if removed {
            log::debug!("Memory invalidated: '{}' [{}]", key, &hash[..8]);
            self.persist()
        } else {
            Ok(())
        }
    }

    /// Drop every entry for this label, whatever the region. Returns how many were removed.
    pub fn forget(&mut self, label: &str) -> MemoryResult<usize> {
        match self.entries.remove(&normalize(label)) {
            Some(by_region) => {
                self.persist()?;
                Ok(by_region.len())
            }
            None => Ok(0),
        }
    }

    /// Number of (label, region) entries
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> MemoryResult<()> {
        self.entries.clear();
        self.persist()
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Least-recently-used eviction across all labels and regions.
    ///
    /// Oldest `last_used` goes first; equal timestamps fall back to (label, hash) order
    /// so the outcome never depends on map iteration details.
    fn evict(&mut self) {
        let total = self.len();
        if total <= self.max_entries {
            return;
        }

        let mut all: Vec<(DateTime<Utc>, String, String)> = self
            .entries
            .iter()
            .flat_map(|(label, by_region)| {
                by_region
                    .iter()
                    .map(move |(hash, e)| (e.last_used, label.clone(), hash.clone()))
            })
            .collect();
        all.sort();

        for (_, label, hash) in all.into_iter().take(total - self.max_entries) {
            if let Some(by_region) = self.entries.get_mut(&label) {
                by_region.remove(&hash);
                if by_region.is_empty() {
                    self.entries.remove(&label);
                }
            }
            self.stats.evictions += 1;
            log::debug!("Memory evicted: '{label}' [{}]", &hash[..hash.len().min(8)]);
        }
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

fn load_entries(path: &Path) -> MemoryResult<EntryMap> {
    if !path.exists() {
        return Ok(EntryMap::new());
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
