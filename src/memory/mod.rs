/// Persistent state surviving across resolution calls
///
/// - `store`: validated coordinates per (label, region geometry)
/// - `ledger`: success/failure counters per (label, candidate text), feeding the ranker
pub mod ledger;
pub mod store;

#[cfg(test)]
mod tests;

pub use ledger::{LedgerEntry, SuccessLedger};
pub use store::{CoordinateMemory, DEFAULT_MAX_ENTRIES, MemoryEntry, MemoryStats};

use crate::error::{MemoryError, MemoryResult};
use std::path::Path;

/// Write `bytes` to a sibling temp file, then rename it over `path`.
///
/// Readers never observe a half-written file; a crash leaves either the old or the new
/// content.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> MemoryResult<()> {
    let write_err = |source| MemoryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, bytes).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)
}
