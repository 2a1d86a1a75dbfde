use super::*;
use crate::ranking::SuccessHistory;
use crate::region::{CaptureRegion, ScreenPoint};
use chrono::{Duration, TimeZone, Utc};

fn region() -> CaptureRegion {
    CaptureRegion::new(0, 0, 1920, 1080)
}

#[test]
fn test_save_then_get_round_trips_through_normalization() {
    let mut memory = CoordinateMemory::in_memory(DEFAULT_MAX_ENTRIES);
    memory.save("0K", &region(), 843, 412).unwrap();

    assert_eq!(memory.get("ok", &region()), Some(ScreenPoint::new(843, 412)));
    assert_eq!(memory.get("  OK ", &region()), Some(ScreenPoint::new(843, 412)));
    assert_eq!(memory.stats().hits, 2);
}

#[test]
fn test_different_geometry_is_absent() {
    let mut memory = CoordinateMemory::in_memory(DEFAULT_MAX_ENTRIES);
    memory.save("Submit", &region(), 10, 10).unwrap();

    let moved = CaptureRegion::new(5, 0, 1920, 1080);
    assert_eq!(memory.get("Submit", &moved), None);
    let resized = CaptureRegion::new(0, 0, 1280, 1080);
    assert_eq!(memory.get("Submit", &resized), None);
    assert_eq!(memory.stats().misses, 2);
    // Never repaired: the original entry is untouched
    assert_eq!(memory.len(), 1);
}

#[test]
fn test_invalidate_then_get_is_absent() {
    let mut memory = CoordinateMemory::in_memory(DEFAULT_MAX_ENTRIES);
    memory.save("Cancel", &region(), 1, 2).unwrap();
    memory.invalidate("cancel", &region()).unwrap();

    assert_eq!(memory.get("Cancel", &region()), None);
    assert!(memory.is_empty());
    // Invalidating a missing entry is a no-op
    memory.invalidate("cancel", &region()).unwrap();
    assert_eq!(memory.stats().invalidations, 2);
}

#[test]
fn test_repeat_save_increments_hits() {
    let mut memory = CoordinateMemory::in_memory(DEFAULT_MAX_ENTRIES);
    memory.save("Apply", &region(), 1, 1).unwrap();
    memory.save("Apply", &region(), 3, 4).unwrap();

    assert_eq!(memory.hits("apply", &region()), Some(2));
    assert_eq!(memory.get("apply", &region()), Some(ScreenPoint::new(3, 4)));
}

#[test]
fn test_lru_eviction_drops_oldest_first() {
    let mut memory = CoordinateMemory::in_memory(2);
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    memory.save_at("first", &region(), 1, 1, t0).unwrap();
    memory
        .save_at("second", &region(), 2, 2, t0 + Duration::seconds(1))
        .unwrap();
    // Refresh "first" so "second" becomes the oldest
    memory
        .save_at("first", &region(), 1, 1, t0 + Duration::seconds(2))
        .unwrap();
    memory
        .save_at("third", &region(), 3, 3, t0 + Duration::seconds(3))
        .unwrap();

    assert_eq!(memory.len(), 2);
    assert!(memory.get("second", &region()).is_none());
    assert!(memory.get("first", &region()).is_some());
    assert!(memory.get("third", &region()).is_some());
    assert_eq!(memory.stats().evictions, 1);
}

#[test]
fn test_eviction_ties_break_by_label() {
    let mut memory = CoordinateMemory::in_memory(1);
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    memory.save_at("beta", &region(), 1, 1, t0).unwrap();
    memory.save_at("alpha", &region(), 2, 2, t0).unwrap();

    assert!(memory.get("alpha", &region()).is_none());
    assert!(memory.get("beta", &region()).is_some());
}

#[test]
fn test_memory_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("memory.json");

    {
        let mut memory = CoordinateMemory::open(&path, DEFAULT_MAX_ENTRIES);
        memory.save("Login", &region(), 640, 360).unwrap();
    }
    assert!(path.exists());
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    assert!(!std::path::Path::new(&tmp).exists());

    let mut reopened = CoordinateMemory::open(&path, DEFAULT_MAX_ENTRIES);
    assert_eq!(reopened.get("login", &region()), Some(ScreenPoint::new(640, 360)));

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let entry = &raw["login"][region().geometry_hash()];
    assert_eq!(entry["cx"], 640);
    assert_eq!(entry["hits"], 1);
}

#[test]
fn test_corrupt_memory_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let mut memory = CoordinateMemory::open(&path, DEFAULT_MAX_ENTRIES);
    assert!(memory.is_empty());
    memory.save("ok", &region(), 1, 1).unwrap();

    let reopened = CoordinateMemory::open(&path, DEFAULT_MAX_ENTRIES);
    assert_eq!(reopened.len(), 1);
}

#[test]
fn test_forget_removes_all_regions_of_a_label() {
    let mut memory = CoordinateMemory::in_memory(DEFAULT_MAX_ENTRIES);
    memory.save("ok", &region(), 1, 1).unwrap();
    memory
        .save("ok", &CaptureRegion::new(0, 0, 800, 600), 2, 2)
        .unwrap();
    memory.save("cancel", &region(), 3, 3).unwrap();

    assert_eq!(memory.forget("OK").unwrap(), 2);
    assert_eq!(memory.forget("OK").unwrap(), 0);
    assert_eq!(memory.len(), 1);
}

#[test]
fn test_ledger_rates_and_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let mut ledger = SuccessLedger::open(&path);
    assert_eq!(ledger.success_rate("save", "save"), None);

    ledger.record_success("Save", "Save").unwrap();
    ledger.record_success("Save", "Save").unwrap();
    ledger.record_failure("Save", "Save").unwrap();
    ledger.record_success("Save", "5ave").unwrap();

    let entry = ledger.get("save", "save").unwrap();
    // "5ave" normalizes to "save" and shares the counters
    assert_eq!(entry, LedgerEntry { successes: 3, failures: 1 });

    let reopened = SuccessLedger::open(&path);
    assert_eq!(reopened.success_rate("save", "save"), Some(0.75));
}

#[test]
fn test_ledger_forget_label() {
    let mut ledger = SuccessLedger::in_memory();
    ledger.record_failure("Close", "Close").unwrap();
    ledger.forget("close").unwrap();
    assert!(ledger.get("close", "close").is_none());
}
