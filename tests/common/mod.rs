//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use filerouter_core::{ObjectEvent, RouterConfig};
use filerouter_mover::{FixedClock, RouterHandler};
use filerouter_store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

pub const CONFIG_BUCKET: &str = "cfg";
pub const CONFIG_KEY: &str = "config/routing-rules.json";

/// Get the path to test fixtures
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

/// Load the fixture rules document
pub fn rules_document() -> String {
    let path = fixtures_dir().join("routing-rules.json");
    std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read rules fixture from {:?}", path))
}

/// Load the fixture notification batch
pub fn event_payload() -> String {
    let path = fixtures_dir().join("event.json");
    std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read event fixture from {:?}", path))
}

/// Instant used by every fixed clock in the integration tests
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 1).unwrap()
}

pub fn config_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

pub fn router_config() -> RouterConfig {
    RouterConfig {
        config_bucket: CONFIG_BUCKET.to_string(),
        config_file_key: CONFIG_KEY.to_string(),
        ..Default::default()
    }
}

/// Memory store seeded with the fixture rules document
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put_at(CONFIG_BUCKET, CONFIG_KEY, rules_document(), config_time());
    store
}

/// Handler reading its rules from the seeded store, with a fixed clock
pub fn handler(store: &Arc<MemoryStore>) -> RouterHandler {
    RouterHandler::with_clock(
        &router_config(),
        store.clone(),
        Arc::new(FixedClock::new(fixed_time())),
    )
}

/// Writes a source object and returns its event
pub fn upload(store: &MemoryStore, bucket: &str, key: &str, position: usize) -> ObjectEvent {
    store.put(bucket, key, format!("contents of {}", key));
    ObjectEvent::new(bucket, key, position)
}

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}
