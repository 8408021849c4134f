//! Batch processing for the file router
//!
//! Ties the rules, the filter engine and the object store together:
//!
//! - [`cache::RoutingConfigCache`]: revalidating cache of the rules document
//! - [`processor::ObjectProcessor`]: copies one object with provenance metadata
//! - [`handler::RouterHandler`]: runs a whole notification batch in order
//! - [`event`]: S3 notification decoding
//! - [`metrics::MoverMetrics`]: counters mirrored into the `metrics` facade
//!
//! # Example
//!
//! ```rust
//! use filerouter_core::RouterConfig;
//! use filerouter_mover::RouterHandler;
//! use filerouter_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! store.put("cfg", "config/routing-rules.json", r#"[
//!     {"name": "inbox", "priority": 1, "source_pattern": "Inbox/",
//!      "destination_bucket": "dst", "destination_prefix": "Out/", "add_timestamp": false}
//! ]"#);
//! store.put("src", "Inbox/data.csv", "a,b\n");
//!
//! let config = RouterConfig {
//!     config_bucket: "cfg".to_string(),
//!     ..Default::default()
//! };
//! let handler = RouterHandler::from_config(&config, store.clone());
//!
//! let summary = handler
//!     .handle_payload(r#"{"Records": [{"s3": {"bucket": {"name": "src"}, "object": {"key": "Inbox/data.csv"}}}]}"#)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(summary.status_code, 200);
//! assert!(store.contains("dst", "Out/data.csv"));
//! # });
//! ```

pub mod cache;
pub mod clock;
pub mod event;
pub mod handler;
pub mod metrics;
pub mod processor;

pub use cache::{CacheEntry, RoutingConfigCache, RuleProvider, StaticRules};
pub use clock::{Clock, FixedClock, SystemClock};
pub use event::{decode_key, events_from_value, parse_events};
pub use handler::RouterHandler;
pub use metrics::{MoverMetrics, SkipReason};
pub use processor::{timestamped_filename, MovePlan, ObjectProcessor};
