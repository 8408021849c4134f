//! # FileRouter Core
//!
//! Core types, error handling, and configuration for the event-driven file router.
//!
//! - **Types**: `ObjectEvent`, `ObjectLocation`, per-object `ProcessingResult`
//!   values and the `BatchSummary` returned for every batch.
//! - **Errors**: error types built with `thiserror` for configuration, object
//!   store, filter and event decoding failures.
//! - **Configuration**: layered process configuration (defaults, YAML file,
//!   environment variables).
//!
//! ## Example
//!
//! ```
//! use filerouter_core::types::{BatchSummary, MoveSuccess, ProcessingResult};
//!
//! let summary = BatchSummary::from_results(vec![ProcessingResult::Success(MoveSuccess {
//!     source: "s3://src/Inbox/data.csv".to_string(),
//!     destination: "s3://dst/Out/data.csv".to_string(),
//!     rule_used: "inbox".to_string(),
//!     priority: Some(1),
//! })]);
//!
//! assert_eq!(summary.status_code, 200);
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use config::RouterConfig;
pub use error::{ConfigError, EventError, FileRouterError, FilterError, Result, StoreError};
pub use types::{
    BatchStatus, BatchSummary, InvocationId, MoveFailure, MoveSuccess, ObjectEvent,
    ObjectLocation, ProcessingResult,
};
