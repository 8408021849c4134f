//! Object store abstraction for the file router
//!
//! The router needs four operations from a store: read an object's
//! last-modified time, read its body, copy it server-side with replaced
//! metadata, and delete it. [`ObjectStore`] is the seam between the routing
//! pipeline and a concrete backend.
//!
//! Backends:
//!
//! - [`MemoryStore`]: DashMap-backed, for local runs and tests
//! - `S3Store` (feature `s3`): AWS S3 and S3-compatible services
//!
//! # Example
//!
//! ```
//! use filerouter_core::ObjectLocation;
//! use filerouter_store::{MemoryStore, ObjectStore};
//! use std::collections::HashMap;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! store.put("src", "Inbox/data.csv", "a,b\n");
//!
//! let metadata = HashMap::from([("routing-rule".to_string(), "inbox".to_string())]);
//! store
//!     .copy(
//!         &ObjectLocation::new("src", "Inbox/data.csv"),
//!         &ObjectLocation::new("dst", "Out/data.csv"),
//!         &metadata,
//!     )
//!     .await
//!     .unwrap();
//!
//! assert!(store.contains("dst", "Out/data.csv"));
//! # });
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use filerouter_core::{ObjectLocation, StoreError};
use std::collections::HashMap;

pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use memory::{MemoryStore, StoreOperation, StoredObject};
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Operations the router performs against an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the last-modified time of an object.
    ///
    /// Returns [`StoreError::NotFound`] when the object does not exist.
    async fn head(&self, bucket: &str, key: &str) -> StoreResult<DateTime<Utc>>;

    /// Returns the full body of an object.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;

    /// Copies an object, replacing the destination's user metadata with `metadata`.
    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        metadata: &HashMap<String, String>,
    ) -> StoreResult<()>;

    /// Deletes an object.
    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// Backend name, used in logs
    fn name(&self) -> &'static str;
}

/// Formats `bucket/key` for a server-side copy request.
///
/// The key is percent-encoded except for `/`, so decoded keys with spaces,
/// `+`, `?`, `%` or non-ASCII characters address the same object.
pub fn encode_copy_source(source: &ObjectLocation) -> String {
    let key = url::form_urlencoded::byte_serialize(source.key.as_bytes())
        .collect::<String>()
        // byte_serialize writes a space as '+' and a literal '+' as %2B
        .replace('+', "%20")
        .replace("%2F", "/");
    format!("{}/{}", source.bucket, key)
}
