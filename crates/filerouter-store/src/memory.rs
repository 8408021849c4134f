//! In-memory object store
//!
//! Objects live in a [`DashMap`] keyed by location. Every call is counted and
//! any operation can be made to fail for a given object, which lets tests
//! drive the partial-failure paths of the router.

use crate::{ObjectStore, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use filerouter_core::{ObjectLocation, StoreError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Store operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Head,
    Get,
    /// Matched against the copy source
    Copy,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Head => write!(f, "head"),
            StoreOperation::Get => write!(f, "get"),
            StoreOperation::Copy => write!(f, "copy"),
            StoreOperation::Delete => write!(f, "delete"),
        }
    }
}

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub last_modified: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

/// DashMap-backed object store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<ObjectLocation, StoredObject>,
    failures: DashMap<(StoreOperation, ObjectLocation), String>,
    head_count: AtomicU64,
    get_count: AtomicU64,
    copy_count: AtomicU64,
    delete_count: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an object with the current time as its last-modified time.
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.put_at(bucket, key, data, Utc::now());
    }

    /// Writes an object with an explicit last-modified time.
    pub fn put_at(&self, bucket: &str, key: &str, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.objects.insert(
            ObjectLocation::new(bucket, key),
            StoredObject {
                data: data.into(),
                last_modified,
                metadata: HashMap::new(),
            },
        );
    }

    /// Changes the last-modified time of an existing object.
    ///
    /// Returns false if the object does not exist.
    pub fn set_last_modified(&self, bucket: &str, key: &str, last_modified: DateTime<Utc>) -> bool {
        match self.objects.get_mut(&ObjectLocation::new(bucket, key)) {
            Some(mut object) => {
                object.last_modified = last_modified;
                true
            }
            None => false,
        }
    }

    /// Returns a copy of a stored object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .get(&ObjectLocation::new(bucket, key))
            .map(|entry| entry.value().clone())
    }

    /// Returns the user metadata of a stored object.
    pub fn metadata(&self, bucket: &str, key: &str) -> Option<HashMap<String, String>> {
        self.object(bucket, key).map(|object| object.metadata)
    }

    /// Returns true if the object exists.
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects.contains_key(&ObjectLocation::new(bucket, key))
    }

    /// Sorted keys of every object in a bucket.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().bucket == bucket)
            .map(|entry| entry.key().key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Total number of objects across buckets.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Makes every future `operation` on the object fail with `reason`.
    pub fn fail(&self, operation: StoreOperation, bucket: &str, key: &str, reason: impl Into<String>) {
        self.failures
            .insert((operation, ObjectLocation::new(bucket, key)), reason.into());
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    pub fn head_count(&self) -> u64 {
        self.head_count.load(Ordering::Relaxed)
    }

    pub fn get_count(&self) -> u64 {
        self.get_count.load(Ordering::Relaxed)
    }

    pub fn copy_count(&self) -> u64 {
        self.copy_count.load(Ordering::Relaxed)
    }

    pub fn delete_count(&self) -> u64 {
        self.delete_count.load(Ordering::Relaxed)
    }

    fn injected(&self, operation: StoreOperation, location: &ObjectLocation) -> Option<String> {
        self.failures
            .get(&(operation, location.clone()))
            .map(|reason| reason.value().clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head(&self, bucket: &str, key: &str) -> StoreResult<DateTime<Utc>> {
        self.head_count.fetch_add(1, Ordering::Relaxed);
        let location = ObjectLocation::new(bucket, key);

        if let Some(reason) = self.injected(StoreOperation::Head, &location) {
            return Err(StoreError::Head {
                bucket: location.bucket,
                key: location.key,
                reason,
            });
        }

        self.objects
            .get(&location)
            .map(|object| object.last_modified)
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        let location = ObjectLocation::new(bucket, key);

        if let Some(reason) = self.injected(StoreOperation::Get, &location) {
            return Err(StoreError::Get {
                bucket: location.bucket,
                key: location.key,
                reason,
            });
        }

        trace!(%location, "Reading object");

        self.objects
            .get(&location)
            .map(|object| object.data.clone())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        metadata: &HashMap<String, String>,
    ) -> StoreResult<()> {
        self.copy_count.fetch_add(1, Ordering::Relaxed);

        let copy_failed = |reason: String| StoreError::Copy {
            from: source.uri(),
            to: destination.uri(),
            reason,
        };

        if let Some(reason) = self.injected(StoreOperation::Copy, source) {
            return Err(copy_failed(reason));
        }

        // Clone out before inserting; source and destination may share a shard
        let data = match self.objects.get(source) {
            Some(object) => object.data.clone(),
            None => return Err(copy_failed("source object does not exist".to_string())),
        };

        self.objects.insert(
            destination.clone(),
            StoredObject {
                data,
                last_modified: Utc::now(),
                metadata: metadata.clone(),
            },
        );

        debug!(%source, %destination, "Copied object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
        let location = ObjectLocation::new(bucket, key);

        if let Some(reason) = self.injected(StoreOperation::Delete, &location) {
            return Err(StoreError::Delete {
                bucket: location.bucket,
                key: location.key,
                reason,
            });
        }

        // Deleting a missing object succeeds, as it does on S3
        self.objects.remove(&location);
        debug!(%location, "Deleted object");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
