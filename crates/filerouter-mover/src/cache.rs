//! Routing rules cache
//!
//! The rules document lives in the object store. Every batch asks the store
//! for the document's last-modified time and only downloads and parses it
//! when that time has moved past the cached copy.
//!
//! Any failure to reach or parse the document yields an empty rule set for
//! that batch. There are no fallback rules: a config outage means objects are
//! skipped, never routed somewhere by guesswork.

use crate::metrics::MoverMetrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filerouter_core::{ConfigError, ObjectLocation};
use filerouter_filter::RoutingConfigSet;
use filerouter_store::ObjectStore;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Supplies the rule set for one batch.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    /// Returns the current priority-sorted rules; never fails.
    async fn current_rules(&self) -> Arc<RoutingConfigSet>;
}

/// A fixed rule set, for local runs and tests.
#[derive(Debug, Clone)]
pub struct StaticRules(Arc<RoutingConfigSet>);

impl StaticRules {
    pub fn new(rules: RoutingConfigSet) -> Self {
        Self(Arc::new(rules))
    }
}

#[async_trait]
impl RuleProvider for StaticRules {
    async fn current_rules(&self) -> Arc<RoutingConfigSet> {
        Arc::clone(&self.0)
    }
}

/// Last successfully loaded rule set and the document time it was read at.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub rules: Arc<RoutingConfigSet>,
    pub last_modified: DateTime<Utc>,
}

/// Rules cache revalidated against the object store.
///
/// The entry is replaced wholesale, never mutated in place, so concurrent
/// batches either see the old set or the new one.
pub struct RoutingConfigCache {
    store: Arc<dyn ObjectStore>,
    document: ObjectLocation,
    entry: RwLock<Option<CacheEntry>>,
    metrics: Arc<MoverMetrics>,
}

impl RoutingConfigCache {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        document: ObjectLocation,
        metrics: Arc<MoverMetrics>,
    ) -> Self {
        Self {
            store,
            document,
            entry: RwLock::new(None),
            metrics,
        }
    }

    /// Location of the rules document.
    pub fn document(&self) -> &ObjectLocation {
        &self.document
    }

    /// Returns the cached entry, if any.
    pub fn cached(&self) -> Option<CacheEntry> {
        self.entry.read().clone()
    }

    /// Revalidates the cache and returns the rules to use.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be reached or is not a JSON array. The
    /// cached entry is left untouched in that case.
    pub async fn load(&self) -> Result<Arc<RoutingConfigSet>, ConfigError> {
        let location = self.document.uri();
        let unavailable = |reason: String| ConfigError::rules_unavailable(location.clone(), reason);

        let observed = self
            .store
            .head(&self.document.bucket, &self.document.key)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if let Some(entry) = self.cached() {
            if entry.last_modified >= observed {
                debug!(%location, "Using cached routing configuration");
                self.metrics.record_config_cache_hit();
                return Ok(entry.rules);
            }
        }

        info!(%location, "Loading routing configuration");

        let body = self
            .store
            .get(&self.document.bucket, &self.document.key)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let document = std::str::from_utf8(&body)
            .map_err(|e| ConfigError::malformed_rules(format!("document is not UTF-8: {}", e)))?;

        let rules = Arc::new(RoutingConfigSet::from_json(document)?.with_last_modified(observed));

        *self.entry.write() = Some(CacheEntry {
            rules: Arc::clone(&rules),
            last_modified: observed,
        });
        self.metrics.record_config_reload();

        info!(rule_count = rules.len(), %observed, "Loaded routing rules");
        Ok(rules)
    }
}

#[async_trait]
impl RuleProvider for RoutingConfigCache {
    async fn current_rules(&self) -> Arc<RoutingConfigSet> {
        match self.load().await {
            Ok(rules) => rules,
            Err(e) => {
                self.metrics.record_config_failure();
                error!(error = %e, "Failed to load routing configuration");
                error!("No fallback rules, objects in this batch will not be processed");
                Arc::new(RoutingConfigSet::empty())
            }
        }
    }
}
