//! Router metrics
//!
//! Counters are kept locally (for tests and summaries) and mirrored into the
//! `metrics` facade. No exporter is installed here; the host decides.

use metrics::{counter, describe_counter};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why an object in a batch produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The object is the routing rules document itself
    ConfigDocument,
    /// Hidden file or directory placeholder
    NotRoutable,
    /// No rule matched the key
    NoRuleMatched,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ConfigDocument => "config_document",
            SkipReason::NotRoutable => "not_routable",
            SkipReason::NoRuleMatched => "no_rule_matched",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router metrics collector
#[derive(Debug)]
pub struct MoverMetrics {
    objects_routed: AtomicU64,
    objects_failed: AtomicU64,
    objects_skipped: AtomicU64,
    config_reloads: AtomicU64,
    config_cache_hits: AtomicU64,
    config_failures: AtomicU64,
}

impl MoverMetrics {
    pub fn new() -> Self {
        describe_counter!("filerouter_objects_routed_total", "Objects copied to a destination");
        describe_counter!(
            "filerouter_objects_failed_total",
            "Objects whose copy or delete failed"
        );
        describe_counter!(
            "filerouter_objects_skipped_total",
            "Objects ignored without a result"
        );
        describe_counter!(
            "filerouter_config_reloads_total",
            "Routing rules document fetches"
        );
        describe_counter!(
            "filerouter_config_cache_hits_total",
            "Batches served from the cached rules"
        );
        describe_counter!(
            "filerouter_config_failures_total",
            "Batches run with an empty rule set after a config failure"
        );

        Self {
            objects_routed: AtomicU64::new(0),
            objects_failed: AtomicU64::new(0),
            objects_skipped: AtomicU64::new(0),
            config_reloads: AtomicU64::new(0),
            config_cache_hits: AtomicU64::new(0),
            config_failures: AtomicU64::new(0),
        }
    }

    pub fn record_routed(&self, rule: &str) {
        self.objects_routed.fetch_add(1, Ordering::Relaxed);
        counter!("filerouter_objects_routed_total", "rule" => rule.to_string()).increment(1);
    }

    pub fn record_failed(&self) {
        self.objects_failed.fetch_add(1, Ordering::Relaxed);
        counter!("filerouter_objects_failed_total").increment(1);
    }

    pub fn record_skipped(&self, reason: SkipReason) {
        self.objects_skipped.fetch_add(1, Ordering::Relaxed);
        counter!("filerouter_objects_skipped_total", "reason" => reason.as_str()).increment(1);
    }

    pub fn record_config_reload(&self) {
        self.config_reloads.fetch_add(1, Ordering::Relaxed);
        counter!("filerouter_config_reloads_total").increment(1);
    }

    pub fn record_config_cache_hit(&self) {
        self.config_cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("filerouter_config_cache_hits_total").increment(1);
    }

    pub fn record_config_failure(&self) {
        self.config_failures.fetch_add(1, Ordering::Relaxed);
        counter!("filerouter_config_failures_total").increment(1);
    }

    pub fn objects_routed(&self) -> u64 {
        self.objects_routed.load(Ordering::Relaxed)
    }

    pub fn objects_failed(&self) -> u64 {
        self.objects_failed.load(Ordering::Relaxed)
    }

    pub fn objects_skipped(&self) -> u64 {
        self.objects_skipped.load(Ordering::Relaxed)
    }

    pub fn config_reloads(&self) -> u64 {
        self.config_reloads.load(Ordering::Relaxed)
    }

    pub fn config_cache_hits(&self) -> u64 {
        self.config_cache_hits.load(Ordering::Relaxed)
    }

    pub fn config_failures(&self) -> u64 {
        self.config_failures.load(Ordering::Relaxed)
    }
}

impl Default for MoverMetrics {
    fn default() -> Self {
        Self::new()
    }
}
