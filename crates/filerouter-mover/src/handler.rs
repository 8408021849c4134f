//! Batch handler
//!
//! Runs one inbound batch to completion: fetch the current rules once, then
//! resolve and move each object strictly in batch order. Objects never
//! overlap. The handler always returns a summary; per-object failures only
//! turn the status into 207.

use crate::cache::{RoutingConfigCache, RuleProvider};
use crate::clock::{Clock, SystemClock};
use crate::event;
use crate::metrics::{MoverMetrics, SkipReason};
use crate::processor::ObjectProcessor;
use filerouter_core::{
    BatchSummary, EventError, InvocationId, ObjectEvent, ObjectLocation, ProcessingResult,
    RouterConfig,
};
use filerouter_filter::path;
use filerouter_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Routes batches of object-creation events.
pub struct RouterHandler {
    rules: Arc<dyn RuleProvider>,
    processor: ObjectProcessor,
    config_file_key: String,
    metrics: Arc<MoverMetrics>,
}

impl RouterHandler {
    pub fn new(
        rules: Arc<dyn RuleProvider>,
        processor: ObjectProcessor,
        config_file_key: impl Into<String>,
        metrics: Arc<MoverMetrics>,
    ) -> Self {
        Self {
            rules,
            processor,
            config_file_key: config_file_key.into(),
            metrics,
        }
    }

    /// Wires a handler whose rules come from the cached document in `store`.
    pub fn from_config(config: &RouterConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Like [`RouterHandler::from_config`] with an explicit clock.
    pub fn with_clock(config: &RouterConfig, store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>) -> Self {
        let metrics = Arc::new(MoverMetrics::new());
        let cache = RoutingConfigCache::new(
            Arc::clone(&store),
            ObjectLocation::new(&config.config_bucket, &config.config_file_key),
            Arc::clone(&metrics),
        );
        let processor = ObjectProcessor::new(store, clock, &config.processor_id);

        Self::new(Arc::new(cache), processor, &config.config_file_key, metrics)
    }

    pub fn metrics(&self) -> &Arc<MoverMetrics> {
        &self.metrics
    }

    /// Decodes a notification payload and handles it.
    pub async fn handle_payload(&self, payload: &str) -> Result<BatchSummary, EventError> {
        let events = event::parse_events(payload)?;
        Ok(self.handle(&events).await)
    }

    /// Handles one batch of events.
    pub async fn handle(&self, events: &[ObjectEvent]) -> BatchSummary {
        let invocation = InvocationId::new();
        let span = info_span!("batch", invocation_id = %invocation, events = events.len());

        async {
            let rules = self.rules.current_rules().await;
            let mut results = Vec::with_capacity(events.len());

            for event in events {
                if let Some(result) = self.handle_event(event, &rules).await {
                    results.push(result);
                }
            }

            let summary = BatchSummary::from_results(results);
            info!(
                status = summary.status_code,
                processed = summary.processed_files,
                errors = summary.errors,
                "Batch complete"
            );
            summary
        }
        .instrument(span)
        .await
    }

    async fn handle_event(
        &self,
        event: &ObjectEvent,
        rules: &filerouter_filter::RoutingConfigSet,
    ) -> Option<ProcessingResult> {
        let key = event.source_key.as_str();

        if key == self.config_file_key {
            info!(key, "Config file updated, cache will refresh on next batch");
            self.metrics.record_skipped(SkipReason::ConfigDocument);
            return None;
        }

        if !path::is_routable(key) {
            debug!(key, "Skipping hidden file or directory placeholder");
            self.metrics.record_skipped(SkipReason::NotRoutable);
            return None;
        }

        debug!(location = %event.location(), position = event.position, "Processing object");

        let Some(rule) = rules.resolve(key) else {
            warn!(
                location = %event.location(),
                "No routing rule found, object ignored"
            );
            self.metrics.record_skipped(SkipReason::NoRuleMatched);
            return None;
        };

        let result = self.processor.process(&event.source_bucket, key, rule).await;
        if result.is_success() {
            self.metrics.record_routed(&rule.name);
        } else {
            self.metrics.record_failed();
        }

        Some(result)
    }
}
