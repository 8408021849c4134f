//! Object processor
//!
//! Moves one object according to the rule that matched it:
//!
//! 1. derive the destination filename, with an optional `_YYYYMMDD_HHMMSS`
//!    suffix before the last extension
//! 2. prefix it with the rule's destination prefix (or the smart routing prefix)
//! 3. copy the object server-side, replacing its metadata with provenance
//! 4. delete the source when the rule asks for it, only after the copy
//!
//! Failures never escape: they become a failure result for that object.

use crate::clock::Clock;
use chrono::{DateTime, SecondsFormat, Utc};
use filerouter_core::{MoveFailure, MoveSuccess, ObjectLocation, ProcessingResult, StoreError};
use filerouter_filter::{path, RoutingRule};
use filerouter_store::ObjectStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Timestamp suffix format.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Metadata keys written to every copied object.
pub mod metadata_keys {
    pub const SOURCE_BUCKET: &str = "source-bucket";
    pub const SOURCE_KEY: &str = "source-key";
    pub const PROCESSED_BY: &str = "processed-by";
    pub const PROCESSED_AT: &str = "processed-at";
    pub const ROUTING_RULE: &str = "routing-rule";
    pub const RULE_PRIORITY: &str = "rule-priority";
    pub const MATCHED_KEYWORD: &str = "matched-keyword";
}

/// Priority value written when the rule declares none.
pub const NO_PRIORITY: &str = "N/A";

/// Appends a timestamp suffix before the last extension of a filename.
///
/// `report.csv` becomes `report_20240309_140507.csv`; `report` and `report.`
/// become `report_20240309_140507`.
pub fn timestamped_filename(filename: &str, at: DateTime<Utc>) -> String {
    let timestamp = at.format(TIMESTAMP_FORMAT);
    match path::split_extension(filename) {
        (stem, Some(ext)) => format!("{}_{}.{}", stem, timestamp, ext),
        (stem, None) => format!("{}_{}", stem, timestamp),
    }
}

/// Where and how one object will be moved.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlan {
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    pub metadata: HashMap<String, String>,
    pub delete_source: bool,
}

/// Executes moves against an object store.
pub struct ObjectProcessor {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    processor_id: String,
}

impl ObjectProcessor {
    pub fn new(store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>, processor_id: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            processor_id: processor_id.into(),
        }
    }

    /// Identifier written as `processed-by`.
    pub fn processor_id(&self) -> &str {
        &self.processor_id
    }

    /// Computes the destination and metadata for an object without touching
    /// the store.
    pub fn plan(&self, source_bucket: &str, source_key: &str, rule: &RoutingRule) -> MovePlan {
        let now = self.clock.now();
        let filename = path::filename(source_key);

        let destination_filename = if rule.add_timestamp {
            timestamped_filename(filename, now)
        } else {
            filename.to_string()
        };

        let (destination_prefix, matched_keyword) = match &rule.smart_routing {
            Some(smart) => {
                let routed = smart.route(source_key);
                (routed.destination_prefix, Some(routed.matched_keyword))
            }
            None => (rule.destination_prefix.clone(), None),
        };

        let mut metadata = HashMap::from([
            (metadata_keys::SOURCE_BUCKET.to_string(), source_bucket.to_string()),
            (metadata_keys::SOURCE_KEY.to_string(), source_key.to_string()),
            (metadata_keys::PROCESSED_BY.to_string(), self.processor_id.clone()),
            (
                metadata_keys::PROCESSED_AT.to_string(),
                now.to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
            (metadata_keys::ROUTING_RULE.to_string(), rule.name.clone()),
            (
                metadata_keys::RULE_PRIORITY.to_string(),
                rule.priority
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| NO_PRIORITY.to_string()),
            ),
        ]);

        if let Some(keyword) = matched_keyword {
            metadata.insert(metadata_keys::MATCHED_KEYWORD.to_string(), keyword);
        }

        MovePlan {
            source: ObjectLocation::new(source_bucket, source_key),
            destination: ObjectLocation::new(
                &rule.destination_bucket,
                format!("{}{}", destination_prefix, destination_filename),
            ),
            metadata,
            delete_source: rule.delete_source,
        }
    }

    /// Moves one object and reports the outcome.
    pub async fn process(&self, source_bucket: &str, source_key: &str, rule: &RoutingRule) -> ProcessingResult {
        let plan = self.plan(source_bucket, source_key, rule);

        match self.execute(&plan).await {
            Ok(()) => {
                info!(
                    source = %plan.source,
                    destination = %plan.destination,
                    rule = %rule.name,
                    priority = ?rule.priority,
                    deleted_source = plan.delete_source,
                    "Routed object"
                );

                ProcessingResult::Success(MoveSuccess {
                    source: plan.source.uri(),
                    destination: plan.destination.uri(),
                    rule_used: rule.name.clone(),
                    priority: rule.priority,
                })
            }
            Err(e) => {
                let message = format!("Failed to process {}: {}", source_key, e);
                error!(source = %plan.source, rule = %rule.name, error = %e, "{}", message);

                ProcessingResult::Failure(MoveFailure {
                    source: plan.source.uri(),
                    error: message,
                })
            }
        }
    }

    async fn execute(&self, plan: &MovePlan) -> Result<(), StoreError> {
        self.store
            .copy(&plan.source, &plan.destination, &plan.metadata)
            .await?;

        if plan.delete_source {
            self.store
                .delete(&plan.source.bucket, &plan.source.key)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use filerouter_filter::SmartRouting;
    use filerouter_store::{MemoryStore, StoreOperation};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, ObjectProcessor) {
        let store = Arc::new(MemoryStore::new());
        store.put("src", "Inbox/report.csv", "a,b\n1,2\n");
        let processor = ObjectProcessor::new(
            store.clone(),
            Arc::new(FixedClock::new(at())),
            "configurable-file-mover",
        );
        (store, processor)
    }

    fn rule() -> RoutingRule {
        RoutingRule::new("inbox", "Inbox/", "dst", "Out/").with_priority(1)
    }

    #[test]
    fn test_timestamped_filename() {
        assert_eq!(timestamped_filename("report.csv", at()), "report_20240309_140507.csv");
        assert_eq!(timestamped_filename("report", at()), "report_20240309_140507");
        assert_eq!(timestamped_filename("report.", at()), "report_20240309_140507");
        assert_eq!(
            timestamped_filename("archive.tar.gz", at()),
            "archive.tar_20240309_140507.gz"
        );
    }

    #[test]
    fn test_plan_destination() {
        let (_, processor) = setup();

        let plan = processor.plan("src", "Inbox/report.csv", &rule());
        assert_eq!(plan.destination, ObjectLocation::new("dst", "Out/report_20240309_140507.csv"));

        let plan = processor.plan("src", "Inbox/report.csv", &rule().with_timestamp(false));
        assert_eq!(plan.destination.key, "Out/report.csv");
    }

    #[test]
    fn test_plan_metadata() {
        let (_, processor) = setup();
        let plan = processor.plan("src", "Inbox/report.csv", &rule());

        assert_eq!(plan.metadata[metadata_keys::SOURCE_BUCKET], "src");
        assert_eq!(plan.metadata[metadata_keys::SOURCE_KEY], "Inbox/report.csv");
        assert_eq!(plan.metadata[metadata_keys::PROCESSED_BY], "configurable-file-mover");
        assert_eq!(plan.metadata[metadata_keys::PROCESSED_AT], "2024-03-09T14:05:07.000000Z");
        assert_eq!(plan.metadata[metadata_keys::ROUTING_RULE], "inbox");
        assert_eq!(plan.metadata[metadata_keys::RULE_PRIORITY], "1");
        assert!(!plan.metadata.contains_key(metadata_keys::MATCHED_KEYWORD));
    }

    #[test]
    fn test_missing_priority_metadata() {
        let (_, processor) = setup();
        let rule = RoutingRule::new("no-priority", "Inbox/", "dst", "Out/");
        let plan = processor.plan("src", "Inbox/report.csv", &rule);
        assert_eq!(plan.metadata[metadata_keys::RULE_PRIORITY], NO_PRIORITY);
    }

    #[test]
    fn test_smart_routing_prefix_and_keyword() {
        let (_, processor) = setup();
        let mut rule = rule().with_timestamp(false);
        rule.smart_routing = Some(SmartRouting {
            keyword_mapping: vec![("report".to_string(), "Reports/".to_string())],
            default_destination: "Other/".to_string(),
        });

        let plan = processor.plan("src", "Inbox/report.csv", &rule);
        assert_eq!(plan.destination.key, "Reports/report.csv");
        assert_eq!(plan.metadata[metadata_keys::MATCHED_KEYWORD], "report");

        let plan = processor.plan("src", "Inbox/data.csv", &rule);
        assert_eq!(plan.destination.key, "Other/data.csv");
        assert_eq!(plan.metadata[metadata_keys::MATCHED_KEYWORD], "default");
    }

    #[tokio::test]
    async fn test_process_copies_and_keeps_source() {
        let (store, processor) = setup();
        let result = processor
            .process("src", "Inbox/report.csv", &rule().with_timestamp(false))
            .await;

        assert_eq!(
            result,
            ProcessingResult::Success(MoveSuccess {
                source: "s3://src/Inbox/report.csv".to_string(),
                destination: "s3://dst/Out/report.csv".to_string(),
                rule_used: "inbox".to_string(),
                priority: Some(1),
            })
        );
        assert!(store.contains("dst", "Out/report.csv"));
        assert!(store.contains("src", "Inbox/report.csv"));
        assert_eq!(store.delete_count(), 0);
        assert_eq!(
            store.metadata("dst", "Out/report.csv").unwrap()[metadata_keys::ROUTING_RULE],
            "inbox"
        );
    }

    #[tokio::test]
    async fn test_process_deletes_source_after_copy() {
        let (store, processor) = setup();
        let result = processor
            .process("src", "Inbox/report.csv", &rule().with_delete_source(true))
            .await;

        assert!(result.is_success());
        assert!(!store.contains("src", "Inbox/report.csv"));
        assert!(store.contains("dst", "Out/report_20240309_140507.csv"));
    }

    #[tokio::test]
    async fn test_copy_failure_skips_delete() {
        let (store, processor) = setup();
        store.fail(StoreOperation::Copy, "src", "Inbox/report.csv", "access denied");

        let result = processor
            .process("src", "Inbox/report.csv", &rule().with_delete_source(true))
            .await;

        match result {
            ProcessingResult::Failure(failure) => {
                assert_eq!(failure.source, "s3://src/Inbox/report.csv");
                assert!(failure.error.starts_with("Failed to process Inbox/report.csv: "));
                assert!(failure.error.contains("access denied"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(store.delete_count(), 0);
        assert!(store.contains("src", "Inbox/report.csv"));
    }

    #[tokio::test]
    async fn test_delete_failure_reports_failure_after_copy() {
        let (store, processor) = setup();
        store.fail(StoreOperation::Delete, "src", "Inbox/report.csv", "access denied");

        let result = processor
            .process("src", "Inbox/report.csv", &rule().with_delete_source(true))
            .await;

        assert!(!result.is_success());
        assert!(store.contains("dst", "Out/report_20240309_140507.csv"));
        assert!(store.contains("src", "Inbox/report.csv"));
    }
}
