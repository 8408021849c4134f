//! Core types shared by the routing engine, the stores and the batch handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one batch invocation.
///
/// Attached to the tracing span of a batch so every log line of one
/// invocation can be correlated.
///
/// # Examples
///
/// ```
/// use filerouter_core::types::InvocationId;
///
/// let id = InvocationId::new();
/// println!("Invocation: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Creates a new random invocation identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bucket/key pair addressing one object.
///
/// Displays as an `s3://bucket/key` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Returns the `s3://bucket/key` form of this location.
    pub fn uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// One object-creation notification from an inbound batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvent {
    /// Bucket the object was written to
    pub source_bucket: String,
    /// Object key, already percent-decoded
    pub source_key: String,
    /// Position of the record in its batch
    pub position: usize,
}

impl ObjectEvent {
    pub fn new(source_bucket: impl Into<String>, source_key: impl Into<String>, position: usize) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            position,
        }
    }

    /// Returns the source location of this event.
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(&self.source_bucket, &self.source_key)
    }
}

/// A successfully routed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSuccess {
    /// Source URI
    pub source: String,
    /// Destination URI
    pub destination: String,
    /// Name of the rule that routed the object
    pub rule_used: String,
    /// Priority of that rule, if the rule declared one
    pub priority: Option<i64>,
}

/// An object whose copy or delete failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveFailure {
    /// Source URI
    pub source: String,
    /// Description of what went wrong
    pub error: String,
}

/// Outcome of processing one routed object.
///
/// Exactly one of these exists per object that was not skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingResult {
    Success(MoveSuccess),
    Failure(MoveFailure),
}

impl ProcessingResult {
    /// Returns true for a successful move.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success(_))
    }

    /// Returns the source URI of the processed object.
    pub fn source(&self) -> &str {
        match self {
            ProcessingResult::Success(s) => &s.source,
            ProcessingResult::Failure(f) => &f.source,
        }
    }
}

/// Batch-level status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Every routed object succeeded (or nothing was routed)
    Ok,
    /// At least one routed object failed
    MultiStatus,
}

impl BatchStatus {
    /// Returns the HTTP-style status code for this status.
    pub fn code(&self) -> u16 {
        match self {
            BatchStatus::Ok => 200,
            BatchStatus::MultiStatus => 207,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Summary of one processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// 200 when nothing failed, 207 otherwise
    pub status_code: u16,
    /// Number of objects moved successfully
    pub processed_files: usize,
    /// Number of objects that failed
    pub errors: usize,
    /// Per-object results in batch order
    pub results: Vec<ProcessingResult>,
}

impl BatchSummary {
    /// Builds a summary from per-object results.
    pub fn from_results(results: Vec<ProcessingResult>) -> Self {
        let processed_files = results.iter().filter(|r| r.is_success()).count();
        let errors = results.len() - processed_files;
        let status = if errors == 0 {
            BatchStatus::Ok
        } else {
            BatchStatus::MultiStatus
        };

        Self {
            status_code: status.code(),
            processed_files,
            errors,
            results,
        }
    }

    /// Returns the batch status.
    pub fn status(&self) -> BatchStatus {
        if self.errors == 0 {
            BatchStatus::Ok
        } else {
            BatchStatus::MultiStatus
        }
    }

    /// Iterates over successful moves.
    pub fn successful(&self) -> impl Iterator<Item = &MoveSuccess> {
        self.results.iter().filter_map(|r| match r {
            ProcessingResult::Success(s) => Some(s),
            ProcessingResult::Failure(_) => None,
        })
    }

    /// Iterates over failed moves.
    pub fn failed(&self) -> impl Iterator<Item = &MoveFailure> {
        self.results.iter().filter_map(|r| match r {
            ProcessingResult::Success(_) => None,
            ProcessingResult::Failure(f) => Some(f),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> ProcessingResult {
        ProcessingResult::Success(MoveSuccess {
            source: "s3://src/Inbox/a.csv".to_string(),
            destination: "s3://dst/Out/a.csv".to_string(),
            rule_used: "inbox".to_string(),
            priority: Some(1),
        })
    }

    fn failure() -> ProcessingResult {
        ProcessingResult::Failure(MoveFailure {
            source: "s3://src/Inbox/b.csv".to_string(),
            error: "Failed to process Inbox/b.csv: access denied".to_string(),
        })
    }

    #[test]
    fn test_location_uri() {
        let loc = ObjectLocation::new("dst", "Out/data.csv");
        assert_eq!(loc.uri(), "s3://dst/Out/data.csv");
    }

    #[test]
    fn test_summary_all_success() {
        let summary = BatchSummary::from_results(vec![success(), success()]);
        assert_eq!(summary.status_code, 200);
        assert_eq!(summary.status(), BatchStatus::Ok);
        assert_eq!(summary.processed_files, 2);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn test_summary_partial_failure() {
        let summary = BatchSummary::from_results(vec![success(), failure()]);
        assert_eq!(summary.status_code, 207);
        assert_eq!(summary.status(), BatchStatus::MultiStatus);
        assert_eq!(summary.successful().count(), 1);
        assert_eq!(summary.failed().count(), 1);
    }

    #[test]
    fn test_empty_summary_is_ok() {
        let summary = BatchSummary::from_results(Vec::new());
        assert_eq!(summary.status_code, 200);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_result_serialization_tag() {
        let json = serde_json::to_value(success()).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["rule_used"], "inbox");

        let json = serde_json::to_value(failure()).unwrap();
        assert_eq!(json["status"], "failure");
        assert!(json["error"].as_str().unwrap().contains("access denied"));
    }

    #[test]
    fn test_invocation_ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }
}
