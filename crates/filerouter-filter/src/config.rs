//! Routing rules document
//!
//! Decodes the JSON rules document into a priority-sorted [`RoutingConfigSet`].
//! Rules decode one by one: a rule that cannot be decoded is dropped with a
//! warning and never fires, while the rest of the document stays usable.

use crate::rules::FilenameFilter;
use crate::smart::SmartRouting;
use chrono::{DateTime, Utc};
use filerouter_core::{ConfigError, FilterError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Sort key used for rules that declare no priority.
pub const DEFAULT_PRIORITY: i64 = 999;

/// How a rule matches object keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PatternType {
    /// Exact folder match
    #[default]
    Prefix,
    /// Exact folder match plus a filename filter
    PrefixWithFilenameFilter,
    /// Any other value; a rule carrying it never matches
    Unsupported(String),
}

impl PatternType {
    /// Returns the wire name of this pattern type.
    pub fn as_str(&self) -> &str {
        match self {
            PatternType::Prefix => "prefix",
            PatternType::PrefixWithFilenameFilter => "prefix_with_filename_filter",
            PatternType::Unsupported(other) => other,
        }
    }

    /// Returns true for the supported pattern types.
    #[inline]
    pub fn is_supported(&self) -> bool {
        !matches!(self, PatternType::Unsupported(_))
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PatternType {
    fn from(value: &str) -> Self {
        match value {
            "prefix" => PatternType::Prefix,
            "prefix_with_filename_filter" => PatternType::PrefixWithFilenameFilter,
            other => PatternType::Unsupported(other.to_string()),
        }
    }
}

impl Serialize for PatternType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatternType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(PatternType::from(value.as_str()))
    }
}

/// One routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Rule name, used in logs and object metadata
    pub name: String,

    /// Lower values win; absent sorts as [`DEFAULT_PRIORITY`]
    #[serde(default)]
    pub priority: Option<i64>,

    /// Disabled rules never match
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Matching mode
    #[serde(default)]
    pub pattern_type: PatternType,

    /// Exact folder path including the trailing separator; `""` is the root
    #[serde(default)]
    pub source_pattern: String,

    /// Allowed extensions including the leading dot; empty allows all
    #[serde(default)]
    pub file_types: Vec<String>,

    /// Filename filter, consulted for `prefix_with_filename_filter` rules
    #[serde(default)]
    pub filename_filter: Option<FilenameFilter>,

    /// Bucket objects are copied to
    pub destination_bucket: String,

    /// Prefix prepended to the destination filename
    pub destination_prefix: String,

    /// Append a `_YYYYMMDD_HHMMSS` suffix to the destination filename
    #[serde(default = "default_true")]
    pub add_timestamp: bool,

    /// Delete the source object after a successful copy
    #[serde(default)]
    pub delete_source: bool,

    /// Keyword-based destination prefixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_routing: Option<SmartRouting>,
}

fn default_true() -> bool {
    true
}

impl RoutingRule {
    /// Creates an enabled `prefix` rule with default flags.
    pub fn new(
        name: impl Into<String>,
        source_pattern: impl Into<String>,
        destination_bucket: impl Into<String>,
        destination_prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            priority: None,
            enabled: true,
            pattern_type: PatternType::Prefix,
            source_pattern: source_pattern.into(),
            file_types: Vec::new(),
            filename_filter: None,
            destination_bucket: destination_bucket.into(),
            destination_prefix: destination_prefix.into(),
            add_timestamp: true,
            delete_source: false,
            smart_routing: None,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the allowed file types.
    pub fn with_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Switches the rule to `prefix_with_filename_filter` with the given filter.
    pub fn with_filename_filter(mut self, filter: FilenameFilter) -> Self {
        self.pattern_type = PatternType::PrefixWithFilenameFilter;
        self.filename_filter = Some(filter);
        self
    }

    /// Sets whether a timestamp suffix is added.
    pub fn with_timestamp(mut self, add_timestamp: bool) -> Self {
        self.add_timestamp = add_timestamp;
        self
    }

    /// Sets whether the source is deleted after the copy.
    pub fn with_delete_source(mut self, delete_source: bool) -> Self {
        self.delete_source = delete_source;
        self
    }

    /// Sets whether the rule is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the key this rule sorts by.
    #[inline]
    pub fn sort_priority(&self) -> i64 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Priority-sorted set of routing rules loaded from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingConfigSet {
    rules: Vec<RoutingRule>,
    last_modified: Option<DateTime<Utc>>,
}

impl RoutingConfigSet {
    /// Creates a set from rules, sorting them ascending by priority.
    ///
    /// The sort is stable: rules with equal priority keep document order.
    pub fn new(mut rules: Vec<RoutingRule>) -> Self {
        rules.sort_by_key(RoutingRule::sort_priority);
        Self {
            rules,
            last_modified: None,
        }
    }

    /// Creates an empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes a rules document.
    ///
    /// # Errors
    ///
    /// Fails when the document is not JSON or not an array. Individual rules
    /// that fail to decode are dropped, not reported as errors.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(document).map_err(|e| ConfigError::malformed_rules(e.to_string()))?;

        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            other => {
                return Err(ConfigError::malformed_rules(format!(
                    "expected an array of rules, found {}",
                    json_kind(&other)
                )))
            }
        };

        let total = entries.len();
        let rules: Vec<RoutingRule> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<RoutingRule>(entry) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    let err = ConfigError::InvalidRule {
                        index,
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Dropping routing rule that cannot be decoded");
                    None
                }
            })
            .collect();

        info!(
            rule_count = rules.len(),
            dropped = total - rules.len(),
            "Decoded routing rules document"
        );

        Ok(Self::new(rules))
    }

    /// Records the modification time of the source document.
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Modification time of the source document, if known.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Reports configuration problems without changing matching behaviour.
    pub fn validate(&self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for rule in &self.rules {
            if !seen.insert(rule.name.as_str()) {
                issues.push(RuleIssue::new(&rule.name, IssueKind::DuplicateName));
            }

            if !rule.pattern_type.is_supported() {
                issues.push(RuleIssue::new(
                    &rule.name,
                    IssueKind::UnsupportedPatternType(rule.pattern_type.to_string()),
                ));
            }

            if rule.pattern_type == PatternType::PrefixWithFilenameFilter
                && rule.filename_filter.is_none()
            {
                issues.push(RuleIssue::new(&rule.name, IssueKind::MissingFilenameFilter));
            }

            if let Some(filter) = &rule.filename_filter {
                for err in filter.invalid_patterns() {
                    issues.push(RuleIssue::new(&rule.name, IssueKind::InvalidFilter(err)));
                }
            }

            if !rule.source_pattern.is_empty() && !rule.source_pattern.ends_with('/') {
                issues.push(RuleIssue::new(&rule.name, IssueKind::SourcePatternWithoutSeparator));
            }
        }

        issues
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// A configuration problem found in one rule.
#[derive(Debug, Serialize)]
pub struct RuleIssue {
    pub rule: String,
    pub kind: IssueKind,
}

impl RuleIssue {
    fn new(rule: &str, kind: IssueKind) -> Self {
        Self {
            rule: rule.to_string(),
            kind,
        }
    }
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule '{}': {}", self.rule, self.kind)
    }
}

/// Kinds of rule configuration problems.
#[derive(Debug, Serialize)]
pub enum IssueKind {
    /// Another rule has the same name
    DuplicateName,
    /// `pattern_type` is not supported; the rule never matches
    UnsupportedPatternType(String),
    /// `prefix_with_filename_filter` without a filter; the filter always passes
    MissingFilenameFilter,
    /// The filter cannot be evaluated; the rule never matches
    InvalidFilter(FilterError),
    /// `source_pattern` lacks a trailing separator and can never equal a folder
    SourcePatternWithoutSeparator,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::DuplicateName => write!(f, "duplicate rule name"),
            IssueKind::UnsupportedPatternType(t) => {
                write!(f, "unsupported pattern_type '{}', rule never matches", t)
            }
            IssueKind::MissingFilenameFilter => {
                write!(f, "prefix_with_filename_filter without filename_filter")
            }
            IssueKind::InvalidFilter(e) => write!(f, "{}, rule never matches", e),
            IssueKind::SourcePatternWithoutSeparator => {
                write!(f, "source_pattern does not end with '/', rule never matches")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"[
        {
            "name": "Fallback CSV",
            "destination_bucket": "archive",
            "destination_prefix": "misc/"
        },
        {
            "name": "Inbox CSV",
            "priority": 1,
            "pattern_type": "prefix",
            "source_pattern": "Inbox/",
            "file_types": [".csv"],
            "destination_bucket": "dst",
            "destination_prefix": "Out/",
            "add_timestamp": false,
            "owner": "data-team"
        },
        {
            "name": "Sales",
            "priority": 5,
            "pattern_type": "prefix_with_filename_filter",
            "source_pattern": "Inbox/",
            "filename_filter": {"type": "starts_with", "value": "sales"},
            "destination_bucket": "dst",
            "destination_prefix": "Sales/"
        }
    ]"#;

    #[test]
    fn test_decode_and_sort() {
        let set = RoutingConfigSet::from_json(DOCUMENT).unwrap();
        let names: Vec<_> = set.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Inbox CSV", "Sales", "Fallback CSV"]);
    }

    #[test]
    fn test_defaults() {
        let set = RoutingConfigSet::from_json(DOCUMENT).unwrap();
        let fallback = &set.rules()[2];
        assert_eq!(fallback.priority, None);
        assert_eq!(fallback.sort_priority(), DEFAULT_PRIORITY);
        assert!(fallback.enabled);
        assert!(fallback.add_timestamp);
        assert!(!fallback.delete_source);
        assert_eq!(fallback.pattern_type, PatternType::Prefix);
        assert_eq!(fallback.source_pattern, "");
        assert!(fallback.file_types.is_empty());
    }

    #[test]
    fn test_stable_sort_on_equal_priority() {
        let set = RoutingConfigSet::new(vec![
            RoutingRule::new("first", "A/", "b", "p/").with_priority(3),
            RoutingRule::new("second", "A/", "b", "p/").with_priority(3),
            RoutingRule::new("zero", "A/", "b", "p/").with_priority(0),
            RoutingRule::new("third", "A/", "b", "p/").with_priority(3),
        ]);
        let names: Vec<_> = set.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["zero", "first", "second", "third"]);
    }

    #[test]
    fn test_unknown_pattern_type_decodes() {
        let set = RoutingConfigSet::from_json(
            r#"[{"name": "legacy", "pattern_type": "multi_prefix",
                 "destination_bucket": "b", "destination_prefix": "p/"}]"#,
        )
        .unwrap();
        assert_eq!(
            set.rules()[0].pattern_type,
            PatternType::Unsupported("multi_prefix".to_string())
        );
    }

    #[test]
    fn test_undecodable_rule_is_dropped() {
        let set = RoutingConfigSet::from_json(
            r#"[
                {"name": "no-destination"},
                {"name": "bad-filter", "pattern_type": "prefix_with_filename_filter",
                 "filename_filter": {"type": "glob", "value": "*"},
                 "destination_bucket": "b", "destination_prefix": "p/"},
                {"name": "ok", "destination_bucket": "b", "destination_prefix": "p/"}
            ]"#,
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.rules()[0].name, "ok");
    }

    #[test]
    fn test_non_array_document_is_malformed() {
        let result = RoutingConfigSet::from_json(r#"{"rules": []}"#);
        assert!(matches!(result, Err(ConfigError::MalformedRules { .. })));

        let result = RoutingConfigSet::from_json("not json");
        assert!(matches!(result, Err(ConfigError::MalformedRules { .. })));
    }

    #[test]
    fn test_empty_filter_object_means_no_filter() {
        let set = RoutingConfigSet::from_json(
            r#"[{"name": "r", "filename_filter": {}, "destination_bucket": "b", "destination_prefix": "p/"}]"#,
        )
        .unwrap();
        assert_eq!(set.rules()[0].filename_filter, Some(FilenameFilter::None));
    }

    #[test]
    fn test_validate_reports_issues() {
        let set = RoutingConfigSet::from_json(
            r#"[
                {"name": "dup", "destination_bucket": "b", "destination_prefix": "p/"},
                {"name": "dup", "pattern_type": "glob", "source_pattern": "Inbox",
                 "destination_bucket": "b", "destination_prefix": "p/"},
                {"name": "regex", "pattern_type": "prefix_with_filename_filter",
                 "filename_filter": {"type": "regex", "value": "("},
                 "destination_bucket": "b", "destination_prefix": "p/"},
                {"name": "nofilter", "pattern_type": "prefix_with_filename_filter",
                 "destination_bucket": "b", "destination_prefix": "p/"}
            ]"#,
        )
        .unwrap();

        let issues = set.validate();
        assert!(issues.iter().any(|i| matches!(i.kind, IssueKind::DuplicateName)));
        assert!(issues
            .iter()
            .any(|i| matches!(i.kind, IssueKind::UnsupportedPatternType(_))));
        assert!(issues
            .iter()
            .any(|i| matches!(i.kind, IssueKind::SourcePatternWithoutSeparator)));
        assert!(issues
            .iter()
            .any(|i| i.rule == "regex" && matches!(i.kind, IssueKind::InvalidFilter(_))));
        assert!(issues
            .iter()
            .any(|i| i.rule == "nofilter" && matches!(i.kind, IssueKind::MissingFilenameFilter)));
    }

    #[test]
    fn test_clean_document_has_no_issues() {
        let set = RoutingConfigSet::from_json(DOCUMENT).unwrap();
        assert!(set.validate().is_empty());
    }

    #[test]
    fn test_smart_routing_keeps_document_keyword_order() {
        let set = RoutingConfigSet::from_json(
            r#"[{
                "name": "Punchh",
                "source_pattern": "Punchh/",
                "destination_bucket": "vendor",
                "destination_prefix": "Other/",
                "smart_routing": {
                    "keyword_mapping": {"redemption": "Redemptions/", "checkin": "CheckIns/", "check": "Checks/"},
                    "default_destination": "Other/raw/"
                }
            }]"#,
        )
        .unwrap();

        let smart = set.rules()[0].smart_routing.as_ref().unwrap();
        let keywords: Vec<_> = smart.keyword_mapping.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keywords, vec!["redemption", "checkin", "check"]);

        let dest = smart.route("Punchh/daily_CheckIns_2024.csv");
        assert_eq!(dest.matched_keyword, "checkin");
        assert_eq!(dest.destination_prefix, "CheckIns/");
    }
}
