//! Rule matching and resolution for object routing
//!
//! This crate decides where an object key should be routed:
//!
//! - Decoding of the JSON routing rules document into a priority-sorted set
//! - Declarative filename filters (prefix, suffix, substring, regex, combinations)
//! - Exact-folder rule matching with file type allow-lists
//! - First-match resolution over the sorted rules
//! - Keyword-based destination prefixes (`smart_routing`)
//!
//! # Examples
//!
//! ```rust
//! use filerouter_filter::RoutingConfigSet;
//!
//! let rules = RoutingConfigSet::from_json(r#"[
//!     {
//!         "name": "Inbox CSV",
//!         "priority": 1,
//!         "source_pattern": "Inbox/",
//!         "file_types": [".csv"],
//!         "destination_bucket": "dst",
//!         "destination_prefix": "Out/"
//!     }
//! ]"#).unwrap();
//!
//! let rule = rules.resolve("Inbox/data.csv").unwrap();
//! assert_eq!(rule.destination_prefix, "Out/");
//!
//! assert!(rules.resolve("Inbox/Sub/data.csv").is_none());
//! assert!(rules.resolve("Inbox/data.txt").is_none());
//! ```

pub mod config;
pub mod path;
pub mod router;
pub mod rules;
pub mod smart;

// Re-export commonly used types
pub use config::{IssueKind, PatternType, RoutingConfigSet, RoutingRule, RuleIssue, DEFAULT_PRIORITY};
pub use router::{match_rule, resolve, MatchOutcome};
pub use rules::{file_type_allowed, CompiledRegex, FilenameFilter, MatchLogic};
pub use smart::{SmartDestination, SmartRouting, DEFAULT_KEYWORD};
