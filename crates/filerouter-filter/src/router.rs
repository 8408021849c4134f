//! Rule matching and resolution
//!
//! Decides whether one rule applies to one object key, and picks the first
//! applicable rule from a priority-sorted set. At most one rule is ever
//! selected.

use crate::config::{PatternType, RoutingConfigSet, RoutingRule};
use crate::path;
use crate::rules::file_type_allowed;
use tracing::{debug, trace, warn};

/// Outcome of matching one rule against one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The rule applies
    Matched,
    /// The rule is disabled
    Disabled,
    /// The file extension is not in the rule's allow-list
    FileTypeRejected,
    /// The rule's pattern type is not supported
    UnsupportedPatternType,
    /// The key's folder is not exactly the rule's source pattern
    FolderMismatch,
    /// The filename filter rejected the filename
    FilterRejected,
    /// The filename filter could not be evaluated
    FilterError,
}

impl MatchOutcome {
    /// Check if the outcome is a match
    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

/// Matches one rule against a key, reporting why it did not apply.
///
/// Checks run in a fixed order: enabled flag, file type, pattern type,
/// exact folder equality, then the filename filter for
/// `prefix_with_filename_filter` rules.
pub fn match_rule(source_key: &str, filename: &str, rule: &RoutingRule) -> MatchOutcome {
    if !rule.enabled {
        return MatchOutcome::Disabled;
    }

    if !file_type_allowed(filename, &rule.file_types) {
        return MatchOutcome::FileTypeRejected;
    }

    if !rule.pattern_type.is_supported() {
        debug!(
            rule = %rule.name,
            pattern_type = %rule.pattern_type,
            "Invalid pattern_type, must be 'prefix' or 'prefix_with_filename_filter'"
        );
        return MatchOutcome::UnsupportedPatternType;
    }

    let source_folder = path::source_folder(source_key);
    if source_folder != rule.source_pattern {
        trace!(
            rule = %rule.name,
            folder = source_folder,
            pattern = %rule.source_pattern,
            "Folder mismatch"
        );
        return MatchOutcome::FolderMismatch;
    }

    if rule.pattern_type == PatternType::PrefixWithFilenameFilter {
        let Some(filter) = &rule.filename_filter else {
            return MatchOutcome::Matched;
        };

        return match filter.evaluate(filename) {
            Ok(true) => MatchOutcome::Matched,
            Ok(false) => MatchOutcome::FilterRejected,
            Err(e) => {
                warn!(rule = %rule.name, error = %e, "Filename filter failed, rule skipped");
                MatchOutcome::FilterError
            }
        };
    }

    MatchOutcome::Matched
}

/// Returns true when a rule applies to a key.
#[inline]
pub fn matches(source_key: &str, filename: &str, rule: &RoutingRule) -> bool {
    match_rule(source_key, filename, rule).is_match()
}

/// Returns the first rule, in priority order, that applies to a key.
///
/// Hidden files and directory placeholders never match anything.
pub fn resolve<'a>(source_key: &str, rules: &'a [RoutingRule]) -> Option<&'a RoutingRule> {
    if !path::is_routable(source_key) {
        trace!(key = source_key, "Key is not routable");
        return None;
    }

    let filename = path::filename(source_key);
    let rule = rules.iter().find(|rule| matches(source_key, filename, rule))?;

    debug!(
        key = source_key,
        rule = %rule.name,
        priority = rule.sort_priority(),
        "Matched rule"
    );

    Some(rule)
}

impl RoutingConfigSet {
    /// Returns the best rule for a key, if any.
    pub fn resolve(&self, source_key: &str) -> Option<&RoutingRule> {
        resolve(source_key, self.rules())
    }
}
