//! Filename filters and the file-type gate
//!
//! A [`FilenameFilter`] is a closed set of declarative predicates over the
//! final path segment of an object key. Filters decode from the `type`-tagged
//! JSON objects found in the routing rules document.

use crate::path;
use filerouter_core::FilterError;
use regex::{Regex, RegexBuilder};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;
use tracing::trace;

/// How the results of nested filters are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchLogic {
    /// At least one nested filter must pass (OR)
    #[default]
    Any,
    /// Every nested filter must pass (AND)
    All,
}

impl fmt::Display for MatchLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchLogic::Any => write!(f, "any"),
            MatchLogic::All => write!(f, "all"),
        }
    }
}

impl Serialize for MatchLogic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// Only "any" selects OR; every other string selects AND.
impl<'de> Deserialize<'de> for MatchLogic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(if value == "any" {
            MatchLogic::Any
        } else {
            MatchLogic::All
        })
    }
}

/// A declarative filename predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilenameFilter {
    /// Filename starts with `value`
    StartsWith { value: String, case_sensitive: bool },
    /// Filename does not start with `value`
    NotStartsWith { value: String, case_sensitive: bool },
    /// Filename ends with `value`
    EndsWith { value: String, case_sensitive: bool },
    /// Filename contains `value`
    Contains { value: String, case_sensitive: bool },
    /// Regex search (not a full match) anywhere in the filename
    Regex {
        value: String,
        case_sensitive: bool,
        #[serde(skip)]
        compiled: CompiledRegex,
    },
    /// Combination of nested filters
    MultiplePatterns {
        patterns: Vec<FilenameFilter>,
        match_logic: MatchLogic,
    },
    /// Always passes
    None,
}

impl FilenameFilter {
    /// Creates a regex filter; the pattern is compiled on first use.
    pub fn regex(value: impl Into<String>, case_sensitive: bool) -> Self {
        FilenameFilter::Regex {
            value: value.into(),
            case_sensitive,
            compiled: CompiledRegex::default(),
        }
    }

    /// Evaluates this filter against a filename.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidRegex`] when a regex pattern (here or in a
    /// nested filter) does not compile.
    pub fn evaluate(&self, filename: &str) -> Result<bool, FilterError> {
        let result = match self {
            FilenameFilter::StartsWith {
                value,
                case_sensitive,
            } => compare(filename, value, *case_sensitive, |f, v| f.starts_with(v)),
            FilenameFilter::NotStartsWith {
                value,
                case_sensitive,
            } => !compare(filename, value, *case_sensitive, |f, v| f.starts_with(v)),
            FilenameFilter::EndsWith {
                value,
                case_sensitive,
            } => compare(filename, value, *case_sensitive, |f, v| f.ends_with(v)),
            FilenameFilter::Contains {
                value,
                case_sensitive,
            } => compare(filename, value, *case_sensitive, |f, v| f.contains(v)),
            FilenameFilter::Regex {
                value,
                case_sensitive,
                compiled,
            } => compiled.get(value, *case_sensitive)?.is_match(filename),
            FilenameFilter::MultiplePatterns {
                patterns,
                match_logic,
            } => {
                let results = patterns
                    .iter()
                    .map(|p| p.evaluate(filename))
                    .collect::<Result<Vec<_>, _>>()?;

                let combined = match match_logic {
                    MatchLogic::Any => results.iter().any(|r| *r),
                    MatchLogic::All => results.iter().all(|r| *r),
                };

                trace!(
                    filename,
                    results = ?results,
                    match_logic = %match_logic,
                    result = combined,
                    "Multiple patterns evaluated"
                );

                return Ok(combined);
            }
            FilenameFilter::None => true,
        };

        trace!(filename, filter = %self.describe(), result, "Filename filter evaluated");

        Ok(result)
    }

    /// Returns a human-readable description of this filter.
    pub fn describe(&self) -> String {
        match self {
            FilenameFilter::StartsWith { value, .. } => format!("starts_with('{}')", value),
            FilenameFilter::NotStartsWith { value, .. } => format!("not_starts_with('{}')", value),
            FilenameFilter::EndsWith { value, .. } => format!("ends_with('{}')", value),
            FilenameFilter::Contains { value, .. } => format!("contains('{}')", value),
            FilenameFilter::Regex { value, .. } => format!("regex('{}')", value),
            FilenameFilter::MultiplePatterns {
                patterns,
                match_logic,
            } => {
                let descriptions: Vec<_> = patterns.iter().map(|p| p.describe()).collect();
                format!("{}({})", match_logic, descriptions.join(", "))
            }
            FilenameFilter::None => "none".to_string(),
        }
    }

    /// Returns every regex pattern in this filter that fails to compile.
    pub fn invalid_patterns(&self) -> Vec<FilterError> {
        match self {
            FilenameFilter::Regex {
                value,
                case_sensitive,
                compiled,
            } => match compiled.get(value, *case_sensitive) {
                Ok(_) => Vec::new(),
                Err(e) => vec![e],
            },
            FilenameFilter::MultiplePatterns { patterns, .. } => {
                patterns.iter().flat_map(|p| p.invalid_patterns()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A regex pattern compiled at most once per filter.
///
/// A pattern that fails to compile keeps failing with the same reason on
/// every evaluation.
#[derive(Debug, Clone, Default)]
pub struct CompiledRegex(OnceLock<Result<Regex, String>>);

impl CompiledRegex {
    fn get(&self, pattern: &str, case_sensitive: bool) -> Result<&Regex, FilterError> {
        self.0
            .get_or_init(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|reason| FilterError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: reason.clone(),
            })
    }

    /// Returns true once the pattern has been compiled (or rejected).
    pub fn is_initialized(&self) -> bool {
        self.0.get().is_some()
    }
}

// The compiled form is derived from the pattern, so it never affects equality.
impl PartialEq for CompiledRegex {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[inline]
fn compare(filename: &str, value: &str, case_sensitive: bool, op: fn(&str, &str) -> bool) -> bool {
    if case_sensitive {
        op(filename, value)
    } else {
        op(&filename.to_lowercase(), &value.to_lowercase())
    }
}

/// Wire form of a filter with an explicit `type` tag.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedFilter {
    StartsWith {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    NotStartsWith {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    EndsWith {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    Contains {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    Regex {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    MultiplePatterns {
        #[serde(default)]
        patterns: Vec<FilenameFilter>,
        #[serde(default)]
        match_logic: MatchLogic,
    },
    None,
}

impl From<TaggedFilter> for FilenameFilter {
    fn from(tagged: TaggedFilter) -> Self {
        match tagged {
            TaggedFilter::StartsWith {
                value,
                case_sensitive,
            } => FilenameFilter::StartsWith {
                value,
                case_sensitive,
            },
            TaggedFilter::NotStartsWith {
                value,
                case_sensitive,
            } => FilenameFilter::NotStartsWith {
                value,
                case_sensitive,
            },
            TaggedFilter::EndsWith {
                value,
                case_sensitive,
            } => FilenameFilter::EndsWith {
                value,
                case_sensitive,
            },
            TaggedFilter::Contains {
                value,
                case_sensitive,
            } => FilenameFilter::Contains {
                value,
                case_sensitive,
            },
            TaggedFilter::Regex {
                value,
                case_sensitive,
            } => FilenameFilter::regex(value, case_sensitive),
            TaggedFilter::MultiplePatterns {
                patterns,
                match_logic,
            } => FilenameFilter::MultiplePatterns {
                patterns,
                match_logic,
            },
            TaggedFilter::None => FilenameFilter::None,
        }
    }
}

// An object without a `type` key is the "no filter" filter; unknown types are
// rejected.
impl<'de> Deserialize<'de> for FilenameFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::deserialize(deserializer)?;
        if !map.contains_key("type") {
            return Ok(FilenameFilter::None);
        }

        serde_json::from_value::<TaggedFilter>(serde_json::Value::Object(map))
            .map(FilenameFilter::from)
            .map_err(D::Error::custom)
    }
}

/// Checks a filename against an extension allow-list.
///
/// An empty list allows everything. Comparison is case-insensitive on both
/// sides; a filename without a dot has extension `""` and only passes when
/// `""` is listed.
pub fn file_type_allowed(filename: &str, allowed_types: &[String]) -> bool {
    if allowed_types.is_empty() {
        return true;
    }

    let ext = path::extension(filename).to_lowercase();
    allowed_types.iter().any(|t| t.to_lowercase() == ext)
}
