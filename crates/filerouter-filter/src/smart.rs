//! Keyword-based destination prefixes
//!
//! A rule may carry a `smart_routing` block mapping keywords to destination
//! prefixes. Once the rule has been selected, the source key is searched for
//! each keyword in document order; the first hit picks the prefix, otherwise
//! the default destination is used.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Keyword reported when no keyword matched.
pub const DEFAULT_KEYWORD: &str = "default";

/// Keyword to prefix mapping attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRouting {
    /// Keyword to destination prefix, in document order
    #[serde(
        serialize_with = "serialize_pairs",
        deserialize_with = "deserialize_pairs"
    )]
    pub keyword_mapping: Vec<(String, String)>,

    /// Prefix used when no keyword matches
    pub default_destination: String,
}

/// Destination prefix chosen by smart routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartDestination {
    pub destination_prefix: String,
    pub matched_keyword: String,
}

impl SmartRouting {
    /// Picks the destination prefix for a source key.
    ///
    /// Keywords are searched case-insensitively anywhere in the key.
    pub fn route(&self, source_key: &str) -> SmartDestination {
        let source_lower = source_key.to_lowercase();

        for (keyword, prefix) in &self.keyword_mapping {
            if source_lower.contains(&keyword.to_lowercase()) {
                debug!(keyword = %keyword, prefix = %prefix, "Smart routing keyword matched");
                return SmartDestination {
                    destination_prefix: prefix.clone(),
                    matched_keyword: keyword.clone(),
                };
            }
        }

        debug!(prefix = %self.default_destination, "Smart routing fell back to default");
        SmartDestination {
            destination_prefix: self.default_destination.clone(),
            matched_keyword: DEFAULT_KEYWORD.to_string(),
        }
    }
}

fn serialize_pairs<S: Serializer>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (k, v) in pairs {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

fn deserialize_pairs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of keyword to destination prefix")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((k, v)) = access.next_entry::<String, String>()? {
                pairs.push((k, v));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smart() -> SmartRouting {
        serde_json::from_str(
            r#"{
                "keyword_mapping": {"checkin": "CheckIns/raw/", "redemption": "Redemptions/raw/", "check": "Checks/"},
                "default_destination": "Other/"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_keyword_order_is_preserved() {
        let routing = smart();
        let keywords: Vec<_> = routing.keyword_mapping.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keywords, vec!["checkin", "redemption", "check"]);
    }

    #[test]
    fn test_first_keyword_wins() {
        let dest = smart().route("Punchh/daily_CheckIns_2024.csv");
        assert_eq!(dest.destination_prefix, "CheckIns/raw/");
        assert_eq!(dest.matched_keyword, "checkin");
    }

    #[test]
    fn test_case_insensitive_search_over_whole_key() {
        let dest = smart().route("REDEMPTION/export.csv");
        assert_eq!(dest.destination_prefix, "Redemptions/raw/");
    }

    #[test]
    fn test_default_destination() {
        let dest = smart().route("Punchh/users.csv");
        assert_eq!(dest.destination_prefix, "Other/");
        assert_eq!(dest.matched_keyword, DEFAULT_KEYWORD);
    }

    #[test]
    fn test_serialization_keeps_map_shape() {
        let json = serde_json::to_value(smart()).unwrap();
        assert_eq!(json["keyword_mapping"]["checkin"], "CheckIns/raw/");
        assert_eq!(json["default_destination"], "Other/");
    }
}
