//! Kernel version parsing and total ordering.
//!
//! Implements the Linux kernel numeric-versioning convention over strings
//! like `5.15.0-82-generic`: components compare as integers where both
//! sides are numeric, lexicographically where both are textual flavor tags,
//! and a missing component sorts lower than a present one. The resulting
//! `Ord` is a strict total order, which the classifier relies on to find a
//! unique latest kernel.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::ParseError;

/// One dot- or dash-separated component of a kernel version string.
///
/// Variant order matters: the derived `Ord` places numeric components below
/// textual ones, so `5.15.0-82` sorts before `5.15.0-generic`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Component {
    Num(u64),
    Text(String),
}

/// Parsed kernel version, e.g. `5.15.0-82-generic`.
///
/// Identity and ordering are defined by the component tuple alone; the raw
/// string is retained for display. Two kernels with an equal `VersionKey`
/// belong to the same kernel generation.
#[derive(Debug, Clone)]
pub struct VersionKey {
    components: Vec<Component>,
    raw: String,
}

// A version string must open with numeric major.minor to be a kernel version.
static VERSION_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+").unwrap());

impl FromStr for VersionKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        let trimmed = s.trim();
        if !VERSION_SHAPE.is_match(trimmed) {
            return Err(ParseError::UnrecognizableVersion(s.to_string()));
        }

        let components = trimmed
            .split(['.', '-'])
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<u64>() {
                Ok(n) => Component::Num(n),
                Err(_) => Component::Text(segment.to_string()),
            })
            .collect();

        Ok(VersionKey {
            components,
            raw: trimmed.to_string(),
        })
    }
}

impl VersionKey {
    /// The version string as originally reported by the host.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for VersionKey {}

impl Hash for VersionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec comparison is element-wise with shorter-is-less on a common
        // prefix, which is exactly the missing-component rule.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for VersionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> VersionKey {
        s.parse().expect("test version should parse")
    }

    #[test]
    fn test_numeric_components_compare_as_integers() {
        assert!(key("5.15.0-82-generic") < key("5.15.0-91-generic"));
        assert!(key("5.4.0-100-generic") < key("5.15.0-1-generic"));
        assert!(key("4.19.0-9") < key("5.4.0-1"));
    }

    #[test]
    fn test_missing_component_sorts_lower() {
        assert!(key("5.15.0") < key("5.15.0-1"));
        assert!(key("5.15.0-82") < key("5.15.0-82-generic"));
    }

    #[test]
    fn test_flavor_tags_compare_lexicographically() {
        assert!(key("5.15.0-82-aws") < key("5.15.0-82-generic"));
        assert!(key("5.15.0-82-generic") < key("5.15.0-82-lowlatency"));
    }

    #[test]
    fn test_numeric_sorts_below_textual() {
        assert!(key("5.15.0-82") < key("5.15.0-rc1"));
    }

    #[test]
    fn test_equality_ignores_surrounding_whitespace() {
        assert_eq!(key("5.15.0-82-generic"), key(" 5.15.0-82-generic\n"));
    }

    #[test]
    fn test_display_round_trips_raw_string() {
        assert_eq!(key("5.15.0-82-generic").to_string(), "5.15.0-82-generic");
    }

    #[test]
    fn test_rejects_non_version_strings() {
        assert!("generic".parse::<VersionKey>().is_err());
        assert!("".parse::<VersionKey>().is_err());
        assert!("linux".parse::<VersionKey>().is_err());
        assert!("5".parse::<VersionKey>().is_err());
    }

    #[test]
    fn test_scenario_latest_detection_order() {
        let mut versions = vec![key("5.4.0-1"), key("5.15.0-1"), key("5.4.0-2")];
        versions.sort();
        assert_eq!(versions.last().map(VersionKey::as_str), Some("5.15.0-1"));
    }
}
