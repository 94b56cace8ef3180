// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Version key canonicalization
//!
//! Firmware builds show up in three shapes: dash-delimited strings from the
//! support API (`"7.2.1-69057-5"`), split XML fields from the update feed and
//! the `(build_ver, build_num, nano)` triple of API records. All of them end up
//! as one [`VersionKey`].

use serde::{Serialize, Serializer};
use std::fmt;

const DEFAULT_BUILD: &str = "00000";
const DEFAULT_PHASE: &str = "0";

/// Canonical identity of one firmware build.
///
/// Build number and phase are kept as strings, so `"069057"` and `"69057"`
/// are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionKey {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build_number: String,
    pub build_phase: String,
}

impl VersionKey {
    /// Parse a `"X.Y.Z-build-phase"` string. Never fails; absent segments take
    /// their defaults, empty ones stay empty and unparsable numbers become `0`.
    pub fn parse(s: &str) -> Self {
        let mut segments = s.trim().split('-');
        let numbers = segments.next().unwrap_or_default();
        let mut parts = numbers.split('.');

        let major = parse_number(parts.next());
        let minor = parse_number(parts.next());
        let patch = parse_number(parts.next());

        Self {
            major,
            minor,
            patch,
            build_number: segment_or(segments.next(), DEFAULT_BUILD),
            build_phase: segment_or(segments.next(), DEFAULT_PHASE),
        }
    }

    /// Build a key from the split fields of an update feed item.
    pub fn from_parts(
        major: &str,
        minor: &str,
        patch: &str,
        build_number: &str,
        build_phase: &str,
    ) -> Self {
        Self {
            major: parse_number(Some(major)),
            minor: parse_number(Some(minor)),
            patch: parse_number(Some(patch)),
            build_number: build_number.trim().to_string(),
            build_phase: build_phase.trim().to_string(),
        }
    }

    /// Build a key from an API record's `build_ver`, `build_num` and `nano`.
    pub fn from_build(build_ver: &str, build_num: &str, nano: &str) -> Self {
        Self::parse(&format!("{build_ver}-{build_num}-{nano}"))
    }

    /// Canonical `"major.minor.patch-build-phase"` form.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}-{}-{}",
            self.major, self.minor, self.patch, self.build_number, self.build_phase
        )
    }
}

impl Serialize for VersionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether an API `build_ver` belongs to the tracked major generation.
pub fn has_major_prefix(build_ver: &str, major: u32) -> bool {
    build_ver.trim().starts_with(&major.to_string())
}

fn parse_number(part: Option<&str>) -> u32 {
    part.and_then(|p| p.trim().parse::<u32>().ok()).unwrap_or(0)
}

fn segment_or(part: Option<&str>, default: &str) -> String {
    part.map_or_else(|| default.to_string(), |p| p.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let key = VersionKey::parse("7.2.1-42962-5");
        assert_eq!(key.major, 7);
        assert_eq!(key.minor, 2);
        assert_eq!(key.patch, 1);
        assert_eq!(key.build_number, "42962");
        assert_eq!(key.build_phase, "5");
        assert_eq!(key.render(), "7.2.1-42962-5");
    }

    #[test]
    fn test_parse_fills_defaults() {
        assert_eq!(VersionKey::parse("7").render(), "7.0.0-00000-0");
        assert_eq!(VersionKey::parse("7.1").render(), "7.1.0-00000-0");
        assert_eq!(VersionKey::parse("7.1-42218").render(), "7.1.0-42218-0");
        assert_eq!(VersionKey::parse("").render(), "0.0.0-00000-0");
    }

    #[test]
    fn test_parse_malformed_numbers_become_zero() {
        let key = VersionKey::parse("seven.x.1-64570-3");
        assert_eq!(key.render(), "0.0.1-64570-3");
    }

    #[test]
    fn test_padding_is_significant() {
        let a = VersionKey::parse("7.2.1-69057-1");
        let b = VersionKey::parse("7.2.1-069057-1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_parts_matches_parse() {
        let key = VersionKey::from_parts("7", "2", "1", "69057", "1");
        assert_eq!(key, VersionKey::parse("7.2.1-69057-1"));

        let empty = VersionKey::from_parts("7", "2", "", "", "");
        assert_eq!(empty.render(), "7.2.0--");
        assert_eq!(empty, VersionKey::parse("7.2--"));
    }

    #[test]
    fn test_empty_segments_are_kept() {
        let key = VersionKey::parse("7.2.1--5");
        assert_eq!(key.build_number, "");
        assert_eq!(key.render(), "7.2.1--5");
        assert_eq!(VersionKey::parse("7.2.1-69057-").render(), "7.2.1-69057-");
        assert_ne!(key, VersionKey::parse("7.2.1-00000-5"));
    }

    #[test]
    fn test_from_build() {
        let key = VersionKey::from_build("7.2.2", "72806", "3");
        assert_eq!(key.render(), "7.2.2-72806-3");

        // Two-part build versions get a zero patch
        assert_eq!(
            VersionKey::from_build("7.0", "41890", "0").render(),
            "7.0.0-41890-0"
        );
    }

    #[test]
    fn test_ordering_is_numeric_on_version_parts() {
        let older = VersionKey::parse("7.2.1-69057-1");
        let newer = VersionKey::parse("7.10.0-70000-0");
        assert!(older < newer);
    }

    #[test]
    fn test_serializes_as_canonical_string() {
        let key = VersionKey::parse("7.1.1-42962-6");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"7.1.1-42962-6\"");
    }

    #[test]
    fn test_has_major_prefix() {
        assert!(has_major_prefix("7.2.1", 7));
        assert!(!has_major_prefix("1.3.1", 7));
        assert!(!has_major_prefix("6.2.4", 7));
    }
}
