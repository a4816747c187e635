//! Streams: the unit of version selection within a channel.
//!
//! A stream binds a `groupId:artifactId` (the artifactId may be the `"*"`
//! wildcard) to exactly one of three selector kinds. The wildcard groupId is
//! not supported: a stream literally declaring `groupId: "*"` never matches
//! anything, rather than silently becoming a catch-all.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use channel_util::errors::ChannelError;

/// Wire format for a stream entry, as it appears under a channel's `streams:` list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamSpec {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "versionPattern")]
    pub version_pattern: Option<String>,
    #[serde(default)]
    pub versions: Option<Vec<String>>,
}

/// How a stream picks a version once it has matched a coordinate.
#[derive(Debug, Clone)]
pub enum VersionSelector {
    /// Always resolves to this exact version, regardless of what the backend offers.
    Fixed(String),
    /// Resolves to the backend's latest version matching this pattern.
    Pattern(Regex),
    /// Resolves to the backend's latest version that is a member of this set.
    VersionsSet(HashSet<String>),
}

/// A validated stream: a coordinate matcher paired with a version selector.
#[derive(Debug, Clone)]
pub struct Stream {
    pub group_id: String,
    pub artifact_id: String,
    pub selector: VersionSelector,
}

impl Stream {
    /// Validate a [`StreamSpec`], enforcing that exactly one of
    /// `version` / `versionPattern` / `versions` is set.
    pub fn from_spec(spec: StreamSpec) -> Result<Self, ChannelError> {
        let set_count = [
            spec.version.is_some(),
            spec.version_pattern.is_some(),
            spec.versions.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if set_count != 1 {
            return Err(ChannelError::InvalidChannel {
                message: format!(
                    "stream {}:{} must set exactly one of version, versionPattern, versions (found {})",
                    spec.group_id, spec.artifact_id, set_count
                ),
            });
        }

        let selector = if let Some(version) = spec.version {
            VersionSelector::Fixed(version)
        } else if let Some(pattern) = spec.version_pattern {
            let regex = Regex::new(&pattern).map_err(|e| ChannelError::InvalidChannel {
                message: format!(
                    "stream {}:{} has an invalid versionPattern: {e}",
                    spec.group_id, spec.artifact_id
                ),
            })?;
            VersionSelector::Pattern(regex)
        } else {
            VersionSelector::VersionsSet(spec.versions.unwrap().into_iter().collect())
        };

        Ok(Self {
            group_id: spec.group_id,
            artifact_id: spec.artifact_id,
            selector,
        })
    }

    /// Whether this stream applies to `(group_id, artifact_id)`.
    ///
    /// The groupId must match exactly. The artifactId may match exactly, or
    /// the stream may declare the `"*"` wildcard artifactId. A stream whose
    /// own groupId is `"*"` never matches anything.
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        if self.group_id == "*" {
            return false;
        }
        self.group_id == group_id && (self.artifact_id == artifact_id || self.artifact_id == "*")
    }

    /// Whether this stream's artifactId is the wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.artifact_id == "*"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(group: &str, artifact: &str, version: Option<&str>) -> StreamSpec {
        StreamSpec {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.map(str::to_string),
            version_pattern: None,
            versions: None,
        }
    }

    #[test]
    fn rejects_zero_selectors() {
        let spec = spec("org.example", "widget", None);
        assert!(Stream::from_spec(spec).is_err());
    }

    #[test]
    fn rejects_multiple_selectors() {
        let mut spec = spec("org.example", "widget", Some("1.0.0"));
        spec.versions = Some(vec!["1.0.0".to_string()]);
        assert!(Stream::from_spec(spec).is_err());
    }

    #[test]
    fn exact_match_beats_wildcard_by_construction() {
        let exact = Stream::from_spec(spec("org.example", "widget", Some("1.0.0"))).unwrap();
        let wildcard = Stream::from_spec(spec("org.example", "*", Some("2.0.0"))).unwrap();
        assert!(exact.matches("org.example", "widget"));
        assert!(wildcard.matches("org.example", "widget"));
        assert!(wildcard.matches("org.example", "anything"));
        assert!(!wildcard.matches("org.other", "widget"));
    }

    #[test]
    fn wildcard_group_id_never_matches() {
        let stream = Stream::from_spec(spec("*", "widget", Some("1.0.0"))).unwrap();
        assert!(!stream.matches("org.example", "widget"));
        assert!(!stream.matches("*", "widget"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut spec = spec("org.example", "widget", None);
        spec.version_pattern = Some("(".to_string());
        assert!(Stream::from_spec(spec).is_err());
    }
}
