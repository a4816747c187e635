//! Channel definitions: a manifest source, its repositories, blocklist, and
//! no-stream fallback policy.

use serde::{Deserialize, Serialize};

use crate::blocklist::BlocklistEntrySpec;
use crate::repository::Repository;

/// Where a channel's manifest document comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ManifestSource {
    /// A manifest fetched directly from a URL.
    Url { url: String },
    /// A manifest published as a Maven artifact. `version: None` means
    /// "resolve to the latest published version" at load time.
    Maven {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(rename = "artifactId")]
        artifact_id: String,
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        signature: Option<GpgSignatureRef>,
    },
}

/// GPG key reference attached to a signed manifest source.
///
/// Accepted for schema compatibility only: signature verification is an
/// external collaborator's concern and is never performed by this crate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpgSignatureRef {
    #[serde(rename = "keyId")]
    pub key_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Fallback behavior when no stream in a channel (or its requirements)
/// matches a requested coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoStreamStrategy {
    /// Resolution simply fails for this channel; the session tries other roots.
    None,
    /// Use the comparator-greatest version the backend reports, blocklist applied.
    Latest,
    /// Use the `<latest>` marker from the backend's repository metadata.
    MavenLatest,
    /// Use the `<release>` marker from the backend's repository metadata.
    MavenRelease,
    /// Use the caller-supplied base version verbatim, if one was given.
    Original,
}

impl Default for NoStreamStrategy {
    fn default() -> Self {
        NoStreamStrategy::None
    }
}

/// Wire format for a channel definition document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelDefinitionSpec {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "manifest")]
    pub manifest_source: ManifestSource,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default, rename = "blocklist")]
    pub blocklist_source: Vec<BlocklistEntrySpec>,
    #[serde(default, rename = "noStreamStrategy")]
    pub no_stream_strategy: NoStreamStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stream_strategy_defaults_to_none() {
        assert_eq!(NoStreamStrategy::default(), NoStreamStrategy::None);
    }

    #[test]
    fn manifest_source_maven_deserializes_without_version() {
        let yaml = "groupId: org.example\nartifactId: channel\n";
        let source: ManifestSource = serde_yaml::from_str(yaml).unwrap();
        match source {
            ManifestSource::Maven { version, .. } => assert!(version.is_none()),
            ManifestSource::Url { .. } => panic!("expected Maven variant"),
        }
    }

    #[test]
    fn manifest_source_url_deserializes() {
        let yaml = "url: https://example.test/manifest.yaml\n";
        let source: ManifestSource = serde_yaml::from_str(yaml).unwrap();
        match source {
            ManifestSource::Url { url } => assert_eq!(url, "https://example.test/manifest.yaml"),
            ManifestSource::Maven { .. } => panic!("expected Url variant"),
        }
    }
}
