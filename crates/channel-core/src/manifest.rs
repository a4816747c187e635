//! Manifests: a named collection of streams plus required sub-manifests.

use serde::{Deserialize, Serialize};

use channel_util::errors::ChannelError;

use crate::stream::{Stream, StreamSpec};

/// A Maven coordinate reference used by a [`ManifestRequirement`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MavenRef {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    pub version: String,
}

/// Wire format for a `requires` entry: either a sibling channel id, or
/// Maven coordinates resolved through an artifact backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestRequirement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub maven: Option<MavenRef>,
}

/// Wire format for a manifest document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestSpec {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "logical-version")]
    pub logical_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub streams: Vec<StreamSpec>,
    #[serde(default)]
    pub requires: Vec<ManifestRequirement>,
}

/// A validated manifest: a deduplicated, lexicographically ordered list of
/// streams plus the sub-manifests it requires.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub schema_version: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub logical_version: Option<String>,
    pub description: Option<String>,
    pub streams: Vec<Stream>,
    pub requires: Vec<ManifestRequirement>,
}

impl Manifest {
    /// Validate a [`ManifestSpec`]: every stream must parse, and no two
    /// streams may share a `(groupId, artifactId)` pair.
    pub fn from_spec(spec: ManifestSpec) -> Result<Self, ChannelError> {
        let mut streams = Vec::with_capacity(spec.streams.len());
        for stream_spec in spec.streams {
            streams.push(Stream::from_spec(stream_spec)?);
        }
        streams.sort_by(|a, b| (&a.group_id, &a.artifact_id).cmp(&(&b.group_id, &b.artifact_id)));

        for pair in streams.windows(2) {
            if pair[0].group_id == pair[1].group_id && pair[0].artifact_id == pair[1].artifact_id {
                return Err(ChannelError::InvalidChannel {
                    message: format!(
                        "duplicate stream {}:{} in manifest {}",
                        pair[0].group_id,
                        pair[0].artifact_id,
                        spec.id.as_deref().unwrap_or("<unnamed>")
                    ),
                });
            }
        }

        Ok(Self {
            schema_version: spec.schema_version,
            id: spec.id,
            name: spec.name,
            logical_version: spec.logical_version,
            description: spec.description,
            streams,
            requires: spec.requires,
        })
    }

    /// The stream matching `(group_id, artifact_id)`, preferring an exact
    /// artifactId match over a `"*"` wildcard one.
    pub fn find_stream(&self, group_id: &str, artifact_id: &str) -> Option<&Stream> {
        self.streams
            .iter()
            .filter(|s| s.matches(group_id, artifact_id))
            .min_by_key(|s| s.is_wildcard())
    }
}
