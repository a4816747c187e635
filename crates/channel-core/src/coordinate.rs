//! Maven artifact coordinates.

use std::fmt;

/// A Maven `groupId:artifactId` pair, without a version.
///
/// This is the shape streams match against. Fetching an actual artifact
/// needs more ([`ArtifactRequest`]): an optional extension and classifier,
/// and a concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl ArtifactCoordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A fully-qualified request to fetch one artifact file from a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRequest {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: Option<String>,
    pub classifier: Option<String>,
    pub version: String,
}

impl ArtifactRequest {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: None,
            classifier: None,
            version: version.into(),
        }
    }

    pub fn coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }
}

impl fmt::Display for ArtifactRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        if let Some(extension) = &self.extension {
            write!(f, "@{extension}")?;
        }
        Ok(())
    }
}
