//! The artifact backend port.
//!
//! `channel-core` depends only on this trait, never on a concrete HTTP or
//! filesystem implementation. `channel-maven` provides the bundled
//! implementation; tests substitute an in-memory one.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use channel_util::errors::ChannelResult;

use crate::coordinate::ArtifactRequest;
use crate::repository::Repository;

/// A resolved artifact file on local disk, handed back to the caller.
///
/// The backend is responsible for placing the file somewhere readable;
/// whether that is a persistent location or a throwaway temp file is the
/// backend's concern, not the resolver's.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub request: ArtifactRequest,
    pub path: PathBuf,
}

/// A reference to a channel manifest published at Maven coordinates,
/// passed to [`ArtifactBackend::resolve_channel_metadata`] to locate the
/// manifest document's URL without yet downloading or parsing it.
#[derive(Debug, Clone)]
pub struct ChannelMetadataRef {
    pub group_id: String,
    pub artifact_id: String,
    /// `None` means "resolve to the latest published version".
    pub version: Option<String>,
}

/// Fetches artifacts and version metadata for Maven coordinates.
///
/// Implementations are expected to be cheap to clone (an `Arc` internally,
/// or a thin HTTP client handle) since the resolver holds one instance per
/// channel for the lifetime of a resolution session.
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Fetch a single artifact file, returning where it was placed on disk.
    async fn resolve_artifact(&self, request: &ArtifactRequest) -> ChannelResult<ResolvedArtifact>;

    /// Fetch several artifact files, preserving `requests`' order in the result.
    async fn resolve_artifacts(
        &self,
        requests: &[ArtifactRequest],
    ) -> ChannelResult<Vec<ResolvedArtifact>>;

    /// All versions a repository publishes for `group_id:artifact_id`.
    ///
    /// Returns an empty set, not an error, when the coordinate is simply
    /// absent from every configured repository.
    async fn all_versions(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> ChannelResult<HashSet<String>>;

    /// The `<latest>` marker from `maven-metadata.xml`, if published.
    async fn metadata_latest_version(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> ChannelResult<Option<String>>;

    /// The `<release>` marker from `maven-metadata.xml`, if published.
    async fn metadata_release_version(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> ChannelResult<Option<String>>;

    /// Resolve manifest references to their document URLs, without fetching them.
    async fn resolve_channel_metadata(
        &self,
        refs: &[ChannelMetadataRef],
    ) -> ChannelResult<Vec<String>>;

    /// Fetch the raw text of a channel or manifest document at `url`.
    ///
    /// Used for `ManifestSource::Url` and for the URLs returned by
    /// [`Self::resolve_channel_metadata`]; parsing the YAML is the caller's job.
    async fn fetch_document(&self, url: &str) -> ChannelResult<String>;

    /// Release any held resources (connection pools, temp directories). Must
    /// be safe to call more than once.
    async fn close(&self) -> ChannelResult<()>;
}

/// Builds an [`ArtifactBackend`] scoped to a set of repositories.
///
/// A channel's repository list is turned into one backend instance via
/// this factory; the resolver never constructs a backend directly.
pub trait BackendFactory: Send + Sync {
    fn create(&self, repositories: &[Repository]) -> Arc<dyn ArtifactBackend>;
}
