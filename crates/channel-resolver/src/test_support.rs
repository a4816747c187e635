//! An in-memory [`ArtifactBackend`] for resolver tests, shared between this
//! crate's `#[cfg(test)]` unit tests and `tests/scenarios.rs`. Gated behind
//! the `test-support` feature (see `Cargo.toml`) rather than `cfg(test)`
//! alone, since integration tests in `tests/` link against the crate built
//! without test `cfg`.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use channel_core::backend::{ArtifactBackend, BackendFactory, ChannelMetadataRef, ResolvedArtifact};
use channel_core::coordinate::ArtifactRequest;
use channel_core::Repository;
use channel_util::errors::{ChannelError, ChannelResult};

/// A hand-populated stand-in for a real Maven repository: versions,
/// metadata markers, and documents are all registered up front by the test.
#[derive(Default, Clone)]
pub struct InMemoryArtifactBackend {
    versions: Arc<Mutex<HashMap<(String, String), HashSet<String>>>>,
    latest: Arc<Mutex<HashMap<(String, String), String>>>,
    release: Arc<Mutex<HashMap<(String, String), String>>>,
    documents: Arc<Mutex<HashMap<String, String>>>,
    fetch_log: Arc<Mutex<Vec<ArtifactRequest>>>,
}

impl InMemoryArtifactBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(self, group_id: &str, artifact_id: &str, versions: &[&str]) -> Self {
        self.versions.lock().unwrap().insert(
            (group_id.to_string(), artifact_id.to_string()),
            versions.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub fn with_latest(self, group_id: &str, artifact_id: &str, version: &str) -> Self {
        self.latest
            .lock()
            .unwrap()
            .insert((group_id.to_string(), artifact_id.to_string()), version.to_string());
        self
    }

    pub fn with_release(self, group_id: &str, artifact_id: &str, version: &str) -> Self {
        self.release
            .lock()
            .unwrap()
            .insert((group_id.to_string(), artifact_id.to_string()), version.to_string());
        self
    }

    pub fn with_document(self, url: &str, content: &str) -> Self {
        self.documents.lock().unwrap().insert(url.to_string(), content.to_string());
        self
    }

    /// Every `resolve_artifact` request this backend has seen, in order.
    pub fn fetch_log(&self) -> Vec<ArtifactRequest> {
        self.fetch_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactBackend for InMemoryArtifactBackend {
    async fn resolve_artifact(&self, request: &ArtifactRequest) -> ChannelResult<ResolvedArtifact> {
        self.fetch_log.lock().unwrap().push(request.clone());
        Ok(ResolvedArtifact {
            request: request.clone(),
            path: PathBuf::from(format!(
                "/memory/{}/{}/{}",
                request.group_id, request.artifact_id, request.version
            )),
        })
    }

    async fn resolve_artifacts(&self, requests: &[ArtifactRequest]) -> ChannelResult<Vec<ResolvedArtifact>> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            out.push(self.resolve_artifact(request).await?);
        }
        Ok(out)
    }

    async fn all_versions(&self, group_id: &str, artifact_id: &str) -> ChannelResult<HashSet<String>> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .get(&(group_id.to_string(), artifact_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn metadata_latest_version(&self, group_id: &str, artifact_id: &str) -> ChannelResult<Option<String>> {
        Ok(self
            .latest
            .lock()
            .unwrap()
            .get(&(group_id.to_string(), artifact_id.to_string()))
            .cloned())
    }

    async fn metadata_release_version(&self, group_id: &str, artifact_id: &str) -> ChannelResult<Option<String>> {
        Ok(self
            .release
            .lock()
            .unwrap()
            .get(&(group_id.to_string(), artifact_id.to_string()))
            .cloned())
    }

    async fn resolve_channel_metadata(&self, refs: &[ChannelMetadataRef]) -> ChannelResult<Vec<String>> {
        Ok(refs
            .iter()
            .map(|r| format!("mem://{}/{}", r.group_id, r.artifact_id))
            .collect())
    }

    async fn fetch_document(&self, url: &str) -> ChannelResult<String> {
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ChannelError::Network {
                message: format!("no document registered at {url}"),
            }
            .into())
    }

    async fn close(&self) -> ChannelResult<()> {
        Ok(())
    }
}

/// Hands back clones of a single [`InMemoryArtifactBackend`] regardless of
/// the repositories requested, so every channel in a test session shares
/// one pre-populated fixture.
pub struct InMemoryBackendFactory(pub InMemoryArtifactBackend);

impl BackendFactory for InMemoryBackendFactory {
    fn create(&self, _repositories: &[Repository]) -> Arc<dyn ArtifactBackend> {
        Arc::new(self.0.clone())
    }
}
