//! Resolves a `requires` entry to a [`Manifest`], either by sibling channel
//! id or by Maven coordinates fetched through an artifact backend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use channel_core::backend::{ArtifactBackend, ChannelMetadataRef};
use channel_core::manifest::{Manifest, ManifestRequirement, ManifestSpec};
use channel_util::errors::{ChannelError, ChannelResult};

/// Looks up manifests by sibling id or loads them by Maven coordinates,
/// caching the latter under `(groupId, artifactId, version)` for the
/// lifetime of a session.
pub struct ManifestResolver {
    cache: Mutex<HashMap<(String, String, String), Manifest>>,
}

impl ManifestResolver {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve one `requires` entry.
    ///
    /// `siblings` maps a channel's declared manifest `id` to its already-loaded
    /// `Manifest`, scoped to the current session's channel list.
    pub async fn resolve(
        &self,
        requirement: &ManifestRequirement,
        backend: &Arc<dyn ArtifactBackend>,
        siblings: &HashMap<String, Manifest>,
    ) -> ChannelResult<Manifest> {
        if let Some(maven) = &requirement.maven {
            let key = (
                maven.group_id.clone(),
                maven.artifact_id.clone(),
                maven.version.clone(),
            );
            if let Some(cached) = self.cache.lock().await.get(&key) {
                return Ok(cached.clone());
            }

            let refs = [ChannelMetadataRef {
                group_id: maven.group_id.clone(),
                artifact_id: maven.artifact_id.clone(),
                version: Some(maven.version.clone()),
            }];
            let urls = backend.resolve_channel_metadata(&refs).await?;
            let url = urls.first().ok_or_else(|| ChannelError::UnresolvedRequiredManifest {
                id: format!("{}:{}:{}", maven.group_id, maven.artifact_id, maven.version),
            })?;
            let content = backend.fetch_document(url).await?;
            let spec: ManifestSpec =
                serde_yaml::from_str(&content).map_err(|e| ChannelError::InvalidChannel {
                    message: format!("required manifest {key:?} is not valid YAML: {e}"),
                })?;
            let manifest = Manifest::from_spec(spec)?;

            self.cache.lock().await.insert(key, manifest.clone());
            return Ok(manifest);
        }

        if let Some(id) = &requirement.id {
            return siblings
                .get(id)
                .cloned()
                .ok_or_else(|| ChannelError::UnresolvedRequiredManifest { id: id.clone() }.into());
        }

        Err(ChannelError::InvalidChannel {
            message: "a requires entry must set either id or maven coordinates".to_string(),
        }
        .into())
    }
}

impl Default for ManifestResolver {
    fn default() -> Self {
        Self::new()
    }
}
