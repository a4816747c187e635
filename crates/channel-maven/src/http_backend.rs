//! The bundled [`ArtifactBackend`] implementation: real Maven repositories over HTTP.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use channel_core::backend::{ArtifactBackend, BackendFactory, ChannelMetadataRef, ResolvedArtifact};
use channel_core::{ArtifactRequest, Repository};
use channel_util::config::ResolverConfig;
use channel_util::errors::{ChannelError, ChannelResult};

use crate::download;
use crate::metadata;
use crate::repository::MavenRepository;

/// Fetches artifacts and version metadata from a list of real Maven repositories.
///
/// Repositories are tried in declared order; the first one that answers
/// (with a file, or a non-empty metadata document) wins. An empty
/// `repositories` list falls back to Maven Central.
pub struct HttpArtifactBackend {
    client: Client,
    repositories: Vec<MavenRepository>,
    config: ResolverConfig,
}

impl HttpArtifactBackend {
    pub fn new(repositories: Vec<MavenRepository>, config: ResolverConfig) -> ChannelResult<Self> {
        let client = download::build_client(&config)?;
        let repositories = if repositories.is_empty() {
            vec![MavenRepository::maven_central()]
        } else {
            repositories
        };
        Ok(Self {
            client,
            repositories,
            config,
        })
    }
}

#[async_trait]
impl ArtifactBackend for HttpArtifactBackend {
    #[instrument(skip(self), fields(request = %request))]
    async fn resolve_artifact(&self, request: &ArtifactRequest) -> ChannelResult<ResolvedArtifact> {
        let extension = request.extension.as_deref().unwrap_or("jar");
        for repo in &self.repositories {
            let url = repo.artifact_url(
                &request.group_id,
                &request.artifact_id,
                &request.version,
                extension,
                request.classifier.as_deref(),
            );
            if let Some(path) =
                download::download_to_file(&self.client, repo, &url, &request.to_string()).await?
            {
                debug!(repo = %repo.id, %url, "resolved artifact");
                return Ok(ResolvedArtifact {
                    request: request.clone(),
                    path,
                });
            }
        }

        Err(ChannelError::UnresolvedMavenArtifact {
            group: request.group_id.clone(),
            artifact: request.artifact_id.clone(),
        }
        .into())
    }

    async fn resolve_artifacts(
        &self,
        requests: &[ArtifactRequest],
    ) -> ChannelResult<Vec<ResolvedArtifact>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.resolve_artifact(request).await?);
        }
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn all_versions(&self, group_id: &str, artifact_id: &str) -> ChannelResult<HashSet<String>> {
        let mut versions = HashSet::new();
        for repo in &self.repositories {
            let url = repo.metadata_url(group_id, artifact_id);
            if let Some(xml) = download::download_text(&self.client, repo, &url, &self.config).await? {
                let meta = metadata::parse_metadata(&xml)?;
                versions.extend(meta.versions);
            }
        }
        Ok(versions)
    }

    async fn metadata_latest_version(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> ChannelResult<Option<String>> {
        for repo in &self.repositories {
            let url = repo.metadata_url(group_id, artifact_id);
            if let Some(xml) = download::download_text(&self.client, repo, &url, &self.config).await? {
                let meta = metadata::parse_metadata(&xml)?;
                if meta.latest.is_some() {
                    return Ok(meta.latest);
                }
            }
        }
        Ok(None)
    }

    async fn metadata_release_version(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> ChannelResult<Option<String>> {
        for repo in &self.repositories {
            let url = repo.metadata_url(group_id, artifact_id);
            if let Some(xml) = download::download_text(&self.client, repo, &url, &self.config).await? {
                let meta = metadata::parse_metadata(&xml)?;
                if meta.release.is_some() {
                    return Ok(meta.release);
                }
            }
        }
        Ok(None)
    }

    async fn resolve_channel_metadata(
        &self,
        refs: &[ChannelMetadataRef],
    ) -> ChannelResult<Vec<String>> {
        let repo = self.repositories.first().ok_or_else(|| ChannelError::Generic {
            message: "no repositories configured to resolve channel metadata".to_string(),
        })?;

        let mut urls = Vec::with_capacity(refs.len());
        for reference in refs {
            let version = match &reference.version {
                Some(v) => v.clone(),
                None => self
                    .metadata_latest_version(&reference.group_id, &reference.artifact_id)
                    .await?
                    .ok_or_else(|| ChannelError::UnresolvedMavenArtifact {
                        group: reference.group_id.clone(),
                        artifact: reference.artifact_id.clone(),
                    })?,
            };
            urls.push(repo.artifact_url(
                &reference.group_id,
                &reference.artifact_id,
                &version,
                "yaml",
                None,
            ));
        }
        Ok(urls)
    }

    async fn fetch_document(&self, url: &str) -> ChannelResult<String> {
        // The configured repository a URL belongs to only matters for auth;
        // try each until one accepts the request.
        for repo in &self.repositories {
            if let Some(text) = download::download_text(&self.client, repo, url, &self.config).await? {
                return Ok(text);
            }
        }
        Err(ChannelError::Network {
            message: format!("document not found at {url}"),
        }
        .into())
    }

    async fn close(&self) -> ChannelResult<()> {
        Ok(())
    }
}

/// Builds [`HttpArtifactBackend`] instances scoped to a channel's repositories.
pub struct HttpBackendFactory {
    config: ResolverConfig,
}

impl HttpBackendFactory {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for HttpBackendFactory {
    fn create(&self, repositories: &[Repository]) -> Arc<dyn ArtifactBackend> {
        let repositories = repositories
            .iter()
            .map(MavenRepository::from_repository)
            .collect();
        let backend = HttpArtifactBackend::new(repositories, self.config)
            .expect("building a reqwest client should not fail under default TLS config");
        Arc::new(backend)
    }
}
