//! The runtime form of a channel: a loaded [`Manifest`] paired with a
//! backend, a blocklist, and the channel instances it transitively
//! requires. This is where stream matching, the no-stream fallback, and
//! the depth-first requirement search actually happen.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use channel_core::backend::ArtifactBackend;
use channel_core::blocklist::Blocklist;
use channel_core::channel_def::NoStreamStrategy;
use channel_core::coordinate::ArtifactRequest;
use channel_core::manifest::Manifest;
use channel_core::repository::Repository;
use channel_core::stream::{Stream, VersionSelector};
use channel_core::version;
use channel_core::ResolvedArtifact;
use channel_util::errors::{ChannelError, ChannelResult};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The outcome of [`ChannelInstance::resolve_latest_version`]: a version
/// plus the channel instance that should be asked to fetch it.
#[derive(Clone)]
pub struct ResolvedVersion {
    pub version: String,
    pub channel: Arc<ChannelInstance>,
}

/// A loaded channel: its manifest, its backend, and (once wired by
/// [`crate::session::Session::build`]) the channel instances its manifest
/// requires. Built once per session; never mutated except for the
/// one-time `required` wiring and the `is_dependency` / `closed` flags.
pub struct ChannelInstance {
    pub name: Option<String>,
    pub manifest: Manifest,
    pub backend: Arc<dyn ArtifactBackend>,
    pub repositories: Vec<Repository>,
    pub blocklist: Blocklist,
    pub no_stream_strategy: NoStreamStrategy,
    required: OnceCell<Vec<Arc<ChannelInstance>>>,
    is_dependency: AtomicBool,
    closed: AtomicBool,
}

impl ChannelInstance {
    pub fn new(
        name: Option<String>,
        manifest: Manifest,
        backend: Arc<dyn ArtifactBackend>,
        repositories: Vec<Repository>,
        blocklist: Blocklist,
        no_stream_strategy: NoStreamStrategy,
    ) -> Self {
        Self {
            name,
            manifest,
            backend,
            repositories,
            blocklist,
            no_stream_strategy,
            required: OnceCell::new(),
            is_dependency: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Wire this instance's already-resolved requirement list. Called
    /// exactly once, by the session builder, after the instance (and any
    /// siblings it might reference) already exist.
    pub fn set_required(&self, required: Vec<Arc<ChannelInstance>>) {
        self.required
            .set(required)
            .unwrap_or_else(|_| panic!("ChannelInstance::set_required called twice"));
    }

    pub fn required(&self) -> &[Arc<ChannelInstance>] {
        self.required.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mark this instance as a session dependency: it was reached via a
    /// sibling `requires` reference, so it may not also be a session root.
    pub fn mark_dependency(&self) {
        self.is_dependency.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_dependency(&self) -> bool {
        self.is_dependency.load(AtomicOrdering::Relaxed)
    }

    /// The resolution contract (spec §4.4): stream match, depth-first
    /// delegation to required channels, then the no-stream fallback.
    #[instrument(skip(self), fields(channel = self.name.as_deref().unwrap_or("<unnamed>")))]
    pub fn resolve_latest_version<'a>(
        self: &'a Arc<Self>,
        group_id: &'a str,
        artifact_id: &'a str,
        extension: Option<&'a str>,
        classifier: Option<&'a str>,
        base_version: Option<&'a str>,
    ) -> BoxFuture<'a, ChannelResult<Option<ResolvedVersion>>> {
        Box::pin(async move {
            if let Some(stream) = self.manifest.find_stream(group_id, artifact_id) {
                debug!(%group_id, %artifact_id, "stream matched");
                let resolved = self
                    .resolve_via_stream(stream, group_id, artifact_id, extension, classifier)
                    .await?;
                return Ok(Some(resolved));
            }

            debug!(%group_id, %artifact_id, "no stream matched, delegating to required channels");
            for child in self.required() {
                if let Some(hit) = child
                    .resolve_latest_version(group_id, artifact_id, extension, classifier, base_version)
                    .await?
                {
                    return Ok(Some(hit));
                }
            }

            self.fallback(group_id, artifact_id, extension, classifier, base_version)
                .await
        })
    }

    async fn resolve_via_stream(
        self: &Arc<Self>,
        stream: &Stream,
        group_id: &str,
        artifact_id: &str,
        extension: Option<&str>,
        classifier: Option<&str>,
    ) -> ChannelResult<ResolvedVersion> {
        match &stream.selector {
            VersionSelector::Fixed(v) => Ok(ResolvedVersion {
                version: v.clone(),
                channel: self.clone(),
            }),
            VersionSelector::Pattern(re) => {
                let _ = (extension, classifier);
                let all = self.backend.all_versions(group_id, artifact_id).await?;
                let allowed = self.blocklist.filter(group_id, artifact_id, all.iter().map(String::as_str));
                let matching: Vec<&str> = allowed
                    .into_iter()
                    .filter(|candidate| version::matches(candidate, re))
                    .collect();
                match version::latest_of(matching) {
                    Some(v) => Ok(ResolvedVersion {
                        version: v.to_string(),
                        channel: self.clone(),
                    }),
                    None => Err(ChannelError::ArtifactNotResolved {
                        group: group_id.to_string(),
                        artifact: artifact_id.to_string(),
                    }
                    .into()),
                }
            }
            VersionSelector::VersionsSet(set) => {
                let all = self.backend.all_versions(group_id, artifact_id).await?;
                let allowed = self.blocklist.filter(group_id, artifact_id, all.iter().map(String::as_str));
                let matching: Vec<&str> = allowed.into_iter().filter(|candidate| set.contains(*candidate)).collect();
                match version::latest_of(matching) {
                    Some(v) => Ok(ResolvedVersion {
                        version: v.to_string(),
                        channel: self.clone(),
                    }),
                    None => Err(ChannelError::ArtifactNotResolved {
                        group: group_id.to_string(),
                        artifact: artifact_id.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    async fn fallback(
        self: &Arc<Self>,
        group_id: &str,
        artifact_id: &str,
        _extension: Option<&str>,
        _classifier: Option<&str>,
        base_version: Option<&str>,
    ) -> ChannelResult<Option<ResolvedVersion>> {
        match self.no_stream_strategy {
            NoStreamStrategy::None => Ok(None),
            NoStreamStrategy::Latest => {
                warn!(%group_id, %artifact_id, "falling back to LATEST no-stream strategy");
                let all = self.backend.all_versions(group_id, artifact_id).await?;
                let allowed = self.blocklist.filter(group_id, artifact_id, all.iter().map(String::as_str));
                Ok(version::latest_of(allowed).map(|v| ResolvedVersion {
                    version: v.to_string(),
                    channel: self.clone(),
                }))
            }
            NoStreamStrategy::MavenLatest => {
                warn!(%group_id, %artifact_id, "falling back to MAVEN_LATEST no-stream strategy");
                Ok(self
                    .backend
                    .metadata_latest_version(group_id, artifact_id)
                    .await?
                    .map(|v| ResolvedVersion {
                        version: v,
                        channel: self.clone(),
                    }))
            }
            NoStreamStrategy::MavenRelease => {
                warn!(%group_id, %artifact_id, "falling back to MAVEN_RELEASE no-stream strategy");
                Ok(self
                    .backend
                    .metadata_release_version(group_id, artifact_id)
                    .await?
                    .map(|v| ResolvedVersion {
                        version: v,
                        channel: self.clone(),
                    }))
            }
            NoStreamStrategy::Original => Ok(base_version.map(|v| ResolvedVersion {
                version: v.to_string(),
                channel: self.clone(),
            })),
        }
    }

    pub async fn resolve_artifact(&self, request: &ArtifactRequest) -> ChannelResult<ResolvedArtifact> {
        self.backend.resolve_artifact(request).await
    }

    pub async fn resolve_artifacts(&self, requests: &[ArtifactRequest]) -> ChannelResult<Vec<ResolvedArtifact>> {
        self.backend.resolve_artifacts(requests).await
    }

    /// Close this instance's backend, and recursively every required
    /// instance's. Safe to call more than once: each instance only
    /// forwards to its backend the first time.
    pub fn close<'a>(&'a self) -> BoxFuture<'a, ChannelResult<()>> {
        Box::pin(async move {
            for child in self.required() {
                child.close().await?;
            }
            if self.closed.swap(true, AtomicOrdering::SeqCst) {
                return Ok(());
            }
            self.backend.close().await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryArtifactBackend;
    use channel_core::manifest::ManifestSpec;
    use channel_core::stream::StreamSpec;

    fn manifest(streams: Vec<StreamSpec>) -> Manifest {
        Manifest::from_spec(ManifestSpec {
            schema_version: "1.0.0".to_string(),
            id: None,
            name: None,
            logical_version: None,
            description: None,
            streams,
            requires: vec![],
        })
        .unwrap()
    }

    fn stream_spec(group: &str, artifact: &str, version: Option<&str>, pattern: Option<&str>) -> StreamSpec {
        StreamSpec {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.map(str::to_string),
            version_pattern: pattern.map(str::to_string),
            versions: None,
        }
    }

    fn instance(manifest: Manifest, backend: InMemoryArtifactBackend) -> Arc<ChannelInstance> {
        Arc::new(ChannelInstance::new(
            Some("test".to_string()),
            manifest,
            Arc::new(backend),
            vec![],
            Blocklist::default(),
            NoStreamStrategy::None,
        ))
    }

    #[tokio::test]
    async fn fixed_stream_resolves_without_backend_lookup() {
        let manifest = manifest(vec![stream_spec("org.example", "widget", Some("1.2.3"), None)]);
        let ch = instance(manifest, InMemoryArtifactBackend::new());
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "widget", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "1.2.3");
    }

    #[tokio::test]
    async fn pattern_stream_picks_latest_matching() {
        let manifest = manifest(vec![stream_spec("org.example", "widget", None, Some(r"1\..*"))]);
        let backend = InMemoryArtifactBackend::new().with_versions(
            "org.example",
            "widget",
            &["1.0.0", "1.2.3", "2.0.0"],
        );
        let ch = instance(manifest, backend);
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "widget", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "1.2.3");
    }

    #[tokio::test]
    async fn pattern_stream_with_no_match_is_an_error() {
        let manifest = manifest(vec![stream_spec("org.example", "widget", None, Some(r"9\..*"))]);
        let backend = InMemoryArtifactBackend::new().with_versions("org.example", "widget", &["1.0.0"]);
        let ch = instance(manifest, backend);
        ch.set_required(vec![]);
        let result = ch.resolve_latest_version("org.example", "widget", None, None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn wildcard_stream_matches_any_artifact_in_group() {
        let manifest = manifest(vec![stream_spec("org.example", "*", None, Some(".*"))]);
        let backend = InMemoryArtifactBackend::new().with_versions("org.example", "util", &["9.0.0"]);
        let ch = instance(manifest, backend);
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "util", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "9.0.0");
    }

    #[tokio::test]
    async fn no_stream_strategy_latest_falls_back() {
        let manifest = manifest(vec![]);
        let backend = InMemoryArtifactBackend::new().with_versions("org.example", "widget", &["1.0.0", "2.0.0", "3.0.0"]);
        let ch = Arc::new(ChannelInstance::new(
            None,
            manifest,
            Arc::new(backend),
            vec![],
            Blocklist::default(),
            NoStreamStrategy::Latest,
        ));
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "widget", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "3.0.0");
    }

    #[tokio::test]
    async fn no_stream_strategy_none_returns_none() {
        let manifest = manifest(vec![]);
        let backend = InMemoryArtifactBackend::new().with_versions("org.example", "widget", &["1.0.0"]);
        let ch = instance(manifest, backend);
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "widget", None, None, None)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn no_stream_strategy_original_uses_base_version() {
        let manifest = manifest(vec![]);
        let ch = Arc::new(ChannelInstance::new(
            None,
            manifest,
            Arc::new(InMemoryArtifactBackend::new()),
            vec![],
            Blocklist::default(),
            NoStreamStrategy::Original,
        ));
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "widget", None, None, Some("0.9.0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "0.9.0");
    }

    #[tokio::test]
    async fn depth_first_delegates_to_required_channels_in_order() {
        let parent_manifest = manifest(vec![]);
        let child1_manifest = manifest(vec![]);
        let child2_manifest = manifest(vec![stream_spec("org.example", "widget", Some("4.5.6"), None)]);

        let child1 = instance(child1_manifest, InMemoryArtifactBackend::new());
        child1.set_required(vec![]);
        let child2 = instance(child2_manifest, InMemoryArtifactBackend::new());
        child2.set_required(vec![]);

        let parent = instance(parent_manifest, InMemoryArtifactBackend::new());
        parent.set_required(vec![child1, child2]);

        let resolved = parent
            .resolve_latest_version("org.example", "widget", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "4.5.6");
    }

    #[tokio::test]
    async fn blocklist_excludes_candidate_from_pattern_selection() {
        let manifest = manifest(vec![stream_spec("org.example", "widget", None, Some(r".*"))]);
        let backend = InMemoryArtifactBackend::new().with_versions("org.example", "widget", &["1.0.0", "2.0.0"]);
        let blocklist = Blocklist::from_specs(vec![channel_core::blocklist::BlocklistEntrySpec {
            group_id: "org.example".to_string(),
            artifact_id: "widget".to_string(),
            version: Some("2.0.0".to_string()),
            version_pattern: None,
        }])
        .unwrap();
        let ch = Arc::new(ChannelInstance::new(
            None,
            manifest,
            Arc::new(backend),
            vec![],
            blocklist,
            NoStreamStrategy::None,
        ));
        ch.set_required(vec![]);
        let resolved = ch
            .resolve_latest_version("org.example", "widget", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version, "1.0.0");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let ch = instance(manifest(vec![]), InMemoryArtifactBackend::new());
        ch.set_required(vec![]);
        ch.close().await.unwrap();
        ch.close().await.unwrap();
    }
}
