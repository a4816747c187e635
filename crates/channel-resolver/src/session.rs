//! The top-level resolver session (spec §4.5): builds the channel instance
//! forest from a list of loaded channel definitions, arbitrates the
//! winning channel for a coordinate, and records every successful
//! resolution.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use channel_core::backend::{ArtifactBackend, BackendFactory};
use channel_core::blocklist::Blocklist;
use channel_core::channel_def::NoStreamStrategy;
use channel_core::coordinate::ArtifactRequest;
use channel_core::manifest::{Manifest, ManifestRequirement};
use channel_core::repository::Repository;
use channel_core::version;
use channel_core::ResolvedArtifact;
use channel_util::errors::{ChannelError, ChannelResult};

use crate::definition::ChannelDefinition;
use crate::graph::RequirementGraph;
use crate::instance::ChannelInstance;
use crate::manifest_resolver::ManifestResolver;
use crate::recorder::Recorder;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A fully-qualified coordinate query against a session: what to resolve,
/// and (for `noStreamStrategy: ORIGINAL`) the version to fall back to.
#[derive(Debug, Clone)]
pub struct CoordinateRequest {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: Option<String>,
    pub classifier: Option<String>,
    pub base_version: Option<String>,
}

impl CoordinateRequest {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: None,
            classifier: None,
            base_version: None,
        }
    }
}

/// The resolver session: the graph of channel instances and their
/// transitively required manifests, plus the combined backend used for
/// direct (non-channel) fetches and the session-wide recorder.
pub struct Session {
    roots: Vec<Arc<ChannelInstance>>,
    combined_backend: Arc<dyn ArtifactBackend>,
    recorder: Mutex<Recorder>,
    closed: AtomicBool,
}

impl Session {
    /// Build a session from already-loaded channel definitions (see
    /// [`crate::loader::load_channel_definition`]).
    ///
    /// Steps (spec §4.5): union repositories into a combined backend,
    /// build channel instances and wire their `requires` edges (detecting
    /// cycles along the way), demote siblings reached by id reference,
    /// and reject duplicate manifest ids among the remaining roots.
    pub async fn build(
        definitions: Vec<ChannelDefinition>,
        backend_factory: Arc<dyn BackendFactory>,
    ) -> ChannelResult<Self> {
        let combined_backend = backend_factory.create(&union_repositories(&definitions));

        let root_manifests_by_id: HashMap<String, Manifest> = definitions
            .iter()
            .filter_map(|def| def.manifest_id().map(|id| (id.to_string(), def.manifest.clone())))
            .collect();

        let manifest_resolver = ManifestResolver::new();
        detect_cycles(&definitions, &root_manifests_by_id, &backend_factory, &manifest_resolver).await?;

        // Phase 2a: build the root instances themselves, with `required`
        // left unset, so sibling `requires` references have something to
        // point at regardless of declaration order.
        let mut roots: Vec<Arc<ChannelInstance>> = Vec::with_capacity(definitions.len());
        let mut by_id: HashMap<String, Arc<ChannelInstance>> = HashMap::new();
        for def in &definitions {
            let backend = backend_factory.create(&def.repositories);
            let instance = Arc::new(ChannelInstance::new(
                def.name.clone(),
                def.manifest.clone(),
                backend,
                def.repositories.clone(),
                def.blocklist.clone(),
                def.no_stream_strategy,
            ));
            if let Some(id) = def.manifest_id() {
                by_id.insert(id.to_string(), instance.clone());
            }
            roots.push(instance);
        }

        // Phase 2b: wire each root's `requires` list.
        for (def, instance) in definitions.iter().zip(roots.iter()) {
            let mut children = Vec::with_capacity(def.manifest.requires.len());
            for requirement in &def.manifest.requires {
                let child = resolve_required(
                    requirement,
                    &instance.repositories,
                    &instance.blocklist,
                    instance.no_stream_strategy,
                    &instance.backend,
                    &by_id,
                    &root_manifests_by_id,
                    &manifest_resolver,
                )
                .await?;
                children.push(child);
            }
            instance.set_required(children);
        }

        let final_roots: Vec<Arc<ChannelInstance>> = roots.into_iter().filter(|r| !r.is_dependency()).collect();

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for root in &final_roots {
            if let Some(id) = root.manifest.id.as_deref() {
                if !seen_ids.insert(id) {
                    return Err(ChannelError::DuplicateManifestId { id: id.to_string() }.into());
                }
            }
        }

        Ok(Self {
            roots: final_roots,
            combined_backend,
            recorder: Mutex::new(Recorder::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Arbitrate the winning channel+version for one coordinate: ask every
    /// root in order, keep the comparator-greatest candidate, with ties
    /// favoring the earliest root (spec §4.5 step 1-2, §9).
    async fn arbitrate(&self, request: &CoordinateRequest) -> ChannelResult<(String, Arc<ChannelInstance>)> {
        let mut best: Option<(String, Arc<ChannelInstance>)> = None;
        for root in &self.roots {
            let candidate = root
                .resolve_latest_version(
                    &request.group_id,
                    &request.artifact_id,
                    request.extension.as_deref(),
                    request.classifier.as_deref(),
                    request.base_version.as_deref(),
                )
                .await?;
            if let Some(resolved) = candidate {
                best = match best {
                    None => Some((resolved.version, resolved.channel)),
                    Some((current_version, current_channel)) => {
                        if version::compare(&resolved.version, &current_version) == Ordering::Greater {
                            Some((resolved.version, resolved.channel))
                        } else {
                            Some((current_version, current_channel))
                        }
                    }
                };
            }
        }

        best.ok_or_else(|| {
            ChannelError::UnresolvedMavenArtifact {
                group: request.group_id.clone(),
                artifact: request.artifact_id.clone(),
            }
            .into()
        })
    }

    /// Resolve one coordinate to a version, fetch it from the winning
    /// channel, and record the resolution.
    pub async fn resolve_maven_artifact(&self, request: CoordinateRequest) -> ChannelResult<ResolvedArtifact> {
        let (version, channel) = self.arbitrate(&request).await?;
        info!(group = %request.group_id, artifact = %request.artifact_id, %version, "resolved maven artifact");

        let artifact_request = ArtifactRequest {
            group_id: request.group_id.clone(),
            artifact_id: request.artifact_id.clone(),
            extension: request.extension.clone(),
            classifier: request.classifier.clone(),
            version: version.clone(),
        };
        let resolved = channel.resolve_artifact(&artifact_request).await?;
        self.recorder.lock().await.record(&request.group_id, &request.artifact_id, &version);
        Ok(resolved)
    }

    /// Batched resolution: each coordinate is arbitrated independently
    /// (honoring its own `base_version`, exactly as the singular path
    /// does — see DESIGN.md for why this implementation does not
    /// reproduce the ambiguous batched/singular discrepancy flagged in
    /// the design notes), then grouped by winning channel so each
    /// channel's artifacts are fetched in one batched backend call. The
    /// returned list is grouped by channel, not necessarily in the
    /// original request order.
    pub async fn resolve_maven_artifacts(&self, requests: Vec<CoordinateRequest>) -> ChannelResult<Vec<ResolvedArtifact>> {
        struct Group {
            channel: Arc<ChannelInstance>,
            requests: Vec<ArtifactRequest>,
            recorded: Vec<(String, String, String)>,
        }

        let mut order: Vec<usize> = Vec::new();
        let mut groups: HashMap<usize, Group> = HashMap::new();

        for request in &requests {
            let (version, channel) = self.arbitrate(request).await?;
            let key = Arc::as_ptr(&channel) as usize;

            let artifact_request = ArtifactRequest {
                group_id: request.group_id.clone(),
                artifact_id: request.artifact_id.clone(),
                extension: request.extension.clone(),
                classifier: request.classifier.clone(),
                version: version.clone(),
            };

            let group = groups.entry(key).or_insert_with(|| {
                order.push(key);
                Group {
                    channel: channel.clone(),
                    requests: Vec::new(),
                    recorded: Vec::new(),
                }
            });
            group.requests.push(artifact_request);
            group.recorded.push((request.group_id.clone(), request.artifact_id.clone(), version));
        }

        let mut results = Vec::new();
        for key in order {
            let group = groups.remove(&key).expect("order and groups stay in sync");
            let fetched = group.channel.resolve_artifacts(&group.requests).await?;
            let mut recorder = self.recorder.lock().await;
            for (group_id, artifact_id, version) in &group.recorded {
                recorder.record(group_id, artifact_id, version);
            }
            drop(recorder);
            results.extend(fetched);
        }
        Ok(results)
    }

    /// Fetch an artifact directly via the session's combined backend,
    /// bypassing channel arbitration entirely.
    pub async fn resolve_direct_maven_artifact(&self, request: ArtifactRequest) -> ChannelResult<ResolvedArtifact> {
        let resolved = self.combined_backend.resolve_artifact(&request).await?;
        self.recorder
            .lock()
            .await
            .record(&request.group_id, &request.artifact_id, &request.version);
        Ok(resolved)
    }

    pub async fn resolve_direct_maven_artifacts(&self, requests: Vec<ArtifactRequest>) -> ChannelResult<Vec<ResolvedArtifact>> {
        let resolved = self.combined_backend.resolve_artifacts(&requests).await?;
        let mut recorder = self.recorder.lock().await;
        for request in &requests {
            recorder.record(&request.group_id, &request.artifact_id, &request.version);
        }
        Ok(resolved)
    }

    /// Arbitration only, without fetching the artifact file. Does not
    /// record a resolution: no artifact action was actually taken.
    pub async fn find_latest_maven_artifact_version(&self, request: CoordinateRequest) -> ChannelResult<String> {
        Ok(self.arbitrate(&request).await?.0)
    }

    /// The synthesized replay manifest of every resolution performed so far.
    pub async fn get_recorded_channel(&self) -> Manifest {
        self.recorder.lock().await.recorded_channel()
    }

    /// Release every channel instance's backend (recursively through
    /// required channels) and the combined backend. Safe to call more
    /// than once.
    pub async fn close(&self) -> ChannelResult<()> {
        if self.closed.swap(true, AtomicOrdering::SeqCst) {
            return Ok(());
        }
        for root in &self.roots {
            root.close().await?;
        }
        self.combined_backend.close().await
    }
}

fn union_repositories(definitions: &[ChannelDefinition]) -> Vec<Repository> {
    let mut repositories: Vec<Repository> = Vec::new();
    for def in definitions {
        for repo in &def.repositories {
            if !repositories.iter().any(|r| r.id == repo.id && r.url == repo.url) {
                repositories.push(repo.clone());
            }
        }
    }
    repositories
}

/// Key a requirement by sibling id or by its Maven GAV, preferring `maven`
/// when both are set (matching [`ManifestResolver::resolve`]'s precedence).
fn requirement_key(requirement: &ManifestRequirement) -> String {
    if let Some(maven) = &requirement.maven {
        format!("maven:{}:{}:{}", maven.group_id, maven.artifact_id, maven.version)
    } else {
        format!("id:{}", requirement.id.as_deref().unwrap_or("<invalid>"))
    }
}

/// Phase 1 (spec §9): walk the requirement graph reachable from every
/// root, without yet building any channel instances, so a cycle is
/// reported before any backend work beyond what's needed to discover
/// manifests. Maven-fetched manifests are cached by [`ManifestResolver`],
/// so phase 2 does not refetch them.
async fn detect_cycles(
    definitions: &[ChannelDefinition],
    root_manifests_by_id: &HashMap<String, Manifest>,
    backend_factory: &Arc<dyn BackendFactory>,
    manifest_resolver: &ManifestResolver,
) -> ChannelResult<()> {
    let mut graph = RequirementGraph::new();

    for (index, def) in definitions.iter().enumerate() {
        let key = match def.manifest_id() {
            Some(id) => format!("id:{id}"),
            None => format!("root:{index}"),
        };
        let backend = backend_factory.create(&def.repositories);
        walk_requirements(key, &def.manifest, backend, root_manifests_by_id, manifest_resolver, &mut graph).await?;
    }

    if let Some(cycle) = graph.find_cycle() {
        return Err(ChannelError::CyclicDependency { path: cycle }.into());
    }
    Ok(())
}

fn walk_requirements<'a>(
    key: String,
    manifest: &'a Manifest,
    backend: Arc<dyn ArtifactBackend>,
    root_manifests_by_id: &'a HashMap<String, Manifest>,
    manifest_resolver: &'a ManifestResolver,
    graph: &'a mut RequirementGraph,
) -> BoxFuture<'a, ChannelResult<()>> {
    Box::pin(async move {
        graph.node(&key);
        for requirement in &manifest.requires {
            let target = requirement_key(requirement);
            graph.add_requirement(&key, &target);

            if requirement.maven.is_some() {
                let child_manifest = manifest_resolver.resolve(requirement, &backend, root_manifests_by_id).await?;
                // `child_manifest` is owned, so recurse through a small
                // boxed helper that takes it by value instead of by
                // reference, keeping this function's lifetime simple.
                walk_owned_manifest(target, child_manifest, backend.clone(), root_manifests_by_id, manifest_resolver, graph).await?;
            }
            // Sibling (`id`) requirements are not recursed into here: that
            // sibling is itself one of `definitions` and gets walked by
            // the outer loop in `detect_cycles`. Its own edges are what
            // let a cycle back through it be detected.
        }
        Ok(())
    })
}

fn walk_owned_manifest<'a>(
    key: String,
    manifest: Manifest,
    backend: Arc<dyn ArtifactBackend>,
    root_manifests_by_id: &'a HashMap<String, Manifest>,
    manifest_resolver: &'a ManifestResolver,
    graph: &'a mut RequirementGraph,
) -> BoxFuture<'a, ChannelResult<()>> {
    Box::pin(async move {
        graph.node(&key);
        for requirement in &manifest.requires {
            let target = requirement_key(requirement);
            graph.add_requirement(&key, &target);
            if requirement.maven.is_some() {
                let child_manifest = manifest_resolver.resolve(requirement, &backend, root_manifests_by_id).await?;
                walk_owned_manifest(target, child_manifest, backend.clone(), root_manifests_by_id, manifest_resolver, graph).await?;
            }
        }
        Ok(())
    })
}

/// Phase 2 (spec §9): resolve one `requires` entry into a concrete
/// instance. A sibling `id` reference reuses (and marks as a dependency)
/// the already-built root instance; a `maven` reference builds a fresh
/// instance that inherits the requiring channel's repositories, blocklist,
/// and no-stream strategy (a bare [`Manifest`] declares none of its own),
/// and recurses into its own `requires` the same way.
#[allow(clippy::too_many_arguments)]
fn resolve_required<'a>(
    requirement: &'a ManifestRequirement,
    parent_repositories: &'a [Repository],
    parent_blocklist: &'a Blocklist,
    parent_strategy: NoStreamStrategy,
    parent_backend: &'a Arc<dyn ArtifactBackend>,
    by_id: &'a HashMap<String, Arc<ChannelInstance>>,
    root_manifests_by_id: &'a HashMap<String, Manifest>,
    manifest_resolver: &'a ManifestResolver,
) -> BoxFuture<'a, ChannelResult<Arc<ChannelInstance>>> {
    Box::pin(async move {
        if requirement.maven.is_none() {
            if let Some(id) = &requirement.id {
                let sibling = by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ChannelError::UnresolvedRequiredManifest { id: id.clone() })?;
                sibling.mark_dependency();
                return Ok(sibling);
            }
        }

        let manifest = manifest_resolver.resolve(requirement, parent_backend, root_manifests_by_id).await?;
        let instance = Arc::new(ChannelInstance::new(
            manifest.name.clone(),
            manifest.clone(),
            parent_backend.clone(),
            parent_repositories.to_vec(),
            parent_blocklist.clone(),
            parent_strategy,
        ));

        let mut children = Vec::with_capacity(manifest.requires.len());
        for child_requirement in &manifest.requires {
            let child = resolve_required(
                child_requirement,
                parent_repositories,
                parent_blocklist,
                parent_strategy,
                parent_backend,
                by_id,
                root_manifests_by_id,
                manifest_resolver,
            )
            .await?;
            children.push(child);
        }
        instance.set_required(children);

        Ok(instance)
    })
}
