//! End-to-end scenarios driven entirely through the public [`Session`] API
//! and the in-memory test backend, exercising the resolution contract the
//! way an embedder actually calls it.

use std::sync::Arc;

use channel_core::blocklist::Blocklist;
use channel_core::channel_def::NoStreamStrategy;
use channel_core::manifest::{Manifest, ManifestRequirement, ManifestSpec, MavenRef};
use channel_core::stream::{StreamSpec, VersionSelector};
use channel_resolver::test_support::{InMemoryArtifactBackend, InMemoryBackendFactory};
use channel_resolver::{ChannelDefinition, CoordinateRequest, Session};

fn fixed_stream(group: &str, artifact: &str, version: &str) -> StreamSpec {
    StreamSpec {
        group_id: group.to_string(),
        artifact_id: artifact.to_string(),
        version: Some(version.to_string()),
        version_pattern: None,
        versions: None,
    }
}

fn pattern_stream(group: &str, artifact: &str, pattern: &str) -> StreamSpec {
    StreamSpec {
        group_id: group.to_string(),
        artifact_id: artifact.to_string(),
        version: None,
        version_pattern: Some(pattern.to_string()),
        versions: None,
    }
}

fn definition(
    id: Option<&str>,
    streams: Vec<StreamSpec>,
    requires: Vec<ManifestRequirement>,
    strategy: NoStreamStrategy,
) -> ChannelDefinition {
    let manifest = Manifest::from_spec(ManifestSpec {
        schema_version: "1.0.0".to_string(),
        id: id.map(str::to_string),
        name: id.map(str::to_string),
        logical_version: None,
        description: None,
        streams,
        requires,
    })
    .unwrap();
    ChannelDefinition {
        name: id.map(str::to_string),
        description: None,
        manifest,
        repositories: vec![],
        blocklist: Blocklist::default(),
        no_stream_strategy: strategy,
    }
}

// S1: a fixed-version stream resolves without consulting repository metadata.
#[tokio::test]
async fn fixed_stream_resolution() {
    let definitions = vec![definition(
        None,
        vec![fixed_stream("org.example", "widget", "1.2.3")],
        vec![],
        NoStreamStrategy::None,
    )];
    let backend = InMemoryArtifactBackend::new();
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend.clone())))
        .await
        .unwrap();

    let resolved = session
        .resolve_maven_artifact(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    assert_eq!(resolved.request.version, "1.2.3");
    assert_eq!(backend.fetch_log().len(), 1);
}

// S2: a pattern stream resolves to the greatest matching version on offer.
#[tokio::test]
async fn pattern_stream_resolution() {
    let definitions = vec![definition(
        None,
        vec![pattern_stream("org.example", "widget", r"2\..*")],
        vec![],
        NoStreamStrategy::None,
    )];
    let backend = InMemoryArtifactBackend::new().with_versions("org.example", "widget", &["1.9.0", "2.0.0", "2.4.1"]);
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    let version = session
        .find_latest_maven_artifact_version(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    assert_eq!(version, "2.4.1");
}

// S3: two channels both declare a stream for the same coordinate; the
// session-wide winner is the greater of the two, regardless of declaration order.
#[tokio::test]
async fn cross_channel_arbitration_picks_the_greater_version() {
    let definitions = vec![
        definition(Some("a"), vec![fixed_stream("org.example", "widget", "3.0.0")], vec![], NoStreamStrategy::None),
        definition(Some("b"), vec![fixed_stream("org.example", "widget", "2.9.9")], vec![], NoStreamStrategy::None),
    ];
    let backend = InMemoryArtifactBackend::new();
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    let resolved = session
        .resolve_maven_artifact(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    assert_eq!(resolved.request.version, "3.0.0");
}

// Ties in arbitration favor the earliest declared root.
#[tokio::test]
async fn arbitration_ties_favor_the_earliest_root() {
    let definitions = vec![
        definition(Some("first"), vec![fixed_stream("org.example", "widget", "1.0.0")], vec![], NoStreamStrategy::None),
        definition(Some("second"), vec![fixed_stream("org.example", "widget", "1.0.0")], vec![], NoStreamStrategy::None),
    ];
    let backend = InMemoryArtifactBackend::new();
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    let resolved = session
        .resolve_maven_artifact(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    assert_eq!(resolved.request.version, "1.0.0");
}

// S4: a wildcard artifactId stream matches any artifact within its group.
#[tokio::test]
async fn wildcard_stream_fallback() {
    let definitions = vec![definition(None, vec![pattern_stream("org.example", "*", ".*")], vec![], NoStreamStrategy::None)];
    let backend = InMemoryArtifactBackend::new().with_versions("org.example", "anything", &["7.1.0"]);
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    let version = session
        .find_latest_maven_artifact_version(CoordinateRequest::new("org.example", "anything"))
        .await
        .unwrap();
    assert_eq!(version, "7.1.0");
}

// S5: with no matching stream, NoStreamStrategy::MavenRelease consults the backend's release marker.
#[tokio::test]
async fn no_stream_strategy_maven_release() {
    let definitions = vec![definition(None, vec![], vec![], NoStreamStrategy::MavenRelease)];
    let backend = InMemoryArtifactBackend::new().with_release("org.example", "widget", "5.0.0");
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    let version = session
        .find_latest_maven_artifact_version(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    assert_eq!(version, "5.0.0");
}

// S6: a requirement cycle across two channels is rejected at session construction.
#[tokio::test]
async fn cyclic_requirement_is_rejected() {
    let a_requires = vec![ManifestRequirement {
        id: Some("b".to_string()),
        maven: None,
    }];
    let b_requires = vec![ManifestRequirement {
        id: Some("a".to_string()),
        maven: None,
    }];
    let definitions = vec![
        definition(Some("a"), vec![], a_requires, NoStreamStrategy::None),
        definition(Some("b"), vec![], b_requires, NoStreamStrategy::None),
    ];
    let backend = InMemoryArtifactBackend::new();
    let result = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await;
    assert!(result.is_err());
}

// S7: recording every resolution made in a session yields a manifest that,
// replayed as a single channel, reproduces the same coordinate resolutions.
#[tokio::test]
async fn recorded_resolutions_replay_deterministically() {
    let definitions = vec![
        definition(Some("a"), vec![fixed_stream("org.example", "widget", "1.0.0")], vec![], NoStreamStrategy::None),
        definition(Some("b"), vec![fixed_stream("org.other", "gadget", "4.4.4")], vec![], NoStreamStrategy::None),
    ];
    let backend = InMemoryArtifactBackend::new();
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    session.resolve_maven_artifact(CoordinateRequest::new("org.example", "widget")).await.unwrap();
    session.resolve_maven_artifact(CoordinateRequest::new("org.other", "gadget")).await.unwrap();

    let recorded = session.get_recorded_channel().await;
    assert_eq!(recorded.streams.len(), 2);

    let replay_def = ChannelDefinition {
        name: Some("replay".to_string()),
        description: None,
        manifest: recorded,
        repositories: vec![],
        blocklist: Blocklist::default(),
        no_stream_strategy: NoStreamStrategy::None,
    };
    let replay_backend = InMemoryArtifactBackend::new();
    let replay_session = Session::build(vec![replay_def], Arc::new(InMemoryBackendFactory(replay_backend))).await.unwrap();

    let widget = replay_session
        .find_latest_maven_artifact_version(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    assert_eq!(widget, "1.0.0");
    let gadget = replay_session
        .find_latest_maven_artifact_version(CoordinateRequest::new("org.other", "gadget"))
        .await
        .unwrap();
    assert_eq!(gadget, "4.4.4");
}

// A Maven-required sub-manifest inherits its requiring channel's blocklist and
// no-stream strategy, since a bare manifest declares neither.
#[tokio::test]
async fn maven_required_manifest_inherits_blocklist_and_strategy() {
    let required_yaml = "schemaVersion: \"1.0.0\"\nid: required\nstreams:\n  - groupId: org.example\n    artifactId: widget\n    versionPattern: \".*\"\n";
    let backend = InMemoryArtifactBackend::new()
        .with_document("mem://org.example/required-channel", required_yaml)
        .with_versions("org.example", "widget", &["1.0.0", "2.0.0"]);

    let manifest = Manifest::from_spec(ManifestSpec {
        schema_version: "1.0.0".to_string(),
        id: Some("root".to_string()),
        name: None,
        logical_version: None,
        description: None,
        streams: vec![],
        requires: vec![ManifestRequirement {
            id: None,
            maven: Some(MavenRef {
                group_id: "org.example".to_string(),
                artifact_id: "required-channel".to_string(),
                version: "1.0.0".to_string(),
            }),
        }],
    })
    .unwrap();

    let blocklist = Blocklist::from_specs(vec![channel_core::blocklist::BlocklistEntrySpec {
        group_id: "org.example".to_string(),
        artifact_id: "widget".to_string(),
        version: Some("2.0.0".to_string()),
        version_pattern: None,
    }])
    .unwrap();

    let root = ChannelDefinition {
        name: Some("root".to_string()),
        description: None,
        manifest,
        repositories: vec![],
        blocklist,
        no_stream_strategy: NoStreamStrategy::None,
    };

    let session = Session::build(vec![root], Arc::new(InMemoryBackendFactory(backend))).await.unwrap();
    let version = session
        .find_latest_maven_artifact_version(CoordinateRequest::new("org.example", "widget"))
        .await
        .unwrap();
    // 2.0.0 is blocked by the root's inherited blocklist, so 1.0.0 wins.
    assert_eq!(version, "1.0.0");
}

// Batched resolution groups requests by winning channel and honors each
// coordinate's own base_version independently.
#[tokio::test]
async fn batched_resolution_groups_by_channel_and_keeps_base_versions_independent() {
    let definitions = vec![
        definition(Some("a"), vec![fixed_stream("org.example", "widget", "1.0.0")], vec![], NoStreamStrategy::Original),
        definition(Some("b"), vec![fixed_stream("org.other", "gadget", "2.0.0")], vec![], NoStreamStrategy::Original),
    ];
    let backend = InMemoryArtifactBackend::new();
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();

    let mut widget_request = CoordinateRequest::new("org.example", "widget");
    widget_request.base_version = Some("0.0.1".to_string());
    let mut gadget_request = CoordinateRequest::new("org.other", "gadget");
    gadget_request.base_version = Some("0.0.2".to_string());

    let resolved = session.resolve_maven_artifacts(vec![widget_request, gadget_request]).await.unwrap();
    let mut versions: Vec<&str> = resolved.iter().map(|r| r.request.version.as_str()).collect();
    versions.sort();
    assert_eq!(versions, vec!["1.0.0", "2.0.0"]);
}

#[tokio::test]
async fn session_close_is_idempotent() {
    let definitions = vec![definition(None, vec![], vec![], NoStreamStrategy::None)];
    let backend = InMemoryArtifactBackend::new();
    let session = Session::build(definitions, Arc::new(InMemoryBackendFactory(backend))).await.unwrap();
    session.close().await.unwrap();
    session.close().await.unwrap();
}
