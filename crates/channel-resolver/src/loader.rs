//! Loads a [`ChannelDefinitionSpec`] into a ready-to-use
//! [`ChannelDefinition`]: fetches and parses its manifest document,
//! validates the manifest and blocklist, and leaves the channel ready for
//! [`crate::session::Session::build`].
//!
//! A session resolves `manifestSource` once per channel definition, up
//! front, before any channel instances exist — this is the step that does
//! that.

use std::sync::Arc;

use channel_core::backend::{BackendFactory, ChannelMetadataRef};
use channel_core::blocklist::Blocklist;
use channel_core::channel_def::{ChannelDefinitionSpec, ManifestSource};
use channel_core::manifest::{Manifest, ManifestSpec};
use channel_util::errors::{ChannelError, ChannelResult};

use crate::definition::ChannelDefinition;

/// Fetch and validate a channel definition's manifest, producing a
/// [`ChannelDefinition`] ready to be handed to [`crate::session::Session::build`].
pub async fn load_channel_definition(
    spec: ChannelDefinitionSpec,
    backend_factory: &dyn BackendFactory,
) -> ChannelResult<ChannelDefinition> {
    let backend = backend_factory.create(&spec.repositories);

    let manifest_text = match &spec.manifest_source {
        ManifestSource::Url { url } => backend.fetch_document(url).await?,
        ManifestSource::Maven {
            group_id,
            artifact_id,
            version,
            ..
        } => {
            let refs = [ChannelMetadataRef {
                group_id: group_id.clone(),
                artifact_id: artifact_id.clone(),
                version: version.clone(),
            }];
            let urls = backend.resolve_channel_metadata(&refs).await?;
            let url = urls.first().ok_or_else(|| ChannelError::UnresolvedMavenArtifact {
                group: group_id.clone(),
                artifact: artifact_id.clone(),
            })?;
            backend.fetch_document(url).await?
        }
    };

    let manifest_spec: ManifestSpec = serde_yaml::from_str(&manifest_text).map_err(|e| ChannelError::InvalidChannel {
        message: format!(
            "channel {:?} manifest is not valid YAML: {e}",
            spec.name.as_deref().unwrap_or("<unnamed>")
        ),
    })?;
    let manifest = Manifest::from_spec(manifest_spec)?;
    let blocklist = Blocklist::from_specs(spec.blocklist_source)?;

    Ok(ChannelDefinition {
        name: spec.name,
        description: spec.description,
        manifest,
        repositories: spec.repositories,
        blocklist,
        no_stream_strategy: spec.no_stream_strategy,
    })
}

/// Load every channel definition in `specs`, preserving input order.
pub async fn load_channel_definitions(
    specs: Vec<ChannelDefinitionSpec>,
    backend_factory: &Arc<dyn BackendFactory>,
) -> ChannelResult<Vec<ChannelDefinition>> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        out.push(load_channel_definition(spec, backend_factory.as_ref()).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryArtifactBackend, InMemoryBackendFactory};

    #[tokio::test]
    async fn loads_a_url_manifest_source() {
        let yaml = "schemaVersion: \"1.0.0\"\nid: m1\nstreams:\n  - groupId: org.example\n    artifactId: widget\n    version: \"1.0.0\"\n";
        let backend = InMemoryArtifactBackend::new().with_document("https://example.test/manifest.yaml", yaml);
        let factory = InMemoryBackendFactory(backend);

        let spec = ChannelDefinitionSpec {
            schema_version: "1.0.0".to_string(),
            name: Some("test channel".to_string()),
            description: None,
            manifest_source: ManifestSource::Url {
                url: "https://example.test/manifest.yaml".to_string(),
            },
            repositories: vec![],
            blocklist_source: vec![],
            no_stream_strategy: Default::default(),
        };

        let def = load_channel_definition(spec, &factory).await.unwrap();
        assert_eq!(def.manifest.id.as_deref(), Some("m1"));
        assert_eq!(def.manifest.streams.len(), 1);
    }

    #[tokio::test]
    async fn loads_a_maven_manifest_source() {
        let yaml = "schemaVersion: \"1.0.0\"\nid: m2\nstreams: []\n";
        let backend = InMemoryArtifactBackend::new().with_document("mem://org.example/channel", yaml);
        let factory = InMemoryBackendFactory(backend);

        let spec = ChannelDefinitionSpec {
            schema_version: "1.0.0".to_string(),
            name: None,
            description: None,
            manifest_source: ManifestSource::Maven {
                group_id: "org.example".to_string(),
                artifact_id: "channel".to_string(),
                version: Some("1.0.0".to_string()),
                signature: None,
            },
            repositories: vec![],
            blocklist_source: vec![],
            no_stream_strategy: Default::default(),
        };

        let def = load_channel_definition(spec, &factory).await.unwrap();
        assert_eq!(def.manifest.id.as_deref(), Some("m2"));
    }

    #[tokio::test]
    async fn invalid_yaml_is_reported_as_invalid_channel() {
        let backend = InMemoryArtifactBackend::new().with_document("https://example.test/bad.yaml", "not: [valid");
        let factory = InMemoryBackendFactory(backend);

        let spec = ChannelDefinitionSpec {
            schema_version: "1.0.0".to_string(),
            name: None,
            description: None,
            manifest_source: ManifestSource::Url {
                url: "https://example.test/bad.yaml".to_string(),
            },
            repositories: vec![],
            blocklist_source: vec![],
            no_stream_strategy: Default::default(),
        };

        let result = load_channel_definition(spec, &factory).await;
        assert!(result.is_err());
    }
}
