//! Core data types and the resolution contract for the channel resolver.
//!
//! This crate is the workspace's leaf: it depends only on [`channel-util`]
//! and defines the [`backend::ArtifactBackend`] port that every concrete
//! backend (HTTP, in-memory, future alternatives) implements. It owns no
//! orchestration logic — that lives in `channel-resolver`.

pub mod backend;
pub mod blocklist;
pub mod channel_def;
pub mod coordinate;
pub mod manifest;
pub mod repository;
pub mod stream;
pub mod version;

pub use backend::{ArtifactBackend, BackendFactory, ChannelMetadataRef, ResolvedArtifact};
pub use blocklist::{Blocklist, BlocklistEntrySpec};
pub use channel_def::{ChannelDefinitionSpec, GpgSignatureRef, ManifestSource, NoStreamStrategy};
pub use coordinate::{ArtifactCoordinate, ArtifactRequest};
pub use manifest::{Manifest, ManifestRequirement, ManifestSpec, MavenRef};
pub use repository::Repository;
pub use stream::{Stream, StreamSpec, VersionSelector};
