//! The runtime (already-loaded) form of a channel definition, ready to be
//! turned into a [`crate::instance::ChannelInstance`].

use channel_core::blocklist::Blocklist;
use channel_core::channel_def::NoStreamStrategy;
use channel_core::manifest::Manifest;
use channel_core::repository::Repository;

/// A channel definition whose manifest has already been fetched and
/// parsed. Loading `manifestSource` (a URL or Maven coordinate) is a
/// one-time step a session performs before building channel instances;
/// see [`crate::loader::load_channel_definition`].
#[derive(Debug, Clone)]
pub struct ChannelDefinition {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manifest: Manifest,
    pub repositories: Vec<Repository>,
    pub blocklist: Blocklist,
    pub no_stream_strategy: NoStreamStrategy,
}

impl ChannelDefinition {
    /// The manifest's own id, used to resolve sibling `requires` references
    /// and to detect duplicate roots. Channel definitions with no manifest
    /// id can still be session roots; they just cannot be required by id.
    pub fn manifest_id(&self) -> Option<&str> {
        self.manifest.id.as_deref()
    }
}
