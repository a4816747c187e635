//! Resolver session: loads channel definitions into a forest of
//! [`ChannelInstance`]s wired by their `requires` relationships, arbitrates
//! the winning channel for a coordinate across that forest, and records
//! every resolution into a replayable manifest.

pub mod definition;
pub mod graph;
pub mod instance;
pub mod loader;
pub mod manifest_resolver;
pub mod recorder;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use definition::ChannelDefinition;
pub use instance::{ChannelInstance, ResolvedVersion};
pub use loader::{load_channel_definition, load_channel_definitions};
pub use manifest_resolver::ManifestResolver;
pub use recorder::Recorder;
pub use session::{CoordinateRequest, Session};
