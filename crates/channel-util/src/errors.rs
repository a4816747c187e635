use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all channel-resolver operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ChannelError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network request or download failed.
    #[error("network error: {message}")]
    Network { message: String },

    /// A channel or manifest document is malformed: schema mismatch, or a
    /// selector with more than one of `version` / `versionPattern` / `versions` set.
    #[error("invalid channel: {message}")]
    #[diagnostic(help("check the channel or manifest YAML for schema errors"))]
    InvalidChannel { message: String },

    /// No channel yielded a version for the requested coordinate, or the
    /// backend failed to deliver a version a stream declared.
    #[error("could not resolve {group}:{artifact}")]
    UnresolvedMavenArtifact { group: String, artifact: String },

    /// A stream matched but no candidate version survived blocklisting and
    /// selector filtering, even though the channel promised a match.
    #[error("{group}:{artifact} matched a stream but no candidate version was found")]
    ArtifactNotResolved { group: String, artifact: String },

    /// A `requires` entry could not be resolved by sibling id or by Maven coordinates.
    #[error("unresolved required manifest: {id}")]
    #[diagnostic(help(
        "add a channel with this id, or give the requirement explicit maven coordinates"
    ))]
    UnresolvedRequiredManifest { id: String },

    /// The requirement graph contains a cycle.
    #[error("cyclic manifest dependency: {}", path.join(" -> "))]
    #[diagnostic(help("remove one of the `requires` edges in this cycle"))]
    CyclicDependency { path: Vec<String> },

    /// Two or more root channels declare the same non-null manifest id.
    #[error("duplicate manifest id: {id}")]
    DuplicateManifestId { id: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ChannelResult<T> = miette::Result<T>;
