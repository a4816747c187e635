//! The bundled Maven repository backend: HTTP download, `maven-metadata.xml`
//! parsing, and the concrete [`channel_core::ArtifactBackend`] it implements.

pub mod auth;
pub mod download;
pub mod http_backend;
pub mod metadata;
pub mod repository;

pub use http_backend::{HttpArtifactBackend, HttpBackendFactory};
pub use repository::MavenRepository;
