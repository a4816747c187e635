//! Maven repository URL layout.

use channel_core::Repository;

/// Maven Central, used when a channel declares no repositories of its own.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// A configured Maven repository with optional credentials, resolved from
/// a channel's [`Repository`] declaration plus environment-based auth.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    pub id: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl MavenRepository {
    /// Build a `MavenRepository` from a channel's repository declaration.
    ///
    /// Credentials are looked up from `CHANNEL_REPO_<ID>_USERNAME` /
    /// `CHANNEL_REPO_<ID>_PASSWORD` environment variables, keyed by the
    /// repository id with non-alphanumeric characters uppercased and
    /// replaced with `_`.
    pub fn from_repository(entry: &Repository) -> Self {
        let env_key = entry
            .id
            .to_uppercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect::<String>();

        Self {
            id: entry.id.clone(),
            url: entry.url.trim_end_matches('/').to_string(),
            username: std::env::var(format!("CHANNEL_REPO_{env_key}_USERNAME")).ok(),
            password: std::env::var(format!("CHANNEL_REPO_{env_key}_PASSWORD")).ok(),
        }
    }

    pub fn maven_central() -> Self {
        Self {
            id: "maven-central".to_string(),
            url: MAVEN_CENTRAL_URL.to_string(),
            username: None,
            password: None,
        }
    }

    /// Standard Maven layout path for a coordinate, e.g.
    /// `org.example:widget:1.0.0` becomes `org/example/widget/1.0.0`.
    pub fn coordinate_path(group_id: &str, artifact_id: &str, version: &str) -> String {
        format!("{}/{artifact_id}/{version}", group_id.replace('.', "/"))
    }

    pub fn file_url(&self, group_id: &str, artifact_id: &str, version: &str, filename: &str) -> String {
        format!(
            "{}/{}/{filename}",
            self.url,
            Self::coordinate_path(group_id, artifact_id, version)
        )
    }

    pub fn artifact_url(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        extension: &str,
        classifier: Option<&str>,
    ) -> String {
        let filename = match classifier {
            Some(c) => format!("{artifact_id}-{version}-{c}.{extension}"),
            None => format!("{artifact_id}-{version}.{extension}"),
        };
        self.file_url(group_id, artifact_id, version, &filename)
    }

    /// URL to the artifact-level `maven-metadata.xml` (version listing).
    pub fn metadata_url(&self, group_id: &str, artifact_id: &str) -> String {
        format!(
            "{}/{}/{artifact_id}/maven-metadata.xml",
            self.url,
            group_id.replace('.', "/")
        )
    }

    pub fn has_auth(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_path_replaces_dots() {
        let path = MavenRepository::coordinate_path("org.example", "widget", "1.0.0");
        assert_eq!(path, "org/example/widget/1.0.0");
    }

    #[test]
    fn artifact_url_with_classifier() {
        let repo = MavenRepository::maven_central();
        let url = repo.artifact_url("org.example", "widget", "1.0.0", "jar", Some("sources"));
        assert!(url.ends_with("widget-1.0.0-sources.jar"));
    }

    #[test]
    fn artifact_url_without_classifier() {
        let repo = MavenRepository::maven_central();
        let url = repo.artifact_url("org.example", "widget", "1.0.0", "jar", None);
        assert!(url.ends_with("widget-1.0.0.jar"));
    }

    #[test]
    fn metadata_url_format() {
        let repo = MavenRepository::maven_central();
        let url = repo.metadata_url("org.example", "widget");
        assert_eq!(
            url,
            "https://repo.maven.apache.org/maven2/org/example/widget/maven-metadata.xml"
        );
    }

    #[test]
    fn from_repository_trims_trailing_slash() {
        let entry = Repository {
            id: "nexus".to_string(),
            url: "https://nexus.example.com/maven/".to_string(),
        };
        let repo = MavenRepository::from_repository(&entry);
        assert_eq!(repo.url, "https://nexus.example.com/maven");
    }
}
