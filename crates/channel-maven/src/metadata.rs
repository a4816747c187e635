//! `maven-metadata.xml` parsing for version discovery.

use quick_xml::events::Event;
use quick_xml::Reader;

use channel_util::errors::ChannelError;

/// Artifact-level Maven metadata: the versions a repository publishes for
/// one `groupId:artifactId`, plus the `latest`/`release` markers.
#[derive(Debug, Clone, Default)]
pub struct MavenMetadata {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
}

/// Parse an artifact-level `maven-metadata.xml`.
pub fn parse_metadata(xml: &str) -> Result<MavenMetadata, ChannelError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = MavenMetadata::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                match path.join(">").as_str() {
                    "metadata>versioning>latest" => meta.latest = Some(text_buf.clone()),
                    "metadata>versioning>release" => meta.release = Some(text_buf.clone()),
                    "metadata>versioning>versions>version" => meta.versions.push(text_buf.clone()),
                    _ => {}
                }
                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ChannelError::Generic {
                    message: format!("failed to parse maven-metadata.xml: {e}"),
                })
            }
            _ => {}
        }
    }

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions_latest_release() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.example</groupId>
  <artifactId>widget</artifactId>
  <versioning>
    <latest>2.0.0</latest>
    <release>1.9.0</release>
    <versions>
      <version>1.0.0</version>
      <version>1.9.0</version>
      <version>2.0.0</version>
    </versions>
  </versioning>
</metadata>"#;
        let meta = parse_metadata(xml).unwrap();
        assert_eq!(meta.latest.as_deref(), Some("2.0.0"));
        assert_eq!(meta.release.as_deref(), Some("1.9.0"));
        assert_eq!(meta.versions.len(), 3);
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(parse_metadata("<metadata><a></b></metadata>").is_err());
    }
}
