//! Per-channel blocklists: versions that must never be selected.

use regex::Regex;
use serde::{Deserialize, Serialize};

use channel_util::errors::ChannelError;

use crate::version;

/// Wire format for one blocklist entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlocklistEntrySpec {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "versionPattern")]
    pub version_pattern: Option<String>,
}

#[derive(Debug, Clone)]
enum Rule {
    Exact(String),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
struct Entry {
    group_id: String,
    artifact_id: String,
    rule: Rule,
}

/// A validated, per-channel set of blocked `(groupId, artifactId, version)` triples.
///
/// Cloning is cheap (compiled regexes are reference-counted) and is used
/// when a channel's blocklist is inherited by a Maven-required manifest
/// that has no blocklist of its own.
#[derive(Debug, Default, Clone)]
pub struct Blocklist {
    entries: Vec<Entry>,
}

impl Blocklist {
    pub fn from_specs(specs: Vec<BlocklistEntrySpec>) -> Result<Self, ChannelError> {
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let rule = match (spec.version, spec.version_pattern) {
                (Some(v), None) => Rule::Exact(v),
                (None, Some(pattern)) => {
                    let regex = Regex::new(&pattern).map_err(|e| ChannelError::InvalidChannel {
                        message: format!(
                            "blocklist entry {}:{} has an invalid versionPattern: {e}",
                            spec.group_id, spec.artifact_id
                        ),
                    })?;
                    Rule::Pattern(regex)
                }
                (None, None) => {
                    return Err(ChannelError::InvalidChannel {
                        message: format!(
                            "blocklist entry {}:{} must set version or versionPattern",
                            spec.group_id, spec.artifact_id
                        ),
                    })
                }
                (Some(_), Some(_)) => {
                    return Err(ChannelError::InvalidChannel {
                        message: format!(
                            "blocklist entry {}:{} cannot set both version and versionPattern",
                            spec.group_id, spec.artifact_id
                        ),
                    })
                }
            };
            entries.push(Entry {
                group_id: spec.group_id,
                artifact_id: spec.artifact_id,
                rule,
            });
        }
        Ok(Self { entries })
    }

    /// Whether `(group_id, artifact_id, candidate)` is blocked by any entry.
    pub fn is_blocked(&self, group_id: &str, artifact_id: &str, candidate: &str) -> bool {
        self.entries.iter().any(|entry| {
            entry.group_id == group_id
                && entry.artifact_id == artifact_id
                && match &entry.rule {
                    Rule::Exact(v) => v == candidate,
                    Rule::Pattern(re) => version::matches(candidate, re),
                }
        })
    }

    /// Filter `candidates` down to the ones not blocked for `(group_id, artifact_id)`.
    pub fn filter<'a, I>(&self, group_id: &str, artifact_id: &str, candidates: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter(|candidate| !self.is_blocked(group_id, artifact_id, candidate))
            .collect()
    }
}
