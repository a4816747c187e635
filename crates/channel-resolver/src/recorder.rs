//! Accumulates every successful `(groupId, artifactId, version)` resolution
//! into a replayable [`Manifest`] (spec §4.6).
//!
//! Keyed by `(groupId, artifactId)` rather than the full triple: a
//! coordinate recorded twice with the same version is the documented
//! idempotent case, and recording it twice with two different versions
//! (the backend's view changed mid-session) must still yield a manifest
//! with no duplicate streams, so the later version simply overwrites the
//! earlier one for that coordinate rather than emitting two streams.

use std::collections::HashMap;

use channel_core::manifest::Manifest;
use channel_core::stream::{Stream, VersionSelector};

/// The coordinates recorded so far, in first-seen order, plus their
/// current (possibly overwritten) resolved version.
#[derive(Default)]
pub struct Recorder {
    order: Vec<(String, String)>,
    versions: HashMap<(String, String), String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(group_id, artifact_id) -> version`. Idempotent for an
    /// unchanged triple; overwrites the version for a coordinate recorded
    /// earlier with a different one.
    pub fn record(&mut self, group_id: &str, artifact_id: &str, version: &str) {
        let key = (group_id.to_string(), artifact_id.to_string());
        if !self.versions.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.versions.insert(key, version.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Synthesize a [`Manifest`] with one `Fixed` stream per recorded
    /// coordinate, suitable for feeding back into a new session as a
    /// single replay channel (spec property "Replay", §8).
    pub fn recorded_channel(&self) -> Manifest {
        let mut streams: Vec<Stream> = self
            .order
            .iter()
            .map(|key| Stream {
                group_id: key.0.clone(),
                artifact_id: key.1.clone(),
                selector: VersionSelector::Fixed(self.versions[key].clone()),
            })
            .collect();
        streams.sort_by(|a, b| (&a.group_id, &a.artifact_id).cmp(&(&b.group_id, &b.artifact_id)));

        Manifest {
            schema_version: "1.0.0".to_string(),
            id: Some("recorded".to_string()),
            name: Some("Recorded resolutions".to_string()),
            logical_version: None,
            description: Some("Synthesized replay manifest of every resolution performed in this session".to_string()),
            streams,
            requires: vec![],
        }
    }
}
