//! Maven repository references, as declared on a channel.

use serde::{Deserialize, Serialize};

/// A single Maven repository a channel's backend may fetch from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    pub id: String,
    pub url: String,
}
