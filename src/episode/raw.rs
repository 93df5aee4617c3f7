// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Episode record as served by the backend at `/episodes/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEpisode {
    pub id: String,
    pub title: String,
    pub members: String,
    pub thumbnail: String,
    /// ISO-8601 timestamp
    pub published_at: String,
    #[serde(default)]
    pub description: String,
    pub file: RawFile,
}

/// The audio file attached to a raw episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFile {
    pub url: String,
    pub duration: RawDuration,
}

/// Duration as the backend sends it: normally a numeric string, occasionally
/// a bare JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDuration {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for RawDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawDuration::Text(text) => f.write_str(text),
            RawDuration::Number(number) => write!(f, "{}", number),
        }
    }
}

/// Entry of the `/episodes` collection; only the identity is used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: String,
}
