mod normalize;
mod raw;

use serde::{Deserialize, Serialize};

pub use normalize::{coerce_duration, format_published_at, normalize};
pub use raw::{EpisodeSummary, RawDuration, RawEpisode, RawFile};

/// A display-ready podcast episode
///
/// Serializes with the field names the page template and the client-side
/// player expect (`durationAtString`, `publishedAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub members: String,
    pub thumbnail: String,
    /// Length in whole seconds
    pub duration: u64,
    /// `duration` rendered as `HH:MM:SS`
    pub duration_at_string: String,
    /// Audio file URL
    pub url: String,
    /// Short pt-BR publish date, e.g. `1 jun 21`
    pub published_at: String,
    /// HTML fragment, passed through untouched
    pub description: String,
}
