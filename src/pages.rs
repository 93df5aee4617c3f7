// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use crate::api::{CollectionQuery, EpisodeApi};
use crate::episode::{Episode, normalize};
use crate::error::{ApiError, PageError};
use crate::http::HttpClient;

/// Number of most recent episodes pre-rendered at build time
pub const RECENT_EPISODE_LIMIT: usize = 2;

/// Age after which a generated episode page is stale (24 hours)
pub const REVALIDATE_AFTER: Duration = Duration::from_secs(60 * 60 * 24);

/// How the host treats identities outside the pre-rendered set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Render on the first request, then serve from cache
    Blocking,
}

/// Identity of one episode page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PagePath {
    pub identity: String,
}

/// The warm set of pages to render ahead of time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPaths {
    pub paths: Vec<PagePath>,
    pub fallback: Fallback,
}

/// Everything the renderer needs for one episode page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePage {
    pub episode: Episode,
    /// How long the rendered page may be served before regeneration
    pub revalidate: Duration,
}

impl EpisodePage {
    pub fn revalidate_after_seconds(&self) -> u64 {
        self.revalidate.as_secs()
    }
}

/// List the identities of the most recently published episodes
///
/// This is a warm subset, not every episode: anything else is rendered on
/// demand (see [`Fallback::Blocking`]).
pub async fn enumerate_recent_paths<C: HttpClient>(
    api: &EpisodeApi<C>,
) -> Result<StaticPaths, PageError> {
    let summaries = api
        .recent_episodes(CollectionQuery {
            limit: RECENT_EPISODE_LIMIT,
        })
        .await
        .map_err(PageError::Backend)?;

    // The backend is asked for the limit, but don't rely on it honouring it
    let paths = summaries
        .into_iter()
        .take(RECENT_EPISODE_LIMIT)
        .map(|summary| PagePath {
            identity: summary.id,
        })
        .collect();

    Ok(StaticPaths {
        paths,
        fallback: Fallback::Blocking,
    })
}

/// Fetch and normalize one episode for rendering
pub async fn load_episode_page<C: HttpClient>(
    api: &EpisodeApi<C>,
    identity: &str,
) -> Result<EpisodePage, PageError> {
    let raw = api.episode(identity).await.map_err(|e| match e {
        ApiError::NotFound { .. } => PageError::NotFound {
            identity: identity.to_string(),
        },
        other => PageError::Backend(other),
    })?;

    let episode = normalize(raw).inspect_err(|e| {
        tracing::error!(identity, error = %e, "backend returned malformed episode data");
    })?;

    Ok(EpisodePage {
        episode,
        revalidate: REVALIDATE_AFTER,
    })
}
