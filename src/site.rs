// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::api::{CollectionQuery, EpisodeApi};
use crate::cache::{CacheStatus, PageCache, RenderedPage, content_hash};
use crate::episode::Episode;
use crate::error::{FailureKind, PageError, SiteError};
use crate::http::HttpClient;
use crate::manifest::{PageEntry, SiteManifest, read_manifest, write_manifest};
use crate::pages::{RECENT_EPISODE_LIMIT, StaticPaths, enumerate_recent_paths, load_episode_page};
use crate::player::Player;
use crate::progress::{BuildEvent, SharedBuildReporter};
use crate::render::render_episode_page;

/// Directory below the output root that holds episode pages
const EPISODES_DIR: &str = "episodes";

/// Load an episode and render it into a cacheable page
pub async fn render_page<C: HttpClient>(
    api: &EpisodeApi<C>,
    identity: &str,
) -> Result<RenderedPage, PageError> {
    let page = load_episode_page(api, identity).await?;
    let html = render_episode_page(&page.episode);

    Ok(RenderedPage {
        episode: page.episode,
        html,
        revalidate: page.revalidate,
    })
}

/// A page as served to a visitor
#[derive(Debug, Clone)]
pub struct ServedPage {
    pub page: Arc<RenderedPage>,
    pub status: CacheStatus,
}

/// In-process host for episode pages
///
/// Pages from the warm set are rendered up front; any other identity is
/// rendered on its first request and cached. Cached pages are regenerated
/// once their revalidation interval has passed.
pub struct Site<C> {
    api: EpisodeApi<C>,
    cache: PageCache,
}

impl<C: HttpClient> Site<C> {
    pub fn new(api: EpisodeApi<C>) -> Self {
        Self {
            api,
            cache: PageCache::new(),
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Render the warm set into the cache
    ///
    /// Returns the enumerated paths. A page that fails to render is skipped
    /// unless its data is malformed, which aborts pre-rendering.
    pub async fn prerender(&self) -> Result<StaticPaths, PageError> {
        let paths = enumerate_recent_paths(&self.api).await?;

        for path in &paths.paths {
            match render_page(&self.api, &path.identity).await {
                Ok(page) => {
                    self.cache.insert(&path.identity, page).await;
                }
                Err(e) if e.kind() == FailureKind::MalformedData => return Err(e),
                Err(e) => {
                    tracing::warn!(identity = %path.identity, error = %e, "skipping pre-render");
                }
            }
        }

        Ok(paths)
    }

    /// Serve the page for `identity`, rendering it on demand
    pub async fn page(&self, identity: &str) -> Result<ServedPage, PageError> {
        let (cached, status) = self
            .cache
            .get_or_generate(identity, || render_page(&self.api, identity))
            .await?;

        Ok(ServedPage {
            page: cached.page,
            status,
        })
    }

    /// Hand the episode behind `identity` to the player
    pub async fn play(&self, identity: &str, player: &dyn Player) -> Result<Episode, PageError> {
        let served = self.page(identity).await?;
        let episode = served.page.episode.clone();
        player.play(&episode);
        Ok(episode)
    }
}

/// Options for a static build
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Re-render pages even when the manifest says they are fresh
    pub force: bool,
}

/// Result of a static build
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Pages rendered and written in this run
    pub rendered: usize,
    /// Pages skipped because they were still fresh
    pub fresh: usize,
    /// Identities that could not be rendered (identity, error message)
    pub failed: Vec<(String, String)>,
    /// Pages removed because their episode left the warm set
    pub pruned: usize,
}

/// Relative output path of an episode page
///
/// Identities that are not usable as file names verbatim get a short digest
/// of the identity appended, so two identities never share a file.
pub fn page_path(identity: &str) -> PathBuf {
    let sanitized = sanitize_filename::sanitize(identity);
    let stem = if sanitized == identity {
        sanitized
    } else {
        let digest = format!("{:x}", Sha256::digest(identity.as_bytes()));
        let base = if sanitized.is_empty() { "episode" } else { &sanitized };
        format!("{}-{}", base, &digest[..8])
    };
    Path::new(EPISODES_DIR).join(format!("{}.html", stem))
}

/// Whether a manifest path points at a page inside the episodes directory
fn is_page_path(relative: &Path) -> bool {
    relative.starts_with(EPISODES_DIR)
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Pre-render the warm set of episode pages into `output_dir`
///
/// Pages still fresh according to the previous manifest are kept. Episodes
/// that disappeared between enumeration and loading are reported and
/// skipped; backend and data errors abort the build.
pub async fn build_site<C: HttpClient>(
    api: &EpisodeApi<C>,
    output_dir: &Path,
    options: &BuildOptions,
    reporter: SharedBuildReporter,
) -> Result<BuildResult, SiteError> {
    build_site_at(api, output_dir, options, reporter, Utc::now()).await
}

pub(crate) async fn build_site_at<C: HttpClient>(
    api: &EpisodeApi<C>,
    output_dir: &Path,
    options: &BuildOptions,
    reporter: SharedBuildReporter,
    now: DateTime<Utc>,
) -> Result<BuildResult, SiteError> {
    let collection_url = api
        .collection_url(CollectionQuery {
            limit: RECENT_EPISODE_LIMIT,
        })
        .map_err(PageError::Backend)?;
    reporter.report(BuildEvent::FetchingPaths {
        url: collection_url.to_string(),
    });

    let paths = enumerate_recent_paths(api).await?;

    let episodes_dir = output_dir.join(EPISODES_DIR);
    std::fs::create_dir_all(&episodes_dir).map_err(|e| SiteError::CreateDirectoryFailed {
        path: episodes_dir.clone(),
        source: e,
    })?;

    let api_url = api.config().base_url.to_string();
    let mut manifest = read_manifest(output_dir)?
        .filter(|m| m.api_url == api_url)
        .unwrap_or_else(|| SiteManifest {
            api_url: api_url.clone(),
            ..Default::default()
        });

    // Plan: only stale, new, or missing pages are rendered
    let mut to_render = Vec::new();
    let mut fresh = 0;
    for path in &paths.paths {
        let keep = !options.force
            && manifest.pages.get(&path.identity).is_some_and(|entry| {
                entry.is_fresh(now) && output_dir.join(&entry.path).exists()
            });

        if keep {
            fresh += 1;
            reporter.report(BuildEvent::PageSkipped {
                identity: path.identity.clone(),
            });
        } else {
            to_render.push(path.identity.clone());
        }
    }

    reporter.report(BuildEvent::PathsReady {
        total: paths.paths.len(),
        to_render: to_render.len(),
        fresh,
    });

    let mut live: HashSet<String> = paths.paths.iter().map(|p| p.identity.clone()).collect();
    let total = to_render.len();
    let mut rendered = 0;
    let mut failed = Vec::new();

    for (index, identity) in to_render.into_iter().enumerate() {
        reporter.report(BuildEvent::RenderingPage {
            identity: identity.clone(),
            index,
            total,
        });

        let page = match render_page(api, &identity).await {
            Ok(page) => page,
            Err(e) if e.is_not_found() => {
                reporter.report(BuildEvent::PageFailed {
                    identity: identity.clone(),
                    error: e.to_string(),
                });
                live.remove(&identity);
                failed.push((identity, e.to_string()));
                continue;
            }
            Err(e) => {
                reporter.report(BuildEvent::PageFailed {
                    identity: identity.clone(),
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let relative = page_path(&identity);
        let path = output_dir.join(&relative);
        std::fs::write(&path, &page.html).map_err(|e| SiteError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;

        manifest.pages.insert(
            identity.clone(),
            PageEntry {
                path: relative.to_string_lossy().replace('\\', "/"),
                title: page.episode.title.clone(),
                generated_at: now.to_rfc3339(),
                revalidate_seconds: page.revalidate.as_secs(),
                content_hash: content_hash(&page.html),
            },
        );

        reporter.report(BuildEvent::PageWritten {
            identity,
            path,
            bytes: page.html.len(),
        });
        rendered += 1;
    }

    let pruned = prune_pages(&mut manifest, &live, output_dir, &reporter)?;

    write_manifest(&manifest, output_dir)?;

    reporter.report(BuildEvent::BuildCompleted {
        rendered_count: rendered,
        fresh_count: fresh,
        failed_count: failed.len(),
        pruned_count: pruned,
    });

    Ok(BuildResult {
        rendered,
        fresh,
        failed,
        pruned,
    })
}

/// Remove manifest entries and page files of identities outside `live`
fn prune_pages(
    manifest: &mut SiteManifest,
    live: &HashSet<String>,
    output_dir: &Path,
    reporter: &SharedBuildReporter,
) -> Result<usize, SiteError> {
    let gone: Vec<String> = manifest
        .pages
        .keys()
        .filter(|identity| !live.contains(*identity))
        .cloned()
        .collect();

    for identity in &gone {
        let Some(entry) = manifest.pages.remove(identity) else {
            continue;
        };

        let relative = PathBuf::from(&entry.path);
        let shared = manifest.pages.values().any(|other| other.path == entry.path);
        if is_page_path(&relative) && !shared {
            let path = output_dir.join(&relative);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SiteError::RemoveFailed { path, source: e }),
            }
        }

        reporter.report(BuildEvent::PagePruned {
            identity: identity.clone(),
            path: relative,
        });
    }

    Ok(gone.len())
}
