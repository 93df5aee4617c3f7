pub mod api;
pub mod cache;
pub mod duration;
pub mod episode;
pub mod error;
pub mod http;
pub mod manifest;
pub mod pages;
pub mod player;
pub mod progress;
pub mod render;
pub mod site;

// Re-export main types for convenience
pub use api::{ApiConfig, DEFAULT_API_URL, EpisodeApi, RetryPolicy};
pub use cache::{CacheStatus, CachedPage, PageCache, RenderedPage};
pub use duration::{format_duration, parse_duration};
pub use episode::{Episode, RawEpisode, normalize};
pub use error::{ApiError, FailureKind, ManifestError, NormalizeError, PageError, SiteError};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use pages::{
    EpisodePage, Fallback, PagePath, REVALIDATE_AFTER, StaticPaths, enumerate_recent_paths,
    load_episode_page,
};
pub use player::Player;
pub use progress::{BuildEvent, BuildReporter, NoopReporter, SharedBuildReporter};
pub use render::render_episode_page;
pub use site::{BuildOptions, BuildResult, ServedPage, Site, build_site};
