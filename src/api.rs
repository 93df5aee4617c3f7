// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::episode::{EpisodeSummary, RawEpisode};
use crate::error::ApiError;
use crate::http::{HttpClient, HttpResponse};

/// Base URL used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3333";

/// Bounded exponential backoff for transient backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every following one
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that tries exactly once
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

/// Connection settings for the episode backend
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub retry: RetryPolicy,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Ordering and size of a request against the episode collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionQuery {
    pub limit: usize,
}

/// Typed access to the backend's `/episodes` resource
#[derive(Clone)]
pub struct EpisodeApi<C> {
    client: C,
    config: ApiConfig,
}

impl<C: HttpClient> EpisodeApi<C> {
    pub fn new(client: C, config: ApiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// URL of the collection, newest first, capped at `query.limit`
    pub fn collection_url(&self, query: CollectionQuery) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&["episodes"])?;
        url.query_pairs_mut()
            .append_pair("_limit", &query.limit.to_string())
            .append_pair("_sort", "published_at")
            .append_pair("_order", "desc");
        Ok(url)
    }

    /// URL of a single episode; the identity is encoded as one path segment
    pub fn episode_url(&self, id: &str) -> Result<Url, ApiError> {
        self.endpoint(&["episodes", id])
    }

    /// Fetch the most recently published episodes
    pub async fn recent_episodes(
        &self,
        query: CollectionQuery,
    ) -> Result<Vec<EpisodeSummary>, ApiError> {
        let url = self.collection_url(query)?;
        self.get_json(&url).await
    }

    /// Fetch the full record of one episode
    pub async fn episode(&self, id: &str) -> Result<RawEpisode, ApiError> {
        let url = self.episode_url(id)?;
        self.get_json(&url).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let response = self.get_with_retry(url).await?;

        serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            source: e,
        })
    }

    async fn get_with_retry(&self, url: &Url) -> Result<HttpResponse, ApiError> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            tracing::debug!(%url, attempt, "requesting");

            let error = match self.client.get(url).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.status == 404 => {
                    return Err(ApiError::NotFound {
                        url: url.to_string(),
                    });
                }
                Ok(response) if response.status < 500 => {
                    return Err(ApiError::HttpStatus {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Ok(response) => ApiError::HttpStatus {
                    url: url.to_string(),
                    status: response.status,
                },
                Err(e) => ApiError::Network {
                    url: url.to_string(),
                    attempts: attempt,
                    source: e,
                },
            };

            if attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.config.retry.backoff(attempt);
            tracing::warn!(%url, attempt, ?delay, error = %error, "backend request failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    /// One scripted reply of the mock backend
    pub(crate) enum Reply {
        Status(u16, String),
        TransportError,
    }

    /// Mock backend keyed by request path (with query)
    #[derive(Default)]
    pub(crate) struct MockBackend {
        routes: Mutex<HashMap<String, VecDeque<Reply>>>,
        fallback: Mutex<HashMap<String, (u16, String)>>,
        requests: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl MockBackend {
        /// Always answer `path` with `status` and `body`
        pub(crate) fn route(self, path: &str, status: u16, body: &str) -> Self {
            self.set_route(path, status, body);
            self
        }

        /// Answer the next request to `path` with `reply`, before any fixed route
        pub(crate) fn once(self, path: &str, reply: Reply) -> Self {
            self.routes
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        pub(crate) fn set_route(&self, path: &str, status: u16, body: &str) {
            self.fallback
                .lock()
                .unwrap()
                .insert(path.to_string(), (status, body.to_string()));
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn transport_error() -> reqwest::Error {
        reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err()
    }

    #[async_trait]
    impl HttpClient for MockBackend {
        async fn get(&self, url: &Url) -> Result<HttpResponse, reqwest::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            };
            self.requests.lock().unwrap().push(key.clone());

            let scripted = self
                .routes
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(|queue| queue.pop_front());

            let (status, body) = match scripted {
                Some(Reply::Status(status, body)) => (status, body),
                Some(Reply::TransportError) => return Err(transport_error()),
                None => self
                    .fallback
                    .lock()
                    .unwrap()
                    .get(&key)
                    .cloned()
                    .unwrap_or((404, "{}".to_string())),
            };

            Ok(HttpResponse {
                status,
                body: Bytes::from(body),
            })
        }
    }

    pub(crate) const COLLECTION_PATH: &str = "/episodes?_limit=2&_sort=published_at&_order=desc";

    pub(crate) fn episode_json(id: &str, duration: &str) -> String {
        serde_json::json!({
            "id": id,
            "title": format!("Episódio {id}"),
            "members": "Diego Fernandes e Richard Nunes",
            "published_at": "2021-06-01T00:00:00.000Z",
            "thumbnail": format!("https://example.com/{id}.jpg"),
            "description": "<p>Conversa sobre <em>carreira</em> &amp; tecnologia.</p>",
            "file": {
                "url": format!("https://example.com/{id}.m4a"),
                "type": "audio/x-m4a",
                "duration": duration
            }
        })
        .to_string()
    }

    pub(crate) fn fast_config() -> ApiConfig {
        ApiConfig::new("http://localhost:3333").unwrap().with_retry(RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        })
    }

    #[test]
    fn builds_collection_url() {
        let api = EpisodeApi::new(MockBackend::default(), fast_config());
        let url = api.collection_url(CollectionQuery { limit: 2 }).unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:3333/episodes?_limit=2&_sort=published_at&_order=desc"
        );
    }

    #[test]
    fn episode_url_respects_base_path_and_encodes_identity() {
        let config = ApiConfig::new("https://api.example.com/v1/").unwrap();
        let api = EpisodeApi::new(MockBackend::default(), config);

        assert_eq!(
            api.episode_url("uma-conversa").unwrap().as_str(),
            "https://api.example.com/v1/episodes/uma-conversa"
        );
        assert_eq!(
            api.episode_url("a/b c").unwrap().as_str(),
            "https://api.example.com/v1/episodes/a%2Fb%20c"
        );
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn fetches_and_decodes_episode() {
        let backend =
            MockBackend::default().route("/episodes/ep-1", 200, &episode_json("ep-1", "725"));
        let api = EpisodeApi::new(backend, fast_config());

        let raw = api.episode("ep-1").await.unwrap();

        assert_eq!(raw.id, "ep-1");
        assert_eq!(raw.file.duration.to_string(), "725");
    }

    #[tokio::test]
    async fn maps_404_to_not_found_without_retry() {
        let api = EpisodeApi::new(MockBackend::default(), fast_config());

        let err = api.episode("missing").await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(api.client.call_count(), 1);
    }

    #[tokio::test]
    async fn retries_transport_errors_then_succeeds() {
        let backend = MockBackend::default()
            .once("/episodes/ep-1", Reply::TransportError)
            .once("/episodes/ep-1", Reply::Status(503, String::new()))
            .route("/episodes/ep-1", 200, &episode_json("ep-1", "60"));
        let api = EpisodeApi::new(backend, fast_config());

        let raw = api.episode("ep-1").await.unwrap();

        assert_eq!(raw.id, "ep-1");
        assert_eq!(api.client.call_count(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let backend = MockBackend::default()
            .once("/episodes/ep-1", Reply::TransportError)
            .once("/episodes/ep-1", Reply::TransportError)
            .once("/episodes/ep-1", Reply::TransportError)
            .route("/episodes/ep-1", 200, &episode_json("ep-1", "60"));
        let api = EpisodeApi::new(backend, fast_config());

        let err = api.episode("ep-1").await.unwrap_err();

        match err {
            ApiError::Network { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("Expected Network error, got {other:?}"),
        }
        assert_eq!(api.client.call_count(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let backend = MockBackend::default().route("/episodes/ep-1", 400, "");
        let api = EpisodeApi::new(backend, fast_config());

        let err = api.episode("ep-1").await.unwrap_err();

        assert!(matches!(err, ApiError::HttpStatus { status: 400, .. }));
        assert_eq!(api.client.call_count(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let backend = MockBackend::default().route("/episodes/ep-1", 200, "<html>oops</html>");
        let api = EpisodeApi::new(backend, fast_config());

        let err = api.episode("ep-1").await.unwrap_err();

        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
