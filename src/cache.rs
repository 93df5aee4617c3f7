// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::episode::Episode;
use crate::error::PageError;

/// A page produced by the loader and renderer, before caching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub episode: Episode,
    pub html: String,
    pub revalidate: Duration,
}

/// A rendered page together with the time it was generated
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub page: Arc<RenderedPage>,
    pub generated_at: Instant,
    /// `sha256:` digest of the HTML
    pub content_hash: String,
}

impl CachedPage {
    fn new(page: RenderedPage, generated_at: Instant) -> Self {
        let content_hash = content_hash(&page.html);
        Self {
            page: Arc::new(page),
            generated_at,
            content_hash,
        }
    }

    /// Whether the page has outlived its revalidation interval at `now`
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.generated_at) >= self.page.revalidate
    }
}

/// How a cache lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh page served from cache
    Hit,
    /// No page existed; generated on this request
    Generated,
    /// A stale page was replaced
    Regenerated,
    /// Regeneration failed; the previous page is served instead
    ServedStale,
}

/// Contents of one identity's slot
#[derive(Default)]
struct SlotState {
    page: Option<CachedPage>,
    /// Set once the slot has been removed from the map; holders of a retired
    /// slot must look the identity up again.
    retired: bool,
}

type Slot = Arc<tokio::sync::Mutex<SlotState>>;

/// Rendered pages keyed by identity, regenerated once they go stale
///
/// Each identity has its own async lock, so concurrent requests for the same
/// page trigger a single generation while other identities proceed. Slots
/// only stay in the map while they hold a page.
#[derive(Default)]
pub struct PageCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, identity: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(identity.to_string()).or_default().clone()
    }

    /// Lock the live slot for `identity`, skipping slots retired meanwhile
    async fn lock_slot(&self, identity: &str) -> tokio::sync::OwnedMutexGuard<SlotState> {
        loop {
            let guard = self.slot(identity).lock_owned().await;
            if !guard.retired {
                return guard;
            }
        }
    }

    /// Retire the slot behind `guard` and remove it, unless the map already
    /// points at a newer slot
    fn retire(&self, identity: &str, mut guard: tokio::sync::OwnedMutexGuard<SlotState>) {
        guard.page = None;
        guard.retired = true;
        let slot = tokio::sync::OwnedMutexGuard::mutex(&guard).clone();

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if slots.get(identity).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
            slots.remove(identity);
        }
    }

    /// Store a page generated outside of a lookup, e.g. during pre-rendering
    pub async fn insert(&self, identity: &str, page: RenderedPage) -> CachedPage {
        let mut guard = self.lock_slot(identity).await;
        let cached = CachedPage::new(page, Instant::now());
        guard.page = Some(cached.clone());
        cached
    }

    /// Serve the cached page for `identity`, generating it when absent or stale
    ///
    /// If regenerating a stale page fails for any reason other than the
    /// episode having disappeared, the stale page keeps being served. A
    /// failure with nothing to fall back on leaves no entry behind.
    pub async fn get_or_generate<F, Fut>(
        &self,
        identity: &str,
        generate: F,
    ) -> Result<(CachedPage, CacheStatus), PageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RenderedPage, PageError>>,
    {
        let mut guard = self.lock_slot(identity).await;

        if let Some(cached) = guard.page.as_ref()
            && !cached.is_stale(Instant::now())
        {
            return Ok((cached.clone(), CacheStatus::Hit));
        }

        match generate().await {
            Ok(page) => {
                let status = if guard.page.is_some() {
                    CacheStatus::Regenerated
                } else {
                    CacheStatus::Generated
                };
                let cached = CachedPage::new(page, Instant::now());
                guard.page = Some(cached.clone());
                tracing::debug!(identity, ?status, hash = %cached.content_hash, "page generated");
                Ok((cached, status))
            }
            Err(e) => match guard.page.clone() {
                Some(stale) if !e.is_not_found() => {
                    tracing::warn!(identity, error = %e, "regeneration failed, serving stale page");
                    Ok((stale, CacheStatus::ServedStale))
                }
                _ => {
                    self.retire(identity, guard);
                    Err(e)
                }
            },
        }
    }

    /// Current entry for `identity`, fresh or not
    pub async fn peek(&self, identity: &str) -> Option<CachedPage> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(identity)
            .cloned()?;
        let guard = slot.lock().await;
        guard.page.clone()
    }

    /// Drop the entry for `identity`
    ///
    /// Waits for a generation of that identity in progress to finish.
    pub async fn evict(&self, identity: &str) {
        let existing = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(identity)
            .cloned();

        if let Some(slot) = existing {
            let guard = slot.lock_owned().await;
            if !guard.retired {
                self.retire(identity, guard);
            }
        }
    }

    /// Number of identities with a slot (including ones being generated)
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `sha256:<hex>` digest of a rendered page
pub fn content_hash(html: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(html.as_bytes()))
}
