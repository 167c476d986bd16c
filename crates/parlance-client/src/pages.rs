//! Page store: the accumulated history pages plus their pagination flags.
//!
//! The store is shared between the message list and the futures it hands out
//! for older-page fetches, so its state lives behind an `Arc<Mutex<_>>`.  The
//! lock is only ever held for bookkeeping, never across an await, which lets
//! the UI loop observe `is_fetching_previous_page` while a request is in
//! flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use parlance_shared::{MessageHash, Page, PaginatedResult};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::source::PagedSource;

/// Status of the initial load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// A consistent copy of the store's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub result: PaginatedResult,
    pub status: LoadStatus,
    pub is_fetching_previous_page: bool,
    /// Bumped on every committed data change.
    pub revision: u64,
}

impl PageSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Success
    }

    pub fn has_previous_page(&self) -> bool {
        self.result.has_previous_page
    }
}

struct Inner {
    result: PaginatedResult,
    status: LoadStatus,
    fetching_previous: bool,
    revision: u64,
    next_seq: u32,
    /// Bumped whenever the loaded pages are discarded wholesale.  An older
    /// page fetched against an earlier generation is dropped on arrival.
    generation: u64,
    last_error: Option<String>,
}

/// Wraps a [`PagedSource`] and accumulates the pages it returns.
pub struct PageStore<S> {
    source: Arc<S>,
    page_size: usize,
    inner: Arc<Mutex<Inner>>,
}

impl<S> Clone for PageStore<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            page_size: self.page_size,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PagedSource + 'static> PageStore<S> {
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source: Arc::new(source),
            page_size: page_size.max(1),
            inner: Arc::new(Mutex::new(Inner {
                result: PaginatedResult::default(),
                status: LoadStatus::Idle,
                fetching_previous: false,
                revision: 0,
                next_seq: 0,
                generation: 0,
                last_error: None,
            })),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let inner = self.lock();
        PageSnapshot {
            result: inner.result.clone(),
            status: inner.status,
            is_fetching_previous_page: inner.fetching_previous,
            revision: inner.revision,
        }
    }

    pub fn result(&self) -> PaginatedResult {
        self.lock().result.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().status == LoadStatus::Loading
    }

    pub fn is_fetching_previous_page(&self) -> bool {
        self.lock().fetching_previous
    }

    pub fn has_previous_page(&self) -> bool {
        self.lock().result.has_previous_page
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Fetch the newest page, replacing anything loaded before.
    pub async fn load_initial(&self) -> Result<PaginatedResult, SourceError> {
        self.lock().status = LoadStatus::Loading;
        debug!(page_size = self.page_size, "loading newest page");

        let fetched = self.source.fetch_page(None, self.page_size).await;

        let mut inner = self.lock();
        match fetched {
            Ok(messages) => {
                let has_previous_page = messages.len() >= self.page_size;
                inner.result = PaginatedResult {
                    pages: vec![Page::new(0, messages)],
                    has_previous_page,
                };
                inner.next_seq = 1;
                inner.generation += 1;
                inner.status = LoadStatus::Success;
                inner.last_error = None;
                inner.revision += 1;
                debug!(
                    messages = inner.result.message_count(),
                    has_previous_page, "newest page loaded"
                );
                Ok(inner.result.clone())
            }
            Err(e) => {
                warn!(error = %e, "initial history load failed");
                inner.status = LoadStatus::Error;
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Start fetching the next older page.
    ///
    /// The in-flight flag is set before this returns, so callers that check
    /// [`PageStore::is_fetching_previous_page`] cannot issue a second request.
    /// Returns `None` when a request is already in flight or history is
    /// exhausted.  The flag clears when the returned future settles, or when
    /// it is dropped unfinished.
    pub fn begin_fetch_previous_page(
        &self,
    ) -> Option<BoxFuture<'static, Result<PaginatedResult, SourceError>>> {
        let (cursor, generation) = {
            let mut inner = self.lock();
            if inner.fetching_previous || !inner.result.has_previous_page {
                return None;
            }
            let cursor = inner.result.oldest_message()?.hash.clone();
            inner.fetching_previous = true;
            (cursor, inner.generation)
        };

        let in_flight = InFlight::arm(Arc::clone(&self.inner));
        let store = self.clone();
        Some(async move { store.settle_previous(cursor, generation, in_flight).await }.boxed())
    }

    /// Fetch the next older page and return the updated result.  When no
    /// request can be issued, the current result is returned unchanged.
    pub async fn fetch_previous_page(&self) -> Result<PaginatedResult, SourceError> {
        match self.begin_fetch_previous_page() {
            Some(task) => task.await,
            None => Ok(self.result()),
        }
    }

    async fn settle_previous(
        self,
        cursor: MessageHash,
        generation: u64,
        in_flight: InFlight,
    ) -> Result<PaginatedResult, SourceError> {
        debug!(cursor = cursor.short(), "fetching previous page");

        let fetched = self.source.fetch_page(Some(cursor), self.page_size).await;

        let mut inner = self.lock();
        inner.fetching_previous = false;
        in_flight.disarm();

        if inner.generation != generation {
            // The pages this cursor pointed into were replaced meanwhile.
            debug!(
                fetched = generation,
                current = inner.generation,
                "stale previous page dropped"
            );
            return fetched.map(|_| inner.result.clone());
        }

        match fetched {
            Ok(messages) => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.result.has_previous_page = messages.len() >= self.page_size;
                inner.result.pages.insert(0, Page::new(seq, messages));
                inner.last_error = None;
                inner.revision += 1;
                debug!(
                    seq,
                    pages = inner.result.page_count(),
                    has_previous_page = inner.result.has_previous_page,
                    "previous page committed"
                );
                Ok(inner.result.clone())
            }
            Err(e) => {
                warn!(error = %e, "previous page fetch failed");
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Pick up messages that arrived after the newest loaded one.
    ///
    /// New messages are committed as a new page after the newest one; loaded
    /// pages are left as they are.  If more than a page's worth arrived, so
    /// the newest loaded message is no longer in the fresh page, the fresh
    /// page replaces everything that was loaded and an older-page fetch
    /// still in flight is discarded when it lands.
    pub async fn refresh_latest(&self) -> Result<PaginatedResult, SourceError> {
        let fresh = match self.source.fetch_page(None, self.page_size).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "refreshing newest page failed");
                self.lock().last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut inner = self.lock();
        let newest_known = inner
            .result
            .pages
            .last()
            .and_then(|p| p.messages.last())
            .map(|m| m.hash.clone());

        let overlap = newest_known
            .as_ref()
            .and_then(|hash| fresh.iter().position(|m| &m.hash == hash));

        match overlap {
            Some(idx) => {
                let newer: Vec<_> = fresh.into_iter().skip(idx + 1).collect();
                if newer.is_empty() {
                    debug!("no new messages");
                    return Ok(inner.result.clone());
                }
                let seq = inner.next_seq;
                inner.next_seq += 1;
                debug!(seq, added = newer.len(), "new messages committed as a page");
                inner.result.pages.push(Page::new(seq, newer));
            }
            None => {
                debug!(messages = fresh.len(), "loaded pages replaced by the newest page");
                let has_previous_page = fresh.len() >= self.page_size;
                inner.result = PaginatedResult {
                    pages: vec![Page::new(0, fresh)],
                    has_previous_page,
                };
                inner.next_seq = 1;
                inner.generation += 1;
            }
        }

        inner.status = LoadStatus::Success;
        inner.last_error = None;
        inner.revision += 1;
        Ok(inner.result.clone())
    }
}

impl<S> PageStore<S> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag if an older-page fetch is dropped before it
/// settles.
struct InFlight {
    inner: Arc<Mutex<Inner>>,
    armed: bool,
}

impl InFlight {
    fn arm(inner: Arc<Mutex<Inner>>) -> Self {
        Self { inner, armed: true }
    }

    // Caller already holds the lock and has cleared the flag itself.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.fetching_previous {
            debug!("previous page fetch abandoned");
            inner.fetching_previous = false;
        }
    }
}
