//! Thread pager: stitches fetched pages into one list.
//!
//! Pages live in index-keyed slots, so arrival order never matters. Every
//! request carries the filter generation and a per-slot token; a response
//! is applied only if both still match, which drops answers for an old
//! filter or for a page that has since been re-requested.
//!
//! Fetching can be driven two ways:
//! - the async helpers (`load`, `load_more`, `set_size`, `set_filter`,
//!   `refresh`) issue requests and await them against the source
//! - `request_*` hands out [`PageRequest`]s and [`ThreadPager::resolve`]
//!   applies results, for callers that schedule fetches themselves
//!
//! A final page of exactly `page_size` rows still offers one more load; the
//! empty page that follows is what marks the end.

use crate::agents::AgentDirectory;
use crate::error::ThreadListError;
use crate::filter::{QueryConfig, ThreadFilter};
use crate::source::{SearchParams, ThreadRecord, ThreadSource};
use crate::threads::{
    group_threads, summarize, with_draft, DraftOptions, GroupedThreads, ThreadSummary,
};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A page fetch handed out by the pager.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub generation: u64,
    pub token: u64,
    pub index: usize,
    pub params: SearchParams,
}

/// Outcome of [`ThreadPager::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Page stored
    Applied,
    /// Response was for a superseded filter or request
    Discarded,
    /// Fetch failed; the error is now the list's error state
    Failed(ThreadListError),
}

/// What the list should render. Exactly one state at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    Loading,
    Error(String),
    Empty,
    Ready(GroupedThreads),
}

#[derive(Debug, Clone, Default)]
struct PageSlot {
    data: Option<Arc<Vec<ThreadSummary>>>,
    pending: Option<u64>,
}

#[derive(Debug, Default)]
struct PagerState {
    filter: ThreadFilter,
    generation: u64,
    next_token: u64,
    /// Bumped on every change `view` could show
    revision: u64,
    slots: Vec<PageSlot>,
    error: Option<ThreadListError>,
}

impl PagerState {
    fn issue(&mut self, index: usize, query: &QueryConfig) -> PageRequest {
        self.next_token += 1;
        self.revision += 1;
        let token = self.next_token;
        self.slots[index].pending = Some(token);
        PageRequest {
            generation: self.generation,
            token,
            index,
            params: query.page(&self.filter, index),
        }
    }

    /// Request every slot below `size` that has neither data nor a fetch.
    fn issue_missing(&mut self, size: usize, query: &QueryConfig) -> Vec<PageRequest> {
        if self.slots.len() < size {
            self.slots.resize_with(size, PageSlot::default);
        }
        let missing: Vec<usize> = (0..size)
            .filter(|&i| self.slots[i].data.is_none() && self.slots[i].pending.is_none())
            .collect();
        if !missing.is_empty() {
            self.error = None;
        }
        missing.into_iter().map(|i| self.issue(i, query)).collect()
    }

    fn is_empty(&self) -> bool {
        self.slots
            .first()
            .and_then(|slot| slot.data.as_ref())
            .is_some_and(|page| page.is_empty())
    }

    fn is_reaching_end(&self, page_size: usize) -> bool {
        if self.is_empty() {
            return true;
        }
        self.slots
            .iter()
            .rev()
            .find_map(|slot| slot.data.as_ref())
            .is_some_and(|page| page.len() < page_size)
    }
}

/// Paged, filterable thread list over a [`ThreadSource`].
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct ThreadPager {
    source: Arc<dyn ThreadSource>,
    agents: Arc<AgentDirectory>,
    query: QueryConfig,
    state: Arc<Mutex<PagerState>>,
}

impl ThreadPager {
    /// Create a pager. Nothing is fetched until `load` or a request call.
    pub fn new(
        source: Arc<dyn ThreadSource>,
        agents: Arc<AgentDirectory>,
        query: QueryConfig,
        filter: ThreadFilter,
    ) -> Self {
        Self {
            source,
            agents,
            query,
            state: Arc::new(Mutex::new(PagerState {
                filter,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, PagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn page_size(&self) -> usize {
        self.query.page_size
    }

    pub fn filter(&self) -> ThreadFilter {
        self.state().filter.clone()
    }

    /// Generation of the current filter; bumps on every filter change.
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Change counter: differs whenever pages, pending fetches or the error
    /// state changed since it was last read. Discarded responses leave it
    /// alone.
    pub fn revision(&self) -> u64 {
        self.state().revision
    }

    /// Number of requested pages.
    pub fn size(&self) -> usize {
        self.state().slots.len()
    }

    /// One slot per requested page, `None` while its first fetch is in
    /// flight or after it failed. Slots are replaced, never edited, so
    /// `Arc::ptr_eq` tells whether a page changed.
    pub fn data(&self) -> Vec<Option<Arc<Vec<ThreadSummary>>>> {
        self.state().slots.iter().map(|s| s.data.clone()).collect()
    }

    /// Loaded pages concatenated in index order, each id once.
    pub fn flattened(&self) -> Vec<ThreadSummary> {
        let state = self.state();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for page in state.slots.iter().filter_map(|s| s.data.as_ref()) {
            for thread in page.iter() {
                if seen.insert(thread.id.as_str()) {
                    out.push(thread.clone());
                }
            }
        }
        out
    }

    /// No page has arrived yet and the first one is being fetched.
    pub fn is_loading(&self) -> bool {
        self.state()
            .slots
            .first()
            .is_some_and(|s| s.data.is_none() && s.pending.is_some())
    }

    /// A page beyond the first is in flight.
    pub fn is_loading_more(&self) -> bool {
        let state = self.state();
        state.slots.len() > 1
            && state
                .slots
                .last()
                .is_some_and(|s| s.data.is_none() && s.pending.is_some())
    }

    /// The first page came back with nothing in it.
    pub fn is_empty(&self) -> bool {
        self.state().is_empty()
    }

    /// No further pages: empty list, or the last loaded page was short.
    pub fn is_reaching_end(&self) -> bool {
        self.state().is_reaching_end(self.query.page_size)
    }

    pub fn error(&self) -> Option<ThreadListError> {
        self.state().error.clone()
    }

    /// Render state for the list, with the draft row merged in.
    pub fn view(
        &self,
        now: DateTime<Utc>,
        draft: &DraftOptions<'_>,
        pinned_attention: Option<&[ThreadSummary]>,
    ) -> ListView {
        if let Some(err) = self.error() {
            return ListView::Error(err.message());
        }
        let loaded_any = self.state().slots.iter().any(|s| s.data.is_some());
        if !loaded_any {
            return ListView::Loading;
        }

        let items = with_draft(self.flattened(), draft, now);
        if items.is_empty() && pinned_attention.is_none_or(|p| p.is_empty()) {
            return ListView::Empty;
        }
        ListView::Ready(group_threads(&items, now, pinned_attention))
    }

    // ── Requests ────────────────────────────────────────────────────────────

    /// Ensure pages `0..size` are requested. Never shrinks.
    pub fn request_pages(&self, size: usize) -> Vec<PageRequest> {
        let mut state = self.state();
        state.issue_missing(size, &self.query)
    }

    /// Request the next page.
    ///
    /// Nothing is issued while the last page is in flight or once the end
    /// is reached. A last page that failed is retried instead.
    pub fn request_more(&self) -> Vec<PageRequest> {
        let mut state = self.state();
        let size = state.slots.len();
        if let Some(last) = state.slots.last() {
            if last.data.is_none() {
                if last.pending.is_some() {
                    return Vec::new();
                }
                return state.issue_missing(size, &self.query);
            }
        }
        if state.is_reaching_end(self.query.page_size) {
            return Vec::new();
        }
        state.issue_missing(size + 1, &self.query)
    }

    /// Re-request every page, keeping current rows visible meanwhile.
    pub fn request_refresh(&self) -> Vec<PageRequest> {
        let mut state = self.state();
        if state.slots.is_empty() {
            return state.issue_missing(1, &self.query);
        }
        state.error = None;
        (0..state.slots.len())
            .map(|i| state.issue(i, &self.query))
            .collect()
    }

    /// Switch filter: drop every page and request a fresh first page.
    pub fn request_filter(&self, filter: ThreadFilter) -> PageRequest {
        let mut state = self.state();
        state.generation += 1;
        state.filter = filter;
        state.slots = vec![PageSlot::default()];
        state.error = None;
        debug!(generation = state.generation, filter = ?state.filter, "thread filter changed");
        state.issue(0, &self.query)
    }

    /// Apply the result of a request.
    pub fn resolve(
        &self,
        request: &PageRequest,
        result: anyhow::Result<Vec<ThreadRecord>>,
    ) -> Resolution {
        let mut state = self.state();
        if request.generation != state.generation {
            debug!(
                index = request.index,
                stale = request.generation,
                current = state.generation,
                "discarding page for superseded filter"
            );
            return Resolution::Discarded;
        }
        let scope = state
            .filter
            .scope
            .assistant_id()
            .and_then(|id| self.agents.get(id));
        let rows = result.map(|records| {
            records
                .iter()
                .map(|record| summarize(record, scope, &self.agents))
                .collect::<Vec<_>>()
        });

        let Some(slot) = state.slots.get_mut(request.index) else {
            return Resolution::Discarded;
        };
        if slot.pending != Some(request.token) {
            debug!(index = request.index, "discarding superseded page response");
            return Resolution::Discarded;
        }
        slot.pending = None;

        match rows {
            Ok(rows) => {
                debug!(index = request.index, rows = rows.len(), "page loaded");
                slot.data = Some(Arc::new(rows));
                state.revision += 1;
                Resolution::Applied
            }
            Err(e) => {
                let err = ThreadListError::fetch(&e);
                warn!(index = request.index, error = %err, "thread page fetch failed");
                state.error = Some(err.clone());
                state.revision += 1;
                Resolution::Failed(err)
            }
        }
    }

    // ── Fetching ────────────────────────────────────────────────────────────

    /// Fetch one request against the source and apply it.
    pub async fn fetch(&self, request: PageRequest) -> Resolution {
        let result = self.source.search(&request.params).await;
        self.resolve(&request, result)
    }

    /// Fetch requests concurrently. Fails with the first fetch error.
    pub async fn fetch_all(&self, requests: Vec<PageRequest>) -> Result<(), ThreadListError> {
        let outcomes = join_all(requests.into_iter().map(|r| self.fetch(r))).await;
        for outcome in outcomes {
            if let Resolution::Failed(err) = outcome {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Load the first page if nothing has been requested yet.
    pub async fn load(&self) -> Result<(), ThreadListError> {
        let requests = self.request_pages(1);
        self.fetch_all(requests).await
    }

    /// Load the next page.
    pub async fn load_more(&self) -> Result<(), ThreadListError> {
        let requests = self.request_more();
        self.fetch_all(requests).await
    }

    /// Load pages until `size` are present.
    pub async fn set_size(&self, size: usize) -> Result<(), ThreadListError> {
        let requests = self.request_pages(size);
        self.fetch_all(requests).await
    }

    /// Change filter and load its first page.
    pub async fn set_filter(&self, filter: ThreadFilter) -> Result<(), ThreadListError> {
        let request = self.request_filter(filter);
        self.fetch_all(vec![request]).await
    }

    /// Refetch every loaded page.
    pub async fn refresh(&self) -> Result<(), ThreadListError> {
        let requests = self.request_refresh();
        self.fetch_all(requests).await
    }

    /// A callback that refreshes this pager on the current tokio runtime.
    ///
    /// Meant to be handed to a [`crate::revalidate::StableCallback`].
    pub fn revalidator(&self) -> impl Fn() + Send + Sync + 'static {
        let pager = self.clone();
        move || match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pager = pager.clone();
                handle.spawn(async move {
                    // failures land in the pager's error state
                    let _ = pager.refresh().await;
                });
            }
            Err(_) => warn!("thread list revalidation requested outside a tokio runtime"),
        }
    }
}

impl std::fmt::Debug for ThreadPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ThreadPager")
            .field("filter", &state.filter)
            .field("generation", &state.generation)
            .field("pages", &state.slots.len())
            .finish()
    }
}
