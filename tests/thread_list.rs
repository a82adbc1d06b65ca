//! End-to-end behaviour of the thread list over an in-memory source.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thread_inbox::source::{CountParams, SortBy, SortOrder};
use thread_inbox::threads::DraftOptions;
use thread_inbox::{
    AgentDirectory, AgentRef, AgentScope, ListView, QueryConfig, Resolution, RevalidationBridge,
    SearchParams, StableCallback, StatusFilter, ThreadFilter, ThreadGroup, ThreadListError,
    ThreadPager, ThreadRecord, ThreadSource, ThreadStatus,
};

// ── Test source ─────────────────────────────────────────────────────────────

/// Serves a mutable set of threads, honouring status, assistant filter,
/// offset and limit. Every search is recorded.
#[derive(Default)]
struct ScriptedSource {
    threads: Mutex<Vec<ThreadRecord>>,
    calls: Mutex<Vec<SearchParams>>,
    failing: AtomicBool,
}

impl ScriptedSource {
    fn with_threads(threads: Vec<ThreadRecord>) -> Arc<Self> {
        let source = Self::default();
        *source.threads.lock().unwrap() = threads;
        Arc::new(source)
    }

    fn set_threads(&self, threads: Vec<ThreadRecord>) {
        *self.threads.lock().unwrap() = threads;
    }

    fn calls(&self) -> Vec<SearchParams> {
        self.calls.lock().unwrap().clone()
    }

    fn matching(&self, params: &SearchParams) -> Vec<ThreadRecord> {
        self.threads
            .lock()
            .unwrap()
            .iter()
            .filter(|t| params.status.is_none() || t.status == params.status)
            .filter(|t| match params.assistant_id() {
                Some(id) => t.assistant_id() == Some(id),
                None => true,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ThreadSource for ScriptedSource {
    async fn search(&self, params: &SearchParams) -> Result<Vec<ThreadRecord>> {
        self.calls.lock().unwrap().push(params.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("threads/search returned 503 Service Unavailable"));
        }
        Ok(self
            .matching(params)
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .collect())
    }

    async fn count(&self, params: &CountParams) -> Result<u64> {
        let search = SearchParams {
            status: params.status.clone(),
            metadata: params.metadata.clone(),
            ..SearchParams::new(0)
        };
        Ok(self.matching(&search).len() as u64)
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn record(id: &str, status: &str, updated_at: &str, assistant: &str) -> ThreadRecord {
    serde_json::from_value(json!({
        "thread_id": id,
        "status": status,
        "updated_at": updated_at,
        "metadata": {"assistant_id": assistant, "graph_id": "deep_agent"},
        "values": {"messages": [
            {"type": "human", "content": format!("question in {id}")},
            {"type": "ai", "content": format!("answer in {id}")}
        ]}
    }))
    .unwrap()
}

/// `n` idle threads, newest first.
fn idle_threads(n: usize) -> Vec<ThreadRecord> {
    (0..n)
        .map(|i| {
            let at = now() - chrono::Duration::minutes(i as i64);
            record(&format!("t-{i:03}"), "idle", &at.to_rfc3339(), "asst-1")
        })
        .collect()
}

fn directory() -> Arc<AgentDirectory> {
    Arc::new(AgentDirectory::for_deployment(
        vec![
            AgentRef::new("asst-1", "dep-1", "Researcher").with_description("Finds things"),
            AgentRef::new("asst-2", "dep-1", "Writer"),
        ],
        "dep-1",
    ))
}

fn pager(source: Arc<ScriptedSource>, filter: ThreadFilter) -> ThreadPager {
    ThreadPager::new(source, directory(), QueryConfig::default(), filter)
}

fn ids(pager: &ThreadPager) -> Vec<String> {
    pager.flattened().into_iter().map(|t| t.id).collect()
}

fn ready(view: ListView) -> thread_inbox::GroupedThreads {
    match view {
        ListView::Ready(groups) => groups,
        other => panic!("expected a ready list, got {other:?}"),
    }
}

/// Let spawned refresh tasks run to completion.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_page_then_short_page_reaches_end() {
    let source = ScriptedSource::with_threads(idle_threads(27));
    let pager = pager(source.clone(), ThreadFilter::default());

    pager.load().await.unwrap();
    assert_eq!(pager.flattened().len(), 20);
    assert!(!pager.is_reaching_end());

    pager.load_more().await.unwrap();
    assert_eq!(pager.flattened().len(), 27);
    assert!(pager.is_reaching_end());

    // At the end, load_more does not hit the source again.
    pager.load_more().await.unwrap();
    assert_eq!(source.calls().len(), 2);
    assert_eq!(pager.size(), 2);
}

#[tokio::test]
async fn test_full_page_then_empty_page_reaches_end() {
    let source = ScriptedSource::with_threads(idle_threads(20));
    let pager = pager(source.clone(), ThreadFilter::default());

    pager.load().await.unwrap();
    assert!(!pager.is_reaching_end());

    // One extra request is needed to learn the list is over.
    pager.load_more().await.unwrap();
    assert!(pager.is_reaching_end());
    assert!(!pager.is_empty());
    assert_eq!(source.calls().len(), 2);
    assert_eq!(source.calls()[1].offset, 20);
}

#[tokio::test]
async fn test_page_params_follow_query_config() {
    let source = ScriptedSource::with_threads(idle_threads(5));
    let pager = pager(
        source.clone(),
        ThreadFilter::new(StatusFilter::Idle, AgentScope::Agent("asst-1".into())),
    );
    pager.load().await.unwrap();

    let call = &source.calls()[0];
    assert_eq!(call.limit, 20);
    assert_eq!(call.offset, 0);
    assert_eq!(call.sort_by, SortBy::CreatedAt);
    assert_eq!(call.sort_order, SortOrder::Desc);
    assert_eq!(call.status, Some(ThreadStatus::Idle));
    assert_eq!(call.assistant_id(), Some("asst-1"));
    assert_eq!(pager.flattened()[0].title, "question in t-000");
}

#[test]
fn test_flattened_follows_page_index_not_arrival_order() {
    let source = ScriptedSource::with_threads(Vec::new());
    let pager = pager(source, ThreadFilter::default());
    let requests = pager.request_pages(3);
    assert_eq!(requests.len(), 3);

    let page = |prefix: &str| -> Vec<ThreadRecord> {
        (0..20)
            .map(|i| record(&format!("{prefix}-{i}"), "idle", "2024-06-15T10:00:00Z", "asst-1"))
            .collect()
    };

    assert_eq!(pager.resolve(&requests[2], Ok(page("p2"))), Resolution::Applied);
    assert_eq!(pager.resolve(&requests[0], Ok(page("p0"))), Resolution::Applied);
    assert_eq!(pager.resolve(&requests[1], Ok(page("p1"))), Resolution::Applied);

    let expected: Vec<String> = pager
        .data()
        .into_iter()
        .flat_map(|slot| slot.unwrap().iter().map(|t| t.id.clone()).collect::<Vec<_>>())
        .collect();
    assert_eq!(ids(&pager), expected);
    assert_eq!(ids(&pager)[0], "p0-0");
    assert_eq!(ids(&pager)[20], "p1-0");
    assert_eq!(ids(&pager)[40], "p2-0");
}

#[tokio::test]
async fn test_set_size_fetches_missing_pages_concurrently() {
    let source = ScriptedSource::with_threads(idle_threads(50));
    let pager = pager(source.clone(), ThreadFilter::default());

    pager.set_size(3).await.unwrap();
    assert_eq!(pager.size(), 3);
    assert_eq!(pager.flattened().len(), 50);
    let mut offsets: Vec<usize> = source.calls().iter().map(|c| c.offset).collect();
    offsets.sort();
    assert_eq!(offsets, vec![0, 20, 40]);

    // Already loaded pages are not fetched again.
    pager.set_size(2).await.unwrap();
    assert_eq!(source.calls().len(), 3);
}

// ── Grouping ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mixed_statuses_group_by_attention_then_age() {
    let source = ScriptedSource::with_threads(vec![
        record("idle-today", "idle", "2024-06-15T11:00:00Z", "asst-1"),
        record("busy-yesterday", "busy", "2024-06-14T10:00:00Z", "asst-1"),
        record("interrupted-today", "interrupted", "2024-06-15T11:30:00Z", "asst-2"),
        record("error-yesterday", "error", "2024-06-14T09:00:00Z", "asst-2"),
        record("idle-old", "idle", "2024-06-07T10:00:00Z", "asst-1"),
    ]);
    let pager = pager(source, ThreadFilter::default());
    pager.load().await.unwrap();

    let groups = ready(pager.view(now(), &DraftOptions::default(), None));
    assert_eq!(groups.group_of("interrupted-today"), Some(ThreadGroup::Attention));
    assert_eq!(groups.group_of("idle-today"), Some(ThreadGroup::Today));
    assert_eq!(groups.group_of("idle-old"), Some(ThreadGroup::Older));

    let yesterday: Vec<&str> = groups
        .get(ThreadGroup::Yesterday)
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(yesterday, vec!["busy-yesterday", "error-yesterday"]);

    let order: Vec<ThreadGroup> = groups.iter().map(|(g, _)| g).collect();
    assert_eq!(
        order,
        vec![
            ThreadGroup::Attention,
            ThreadGroup::Today,
            ThreadGroup::Yesterday,
            ThreadGroup::Older
        ]
    );

    // Rows take their owner's name when listing all agents.
    assert_eq!(groups.get(ThreadGroup::Attention)[0].title, "Writer");
}

#[tokio::test]
async fn test_pinned_attention_rows_lead_and_are_not_repeated() {
    let source = ScriptedSource::with_threads(vec![
        record("a", "idle", "2024-06-15T11:00:00Z", "asst-1"),
        record("b", "interrupted", "2024-05-01T11:00:00Z", "asst-1"),
        record("c", "interrupted", "2024-06-15T09:00:00Z", "asst-1"),
    ]);
    let list = pager(source.clone(), ThreadFilter::default());
    let pinned = ThreadPager::new(
        source,
        directory(),
        QueryConfig {
            page_size: 5,
            ..Default::default()
        },
        ThreadFilter::default().with_status(StatusFilter::Interrupted),
    );
    list.load().await.unwrap();
    pinned.load().await.unwrap();

    let pinned_rows = pinned.flattened();
    let groups = ready(list.view(now(), &DraftOptions::default(), Some(pinned_rows.as_slice())));
    assert_eq!(groups.len(), 3);
    let attention: Vec<&str> = groups
        .get(ThreadGroup::Attention)
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(attention, vec!["c", "b"]);
}

#[tokio::test]
async fn test_draft_row_tops_today() {
    let source = ScriptedSource::with_threads(vec![record(
        "recent",
        "idle",
        "2024-06-15T11:59:00Z",
        "asst-1",
    )]);
    let pager = pager(
        source,
        ThreadFilter::default().with_scope(AgentScope::Agent("asst-1".into())),
    );
    pager.load().await.unwrap();

    let dir = directory();
    let agent = dir.get("asst-1").unwrap();
    let draft = DraftOptions {
        show_draft: true,
        current_thread_id: None,
        agent: Some(agent),
    };
    let groups = ready(pager.view(now(), &draft, None));
    let today = groups.get(ThreadGroup::Today);
    assert_eq!(today[0].id, "__draft__");
    assert_eq!(today[0].status, ThreadStatus::Draft);
    assert_eq!(today[0].description, "Finds things");
    assert_eq!(today[1].id, "recent");

    // Opening a real thread removes the draft.
    let opened = DraftOptions {
        current_thread_id: Some("recent"),
        ..draft
    };
    let groups = ready(pager.view(now(), &opened, None));
    assert!(groups.group_of("__draft__").is_none());
    assert_eq!(groups.len(), 1);
}

#[tokio::test]
async fn test_draft_shows_on_empty_list() {
    let source = ScriptedSource::with_threads(Vec::new());
    let pager = pager(
        source,
        ThreadFilter::default().with_scope(AgentScope::Agent("asst-2".into())),
    );
    pager.load().await.unwrap();
    assert!(pager.is_empty());

    assert_eq!(pager.view(now(), &DraftOptions::default(), None), ListView::Empty);

    let dir = directory();
    let draft = DraftOptions {
        show_draft: true,
        current_thread_id: None,
        agent: dir.get("asst-2"),
    };
    let groups = ready(pager.view(now(), &draft, None));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.get(ThreadGroup::Today)[0].description, "Draft thread");
}

// ── Filtering ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_filter_change_mid_pagination_restarts_at_first_page() {
    let mut threads = idle_threads(45);
    threads.push(record("stuck", "interrupted", "2024-06-15T08:00:00Z", "asst-1"));
    let source = ScriptedSource::with_threads(threads);
    let pager = pager(source.clone(), ThreadFilter::default());

    pager.set_size(2).await.unwrap();
    assert_eq!(pager.size(), 2);
    let generation = pager.generation();

    pager
        .set_filter(ThreadFilter::default().with_status(StatusFilter::Interrupted))
        .await
        .unwrap();

    assert_eq!(pager.size(), 1);
    assert!(pager.generation() > generation);
    assert_eq!(ids(&pager), vec!["stuck"]);
    assert!(pager.is_reaching_end());

    let calls = source.calls();
    let last = calls.last().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(last.offset, 0);
    assert_eq!(last.status, Some(ThreadStatus::Interrupted));
    assert_eq!(
        last.metadata.get("graph_id").and_then(Value::as_str),
        Some("deep_agent")
    );
}

#[tokio::test]
async fn test_response_for_old_filter_is_dropped() {
    let source = ScriptedSource::with_threads(idle_threads(3));
    let pager = pager(source.clone(), ThreadFilter::default());

    let old = pager.request_pages(1);
    let fresh = pager.request_filter(ThreadFilter::default().with_status(StatusFilter::Busy));

    let stale_rows = source.search(&old[0].params).await;
    assert_eq!(pager.resolve(&old[0], stale_rows), Resolution::Discarded);
    assert!(pager.is_loading());

    let rows = source.search(&fresh.params).await;
    assert_eq!(pager.resolve(&fresh, rows), Resolution::Applied);
    assert!(pager.is_empty());
    assert_eq!(pager.view(now(), &DraftOptions::default(), None), ListView::Empty);
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_error_is_surfaced_and_cleared_by_next_action() {
    let source = ScriptedSource::with_threads(idle_threads(3));
    source.failing.store(true, Ordering::SeqCst);
    let pager = pager(source.clone(), ThreadFilter::default());

    let err = pager.load().await.unwrap_err();
    assert!(matches!(err, ThreadListError::Fetch { .. }));
    assert_eq!(
        pager.view(now(), &DraftOptions::default(), None),
        ListView::Error("threads/search returned 503 Service Unavailable".into())
    );

    // Not retried on its own.
    assert_eq!(source.calls().len(), 1);

    source.failing.store(false, Ordering::SeqCst);
    pager
        .set_filter(ThreadFilter::default().with_status(StatusFilter::Idle))
        .await
        .unwrap();
    assert!(pager.error().is_none());
    assert_eq!(pager.flattened().len(), 3);
}

// ── Revalidation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_reflects_changes_and_keeps_rows_meanwhile() {
    let source = ScriptedSource::with_threads(idle_threads(2));
    let pager = pager(source.clone(), ThreadFilter::default());
    pager.load().await.unwrap();

    let mut updated = idle_threads(2);
    updated[0] = record("t-000", "busy", &now().to_rfc3339(), "asst-1");
    source.set_threads(updated);

    let requests = pager.request_refresh();
    assert_eq!(pager.flattened()[0].status, ThreadStatus::Idle);
    for request in requests {
        pager.fetch(request).await;
    }
    assert_eq!(pager.flattened()[0].status, ThreadStatus::Busy);
}

#[tokio::test]
async fn test_registered_revalidation_sees_latest_data() {
    let source = ScriptedSource::with_threads(idle_threads(1));
    let first = pager(source.clone(), ThreadFilter::default());
    first.load().await.unwrap();

    let bridge = RevalidationBridge::new();
    let handle = StableCallback::new(first.revalidator());
    assert!(bridge.register(handle.clone()));

    // The list re-renders with a new pager; only the handle's target moves.
    let second = pager(
        source.clone(),
        ThreadFilter::default().with_scope(AgentScope::Agent("asst-1".into())),
    );
    second.load().await.unwrap();
    handle.update(second.revalidator());
    assert!(!bridge.register(StableCallback::new(first.revalidator())));

    source.set_threads(idle_threads(4));
    bridge.revalidate();
    settle().await;

    assert_eq!(second.flattened().len(), 4);
    assert_eq!(first.flattened().len(), 1);
}
