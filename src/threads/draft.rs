//! Draft entry synthesis.

use super::{ThreadStatus, ThreadSummary, DRAFT_THREAD_ID};
use crate::agents::AgentRef;
use chrono::{DateTime, Utc};

/// Inputs deciding whether the draft row is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftOptions<'a> {
    /// Caller opted in to showing a draft
    pub show_draft: bool,
    /// Thread currently open, if any. An empty id counts as none.
    pub current_thread_id: Option<&'a str>,
    /// Agent the new conversation would go to
    pub agent: Option<&'a AgentRef>,
}

impl DraftOptions<'_> {
    /// Would a draft row be shown with these options?
    pub fn wants_draft(&self) -> bool {
        let thread_selected = self.current_thread_id.is_some_and(|id| !id.is_empty());
        self.show_draft && !thread_selected && self.agent.is_some()
    }
}

/// Build the synthetic draft row for `agent`.
pub fn draft_entry(agent: &AgentRef, now: DateTime<Utc>) -> ThreadSummary {
    ThreadSummary {
        id: DRAFT_THREAD_ID.to_string(),
        status: ThreadStatus::Draft,
        updated_at: Some(now),
        title: agent.display_name().to_string(),
        description: agent
            .description()
            .unwrap_or("Draft thread")
            .to_string(),
        assistant_id: Some(agent.assistant_id.clone()),
    }
}

/// Prepend the draft row when `opts` ask for one.
///
/// Otherwise `items` comes back untouched. When the draft is added, any
/// stale draft row already in `items` is dropped so the id stays unique.
pub fn with_draft(
    items: Vec<ThreadSummary>,
    opts: &DraftOptions<'_>,
    now: DateTime<Utc>,
) -> Vec<ThreadSummary> {
    let Some(agent) = opts.agent.filter(|_| opts.wants_draft()) else {
        return items;
    };

    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(draft_entry(agent, now));
    out.extend(items.into_iter().filter(|t| t.id != DRAFT_THREAD_ID));
    out
}
