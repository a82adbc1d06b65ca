//! Time bucketing and grouping of list rows.

use super::{classify, BucketPriority, ThreadSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use strum::Display;

/// Milliseconds in a day.
pub const DAY_MS: i64 = 86_400_000;

/// Age bucket of a timestamp relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeBucket {
    Today,
    Yesterday,
    Week,
    Older,
}

/// Bucket `updated_at` by whole days elapsed before `now`.
///
/// Days are floored, so 23h59m ago is still today and exactly 24h ago is
/// yesterday. Timestamps ahead of `now` count as today.
pub fn bucket(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> TimeBucket {
    let days = (now - updated_at).num_milliseconds().div_euclid(DAY_MS);
    match days {
        i64::MIN..=0 => TimeBucket::Today,
        1 => TimeBucket::Yesterday,
        2..=6 => TimeBucket::Week,
        _ => TimeBucket::Older,
    }
}

/// Display group of a row. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThreadGroup {
    Attention,
    Today,
    Yesterday,
    Week,
    Older,
}

impl ThreadGroup {
    /// Section heading.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Attention => "Requiring Attention",
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Week => "This Week",
            Self::Older => "Older",
        }
    }
}

impl From<TimeBucket> for ThreadGroup {
    fn from(bucket: TimeBucket) -> Self {
        match bucket {
            TimeBucket::Today => Self::Today,
            TimeBucket::Yesterday => Self::Yesterday,
            TimeBucket::Week => Self::Week,
            TimeBucket::Older => Self::Older,
        }
    }
}

/// Group for a single row. Attention statuses win over age.
pub fn group_for(thread: &ThreadSummary, now: DateTime<Utc>) -> ThreadGroup {
    if classify(&thread.status).priority == BucketPriority::Attention {
        return ThreadGroup::Attention;
    }
    match thread.updated_at {
        Some(updated_at) => bucket(updated_at, now).into(),
        None => ThreadGroup::Older,
    }
}

/// Display order within a group: draft first, then newest first, rows
/// without a timestamp last.
pub fn display_order(a: &ThreadSummary, b: &ThreadSummary) -> Ordering {
    b.is_draft()
        .cmp(&a.is_draft())
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// Sort rows for display in place.
pub fn sort_for_display(items: &mut [ThreadSummary]) {
    items.sort_by(display_order);
}

/// Rows split into display groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedThreads {
    groups: BTreeMap<ThreadGroup, Vec<ThreadSummary>>,
}

impl GroupedThreads {
    /// Rows in a group (empty slice if none).
    pub fn get(&self, group: ThreadGroup) -> &[ThreadSummary] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty groups in display order.
    pub fn iter(&self) -> impl Iterator<Item = (ThreadGroup, &[ThreadSummary])> {
        self.groups
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(group, rows)| (*group, rows.as_slice()))
    }

    /// Total number of rows across groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find which group holds a thread id.
    pub fn group_of(&self, id: &str) -> Option<ThreadGroup> {
        self.iter()
            .find(|(_, rows)| rows.iter().any(|t| t.id == id))
            .map(|(group, _)| group)
    }

    fn push(&mut self, group: ThreadGroup, thread: ThreadSummary) {
        self.groups.entry(group).or_default().push(thread);
    }
}

/// Group rows for display.
///
/// `pinned_attention` is the separately fetched attention list used by the
/// all-status view; its rows go first in "Requiring Attention" and are not
/// repeated below. Each id appears once, first occurrence wins.
pub fn group_threads(
    items: &[ThreadSummary],
    now: DateTime<Utc>,
    pinned_attention: Option<&[ThreadSummary]>,
) -> GroupedThreads {
    let mut grouped = GroupedThreads::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for thread in pinned_attention.unwrap_or(&[]) {
        if seen.insert(thread.id.as_str()) {
            grouped.push(ThreadGroup::Attention, thread.clone());
        }
    }

    for thread in items {
        if !seen.insert(thread.id.as_str()) {
            continue;
        }
        grouped.push(group_for(thread, now), thread.clone());
    }

    for rows in grouped.groups.values_mut() {
        sort_for_display(rows);
    }

    grouped
}
