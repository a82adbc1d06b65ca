//! Thread model: core types for the thread list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the synthetic entry standing in for an unsent conversation.
pub const DRAFT_THREAD_ID: &str = "__draft__";

/// Thread status as reported by the deployment.
///
/// The backend vocabulary is `idle`, `busy`, `interrupted` and `error`.
/// `Draft` only ever exists client-side. Anything else is kept verbatim in
/// `Unknown` so a newer server never breaks the list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThreadStatus {
    Idle,
    Busy,
    Interrupted,
    Error,
    /// Placeholder for a conversation that has no persisted thread yet
    Draft,
    /// A status string this crate doesn't know about
    Unknown(String),
}

impl ThreadStatus {
    /// Parse a raw status string. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "idle" => Self::Idle,
            "busy" => Self::Busy,
            "interrupted" => Self::Interrupted,
            "error" => Self::Error,
            "draft" => Self::Draft,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Interrupted => "interrupted",
            Self::Error => "error",
            Self::Draft => "draft",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft)
    }
}

impl From<String> for ThreadStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for ThreadStatus {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<ThreadStatus> for String {
    fn from(status: ThreadStatus) -> Self {
        match status {
            ThreadStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the thread list.
///
/// Rows are rebuilt from scratch on every fetch and never edited in place;
/// `id` is the only identity they carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Opaque thread id
    pub id: String,

    /// Current status
    pub status: ThreadStatus,

    /// Last update, falling back to creation time. `None` when the record
    /// carried neither; such rows sort last and land in "Older".
    pub updated_at: Option<DateTime<Utc>>,

    /// Display title
    pub title: String,

    /// Display description or last-message snippet
    pub description: String,

    /// Owning agent, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

impl ThreadSummary {
    /// Create a row with generic title and description.
    pub fn new(
        id: impl Into<String>,
        status: impl Into<ThreadStatus>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            updated_at,
            title: "Agent".to_string(),
            description: "No description".to_string(),
            assistant_id: None,
        }
    }

    /// Is this the synthetic draft entry? Only the reserved id counts; a
    /// persisted thread reporting a `draft` status is an ordinary row.
    pub fn is_draft(&self) -> bool {
        self.id == DRAFT_THREAD_ID
    }
}
