//! Status classification for list rows.

use super::ThreadStatus;
use serde::Serialize;
use strum::Display;

/// Whether a status pulls the thread into the attention group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BucketPriority {
    Attention,
    Normal,
}

/// Abstract color for the status dot. Renderers map it to their palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ColorToken {
    Green,
    Yellow,
    Red,
    DarkRed,
    Gray,
}

/// Display classification of a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusClass {
    pub priority: BucketPriority,
    pub color: ColorToken,
    pub label: String,
    /// Shown with an error affordance without changing its group
    pub flagged: bool,
}

/// Classify a status. Total: unknown statuses come back neutral.
pub fn classify(status: &ThreadStatus) -> StatusClass {
    let (priority, color, flagged) = match status {
        ThreadStatus::Idle => (BucketPriority::Normal, ColorToken::Green, false),
        ThreadStatus::Busy => (BucketPriority::Normal, ColorToken::Yellow, false),
        ThreadStatus::Interrupted => (BucketPriority::Attention, ColorToken::Red, false),
        ThreadStatus::Error => (BucketPriority::Normal, ColorToken::DarkRed, true),
        ThreadStatus::Draft | ThreadStatus::Unknown(_) => {
            (BucketPriority::Normal, ColorToken::Gray, false)
        }
    };

    StatusClass {
        priority,
        color,
        label: status_label(status),
        flagged,
    }
}

/// Classify a raw status string.
pub fn classify_str(raw: &str) -> StatusClass {
    classify(&ThreadStatus::parse(raw))
}

fn status_label(status: &ThreadStatus) -> String {
    let raw = status.as_str().trim();
    if raw.is_empty() {
        return "unknown".to_string();
    }
    raw.replace('_', " ")
}
