//! Display helpers for list rows.

use super::{bucket, TimeBucket};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::fmt;

/// Short timestamp label: `HH:MM` today, `Yesterday`, the weekday name
/// within a week, `MM/DD` beyond that.
///
/// Both times are formatted in their own zone; the day count is zone-free.
pub fn format_time<Tz>(at: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match bucket(at.with_timezone(&Utc), now.with_timezone(&Utc)) {
        TimeBucket::Today => at.format("%H:%M").to_string(),
        TimeBucket::Yesterday => "Yesterday".to_string(),
        TimeBucket::Week => at.format("%A").to_string(),
        TimeBucket::Older => at.format("%m/%d").to_string(),
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Plain text of a LangGraph message.
///
/// `content` is either a string or a list of parts, where text parts are
/// plain strings or `{"type": "text", "text": ...}` objects. Everything else
/// (images, tool calls) is skipped.
pub fn message_text(message: &Value) -> String {
    match message.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("text") => {
                    Some(obj.get("text").and_then(Value::as_str).unwrap_or(""))
                }
                _ => None,
            })
            .collect(),
        _ => String::new(),
    }
}
