//! Mapping search records to list rows.

use super::{message_text, truncate_text, ThreadStatus, ThreadSummary};
use crate::agents::{AgentDirectory, AgentRef};
use crate::source::ThreadRecord;
use serde_json::Value;
use tracing::warn;

/// Characters kept from a message for titles and snippets.
pub const SNIPPET_CHARS: usize = 80;

const DEFAULT_TITLE: &str = "Agent";
const DEFAULT_DESCRIPTION: &str = "No description";

/// Build a list row from a search record.
///
/// With a `scope` agent the row is titled after the last human message and
/// described by the last message. Without one, the owning agent is looked up
/// from `metadata.assistant_id` and lends its name and description.
pub fn summarize(
    record: &ThreadRecord,
    scope: Option<&AgentRef>,
    directory: &AgentDirectory,
) -> ThreadSummary {
    let messages = thread_messages(record);
    let snippet = messages
        .last()
        .map(|m| truncate_text(&message_text(m), SNIPPET_CHARS))
        .unwrap_or_default();

    let (title, description, assistant_id) = match scope {
        Some(agent) => {
            let last_human = messages
                .iter()
                .rev()
                .find(|m| m.get("type").and_then(Value::as_str) == Some("human"))
                .map(|m| truncate_text(&message_text(m), SNIPPET_CHARS))
                .unwrap_or_default();
            (
                non_empty(last_human).unwrap_or_else(|| agent.display_name().to_string()),
                non_empty(snippet)
                    .or_else(|| agent.description().map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
                Some(agent.assistant_id.clone()),
            )
        }
        None => {
            let assistant_id = record.assistant_id().map(str::to_string);
            let owner = assistant_id.as_deref().and_then(|id| directory.get(id));
            (
                owner
                    .map(|a| a.display_name().to_string())
                    .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                non_empty(snippet)
                    .or_else(|| owner.and_then(|a| a.description()).map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
                assistant_id,
            )
        }
    };

    ThreadSummary {
        id: record.thread_id.clone(),
        status: record
            .status
            .clone()
            .unwrap_or_else(|| ThreadStatus::Unknown(String::new())),
        updated_at: record.last_activity(),
        title,
        description,
        assistant_id,
    }
}

/// `values.messages` of a record, or nothing when absent or malformed.
pub fn thread_messages(record: &ThreadRecord) -> &[Value] {
    let Some(values) = record.values.as_ref() else {
        return &[];
    };
    match values.get("messages") {
        Some(Value::Array(messages)) => messages.as_slice(),
        Some(_) => {
            warn!(thread_id = %record.thread_id, "thread values.messages is not a list");
            &[]
        }
        None => &[],
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
