//! Agent lookup and per-agent inbox summaries.

use crate::source::{CountParams, SearchParams, SortBy, SortOrder, ThreadRecord, ThreadSource};
use crate::threads::{
    message_text, truncate_text, ThreadStatus, ThreadSummary, thread_messages,
};
use anyhow::Result;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Snippet length used on agent cards.
const CARD_SNIPPET_CHARS: usize = 60;

/// An agent (assistant) hosted on a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRef {
    pub assistant_id: String,
    #[serde(default)]
    pub deployment_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AgentRef {
    pub fn new(
        assistant_id: impl Into<String>,
        deployment_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            deployment_id: deployment_id.into(),
            name: name.into(),
            metadata: Map::new(),
        }
    }

    /// Set `metadata.description`.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata
            .insert("description".into(), Value::String(description.into()));
        self
    }

    /// Name, or "Agent" when unnamed.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Agent"
        } else {
            &self.name
        }
    }

    /// Non-empty `metadata.description`.
    pub fn description(&self) -> Option<&str> {
        self.metadata
            .get("description")
            .and_then(Value::as_str)
            .filter(|d| !d.trim().is_empty())
    }
}

/// Agents of one deployment, indexed by assistant id.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    deployment_id: String,
    agents: Vec<AgentRef>,
    by_id: HashMap<String, usize>,
}

impl AgentDirectory {
    /// Keep the agents belonging to `deployment_id`, in input order.
    pub fn for_deployment(
        agents: impl IntoIterator<Item = AgentRef>,
        deployment_id: &str,
    ) -> Self {
        let mut directory = Self {
            deployment_id: deployment_id.to_string(),
            ..Default::default()
        };
        for agent in agents {
            if agent.deployment_id != deployment_id
                || directory.by_id.contains_key(&agent.assistant_id)
            {
                continue;
            }
            directory
                .by_id
                .insert(agent.assistant_id.clone(), directory.agents.len());
            directory.agents.push(agent);
        }
        directory
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn get(&self, assistant_id: &str) -> Option<&AgentRef> {
        self.by_id.get(assistant_id).map(|&idx| &self.agents[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRef> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// An agent card: latest thread plus an interrupted-count badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub agent: AgentRef,
    pub latest_thread: Option<ThreadSummary>,
    /// `None` for zero, `"99+"` past 99
    pub interrupted: Option<String>,
}

/// Badge text for an interrupted count.
pub fn interrupted_badge(count: u64) -> Option<String> {
    match count {
        0 => None,
        1..=99 => Some(count.to_string()),
        _ => Some("99+".to_string()),
    }
}

/// Summaries for every agent in `directory`, most recently active first.
///
/// Agents are queried concurrently. An agent whose queries fail still gets
/// a card, just without a thread or badge.
pub async fn agent_summaries(
    source: &dyn ThreadSource,
    directory: &AgentDirectory,
) -> Vec<AgentSummary> {
    let cards = directory.iter().map(|agent| async move {
        match agent_summary(source, agent).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(agent = %agent.display_name(), error = %e, "failed to fetch threads for agent");
                AgentSummary {
                    agent: agent.clone(),
                    latest_thread: None,
                    interrupted: None,
                }
            }
        }
    });

    let mut summaries = join_all(cards).await;
    summaries.sort_by(|a, b| {
        let at = a.latest_thread.as_ref().map(|t| t.updated_at);
        let bt = b.latest_thread.as_ref().map(|t| t.updated_at);
        bt.cmp(&at)
    });
    summaries
}

async fn agent_summary(source: &dyn ThreadSource, agent: &AgentRef) -> Result<AgentSummary> {
    let count = CountParams {
        status: Some(ThreadStatus::Interrupted),
        metadata: SearchParams::new(1).assistant(&agent.assistant_id).metadata,
    };
    let interrupted = source.count(&count).await?;

    let mut latest = SearchParams::new(1).assistant(&agent.assistant_id);
    latest.sort_by = SortBy::UpdatedAt;
    latest.sort_order = SortOrder::Desc;
    let latest_thread = source
        .search(&latest)
        .await?
        .first()
        .map(|record| card_thread(record, agent));

    Ok(AgentSummary {
        agent: agent.clone(),
        latest_thread,
        interrupted: interrupted_badge(interrupted),
    })
}

fn card_thread(record: &ThreadRecord, agent: &AgentRef) -> ThreadSummary {
    let snippet = thread_messages(record)
        .last()
        .map(|m| truncate_text(&message_text(m), CARD_SNIPPET_CHARS))
        .filter(|s| !s.trim().is_empty());

    ThreadSummary {
        id: record.thread_id.clone(),
        status: record
            .status
            .clone()
            .unwrap_or_else(|| ThreadStatus::Unknown(String::new())),
        updated_at: record.last_activity(),
        title: agent.display_name().to_string(),
        description: snippet
            .or_else(|| agent.description().map(str::to_string))
            .unwrap_or_else(|| "No description".to_string()),
        assistant_id: Some(agent.assistant_id.clone()),
    }
}
