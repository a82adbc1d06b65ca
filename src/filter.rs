//! List filters: status × agent scope.

use crate::source::{SearchParams, SortBy, SortOrder};
use crate::threads::ThreadStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Status filter of the list.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StatusFilter {
    #[default]
    All,
    Idle,
    Busy,
    Interrupted,
    Error,
}

impl StatusFilter {
    /// Status sent to the search API; `None` for all.
    pub fn status(&self) -> Option<ThreadStatus> {
        match self {
            Self::All => None,
            Self::Idle => Some(ThreadStatus::Idle),
            Self::Busy => Some(ThreadStatus::Busy),
            Self::Interrupted => Some(ThreadStatus::Interrupted),
            Self::Error => Some(ThreadStatus::Error),
        }
    }
}

/// Which agents' threads are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentScope {
    #[default]
    AllAgents,
    Agent(String),
}

impl AgentScope {
    pub fn assistant_id(&self) -> Option<&str> {
        match self {
            Self::AllAgents => None,
            Self::Agent(id) => Some(id),
        }
    }
}

/// The full query scope. Changing it resets pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadFilter {
    pub status: StatusFilter,
    pub scope: AgentScope,
}

impl ThreadFilter {
    pub fn new(status: StatusFilter, scope: AgentScope) -> Self {
        Self { status, scope }
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_scope(mut self, scope: AgentScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Query settings shared by every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub page_size: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Graph the all-agents scope is restricted to
    pub default_graph_id: Option<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            sort_by: SortBy::CreatedAt,
            sort_order: SortOrder::Desc,
            default_graph_id: Some("deep_agent".to_string()),
        }
    }
}

impl QueryConfig {
    /// Search parameters for page `index` under `filter`.
    pub fn page(&self, filter: &ThreadFilter, index: usize) -> SearchParams {
        let mut params = SearchParams::new(self.page_size);
        params.offset = index * self.page_size;
        params.sort_by = self.sort_by;
        params.sort_order = self.sort_order;
        params.status = filter.status.status();

        match (&filter.scope, &self.default_graph_id) {
            (AgentScope::Agent(id), _) => params = params.assistant(id),
            (AgentScope::AllAgents, Some(graph_id)) => {
                params
                    .metadata
                    .insert("graph_id".into(), Value::String(graph_id.clone()));
            }
            (AgentScope::AllAgents, None) => {}
        }
        params
    }
}
