use crate::error::ThreadListError;
use crate::filter::QueryConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A deployment hosting agents and their threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    /// Base URL of the deployment's API
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Deployment {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Configuration for thread-inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Threads per page
    pub page_size: usize,
    /// Seconds between background refreshes in watch mode
    pub poll_interval_secs: u64,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// Graph the all-agents view is restricted to; empty disables the filter
    pub default_graph_id: Option<String>,
    pub deployments: Vec<Deployment>,
    /// Deployment used when none is given on the command line
    pub default_deployment: Option<String>,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            poll_interval_secs: 30,
            request_timeout_secs: 30,
            default_graph_id: Some("deep_agent".to_string()),
            deployments: Vec::new(),
            default_deployment: None,
        }
    }
}

impl InboxConfig {
    /// `~/.thread-inbox/config.toml`
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".thread-inbox").join("config.toml")
    }

    /// Load configuration from file, or defaults if it doesn't exist.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str::<InboxConfig>(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?
        } else {
            InboxConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus one deployment, which becomes the default.
    pub fn with_deployment(deployment: Deployment) -> Self {
        Self {
            default_deployment: Some(deployment.id.clone()),
            deployments: vec![deployment],
            ..Default::default()
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ThreadListError> {
        if self.page_size == 0 {
            return Err(ThreadListError::Config("page_size must be at least 1".into()));
        }
        if let Some(id) = &self.default_deployment {
            self.deployment(Some(id))?;
        }
        Ok(())
    }

    /// Look up a deployment by id; `None` picks the default, or the only one
    /// configured.
    pub fn deployment(&self, id: Option<&str>) -> Result<&Deployment, ThreadListError> {
        let wanted = id.or(self.default_deployment.as_deref());
        match wanted {
            Some(id) => self
                .deployments
                .iter()
                .find(|d| d.id == id)
                .ok_or_else(|| ThreadListError::UnknownDeployment(id.to_string())),
            None => match self.deployments.as_slice() {
                [only] => Ok(only),
                [] => Err(ThreadListError::Config("no deployments configured".into())),
                _ => Err(ThreadListError::Config(
                    "several deployments configured; pick one with --deployment".into(),
                )),
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Query settings for the thread pager.
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            page_size: self.page_size,
            default_graph_id: self
                .default_graph_id
                .clone()
                .filter(|g| !g.trim().is_empty()),
            ..Default::default()
        }
    }
}
