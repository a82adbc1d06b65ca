//! Errors surfaced by the thread list.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadListError {
    /// The search call failed or returned a non-success status. Not retried;
    /// the next user action (filter change, load more, refresh) tries again.
    #[error("failed to load threads: {message}")]
    Fetch { message: String },

    #[error("unknown deployment: {0}")]
    UnknownDeployment(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ThreadListError {
    /// Wrap a source error, keeping its full context chain.
    pub fn fetch(err: &anyhow::Error) -> Self {
        Self::Fetch {
            message: format!("{err:#}"),
        }
    }

    /// Raw message for the error panel.
    pub fn message(&self) -> String {
        match self {
            Self::Fetch { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
