pub mod agents;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pager;
pub mod poll;
pub mod revalidate;
pub mod source;
pub mod threads;

// Re-export the list's main types at crate root for convenience
pub use agents::{AgentDirectory, AgentRef, AgentSummary, agent_summaries};
pub use error::ThreadListError;
pub use filter::{AgentScope, QueryConfig, StatusFilter, ThreadFilter};
pub use pager::{ListView, PageRequest, Resolution, ThreadPager};
pub use revalidate::{RevalidationBridge, StableCallback};
pub use source::{HttpThreadSource, SearchParams, ThreadRecord, ThreadSource};
pub use threads::{GroupedThreads, ThreadGroup, ThreadStatus, ThreadSummary};
