//! Thread data source: the search API the list reads from.
//!
//! `ThreadSource` is the seam; `HttpThreadSource` talks to a LangGraph-style
//! deployment (`POST /threads/search`, `POST /threads/count`,
//! `POST /assistants/search`).

use crate::agents::AgentRef;
use crate::config::Deployment;
use crate::threads::ThreadStatus;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use strum::Display;
use tracing::{debug, instrument};
use url::Url;

// ── Wire types ──────────────────────────────────────────────────────────────

/// One thread as returned by `threads/search`.
///
/// Optional fields are read leniently: a value of the wrong type is treated
/// as absent, so one odd record can't fail a whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<ThreadStatus>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub values: Option<Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ThreadStatus>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(ThreadStatus::from(s)),
        _ => None,
    })
}

fn lenient_object<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Map<String, Value>>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

impl ThreadRecord {
    /// `updated_at`, else `created_at`, else `None`.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
            .or_else(|| parse_timestamp(self.created_at.as_deref()))
    }

    /// Owning agent from `metadata.assistant_id`.
    pub fn assistant_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get("assistant_id")?
            .as_str()
            .filter(|id| !id.is_empty())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Body of `threads/search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl SearchParams {
    pub fn new(limit: usize) -> Self {
        Self {
            status: None,
            metadata: Map::new(),
            limit,
            offset: 0,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Restrict to threads owned by one assistant.
    pub fn assistant(mut self, assistant_id: &str) -> Self {
        self.metadata
            .insert("assistant_id".into(), Value::String(assistant_id.to_string()));
        self
    }

    /// The `metadata.assistant_id` filter, if set.
    pub fn assistant_id(&self) -> Option<&str> {
        self.metadata.get("assistant_id").and_then(Value::as_str)
    }
}

/// Body of `threads/count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

// ── Source trait ────────────────────────────────────────────────────────────

/// Where thread records come from.
#[async_trait]
pub trait ThreadSource: Send + Sync {
    /// One page of threads. A page shorter than `params.limit` is the last.
    async fn search(&self, params: &SearchParams) -> Result<Vec<ThreadRecord>>;

    /// Number of threads matching the filter.
    async fn count(&self, params: &CountParams) -> Result<u64>;
}

// ── HTTP implementation ─────────────────────────────────────────────────────

/// `ThreadSource` over a deployment's REST API.
#[derive(Debug, Clone)]
pub struct HttpThreadSource {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpThreadSource {
    /// Create a source for `base_url`. The token, if any, is sent as a
    /// bearer credential and otherwise not interpreted.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid deployment URL {base_url:?}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn for_deployment(
        deployment: &Deployment,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Self::new(&deployment.url, token, timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Assistants on this deployment, optionally limited to one graph.
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn search_assistants(
        &self,
        graph_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AgentRef>> {
        let mut body = Map::new();
        body.insert("limit".into(), Value::from(limit));
        if let Some(graph_id) = graph_id {
            body.insert("graph_id".into(), Value::String(graph_id.to_string()));
        }
        self.post("assistants/search", &body).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid endpoint {path}"))?;

        let mut request = self.client.post(url.clone()).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("{path} returned {status}: {}", text.trim());
        }

        debug!(%url, %status, "deployment request ok");
        response
            .json::<T>()
            .await
            .with_context(|| format!("unexpected response body from {path}"))
    }
}

#[async_trait]
impl ThreadSource for HttpThreadSource {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn search(&self, params: &SearchParams) -> Result<Vec<ThreadRecord>> {
        self.post("threads/search", params).await
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn count(&self, params: &CountParams) -> Result<u64> {
        self.post("threads/count", params).await
    }
}
