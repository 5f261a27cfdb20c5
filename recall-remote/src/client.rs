//! Supermemory client: a `reqwest` implementation of [`RemoteMemory`].
//!
//! Two endpoints, both `POST` with an `x-api-key` header:
//!
//! - `/add` takes `{content, customId, containerTag, metadata}` and answers
//!   with the stored document's `id`.
//! - `/search` takes `{q, containerTag, containerTags, limit}` and answers
//!   with `results[]`.

use std::time::Duration;

use async_trait::async_trait;
use recall_core::config::RemoteConfig;
use recall_core::types::{Container, MemoryEntry, MemoryMetadata, MemoryResult, SearchOptions, timestamp_now};
use recall_core::{RecallError, RemoteMemory};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RemoteError;

/// Container reported when a search hit carries no container tag.
const UNKNOWN_CONTAINER: &str = "unknown";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddRequest<'a> {
    content: &'a str,
    custom_id: Option<&'a str>,
    container_tag: &'a str,
    metadata: Option<&'a MemoryMetadata>,
}

#[derive(Debug, Deserialize, Default)]
struct AddResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    container_tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    container_tags: Vec<&'a str>,
    limit: usize,
}

/// Body of a `/search` response.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    /// Hits, best first.
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// One raw `/search` hit. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Document id.
    #[serde(default)]
    pub id: String,
    /// Memory text, when the hit is a memory.
    #[serde(default)]
    pub memory: Option<String>,
    /// Chunk text, when the hit is a document chunk.
    #[serde(default)]
    pub chunk: Option<String>,
    /// Source documents; the first one carries the container tag.
    #[serde(default)]
    pub documents: Vec<HitDocument>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Value,
    /// Similarity score.
    #[serde(default)]
    pub similarity: Option<f64>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Source document attached to a [`SearchHit`].
#[derive(Debug, Default, Deserialize)]
pub struct HitDocument {
    /// Document metadata.
    #[serde(default)]
    pub metadata: Value,
}

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

/// Resolve the id of an `/add` call: the server's id, else the requested
/// custom id, else empty.
#[must_use]
pub fn resolve_add_id(body: &str, custom_id: Option<&str>) -> String {
    let parsed: AddResponse = serde_json::from_str(body).unwrap_or_default();
    parsed
        .id
        .filter(|id| !id.is_empty())
        .or_else(|| custom_id.map(str::to_string))
        .unwrap_or_default()
}

/// Map a `/search` response onto [`MemoryResult`]s.
#[must_use]
pub fn map_search_results(response: SearchResponse) -> Vec<MemoryResult> {
    response.results.into_iter().map(map_hit).collect()
}

fn map_hit(hit: SearchHit) -> MemoryResult {
    let container = hit
        .documents
        .first()
        .and_then(|doc| doc.metadata.get("containerTag"))
        .and_then(Value::as_str)
        .filter(|tag| !tag.is_empty())
        .unwrap_or(UNKNOWN_CONTAINER);

    let content = hit
        .memory
        .filter(|m| !m.is_empty())
        .or(hit.chunk)
        .unwrap_or_default();

    let metadata = if hit.metadata.is_object() {
        MemoryMetadata::from_value(hit.metadata)
    } else {
        MemoryMetadata::default()
    };

    MemoryResult {
        id: hit.id,
        content,
        container: Container::from(container),
        metadata,
        score: hit.similarity.unwrap_or(0.0),
        created_at: hit.updated_at.unwrap_or_else(timestamp_now),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Supermemory API.
pub struct SupermemoryClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for SupermemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupermemoryClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SupermemoryClient {
    /// Create a client for `base_url` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::ConfigError`] if the key is blank or the HTTP
    /// client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RemoteError::ConfigError("API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::ConfigError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    /// Build from configuration. `None` when no API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::ConfigError`] if the HTTP client cannot be
    /// built.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, RemoteError> {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                Self::new(config.base_url.clone(), key, config.timeout()).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Base URL requests go to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String, RemoteError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
                } else {
                    RemoteError::from(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(RemoteError::from)?;
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Remote memory API returned error");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    /// Store `entry`, returning the id the server assigned.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] on transport failure or non-2xx status.
    pub async fn add_entry(&self, entry: &MemoryEntry) -> Result<String, RemoteError> {
        let request = AddRequest {
            content: &entry.content,
            custom_id: entry.custom_id.as_deref(),
            container_tag: entry.container_tag.as_str(),
            metadata: entry.metadata.as_ref(),
        };
        let body = self.post("/add", &request).await?;
        let id = resolve_add_id(&body, entry.custom_id.as_deref());
        debug!(id = %id, container = %entry.container_tag, "Stored memory remotely");
        Ok(id)
    }

    /// Search the API.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] on transport failure, non-2xx status or an
    /// unparseable body.
    pub async fn search_entries(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<MemoryResult>, RemoteError> {
        let request = SearchRequest {
            q: query,
            container_tag: options.container.as_ref().map(Container::as_str),
            container_tags: options.containers.iter().map(Container::as_str).collect(),
            limit: options.effective_limit(),
        };
        let body = self.post("/search", &request).await?;
        let response: SearchResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::ParseError(e.to_string()))?;
        let results = map_search_results(response);
        debug!(query, hits = results.len(), "Remote search complete");
        Ok(results)
    }
}

#[async_trait]
impl RemoteMemory for SupermemoryClient {
    async fn add(&self, entry: &MemoryEntry) -> Result<String, RecallError> {
        Ok(self.add_entry(entry).await?)
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<MemoryResult>, RecallError> {
        Ok(self.search_entries(query, options).await?)
    }

    fn name(&self) -> &str {
        "supermemory"
    }

    fn display_name(&self) -> &str {
        "Supermemory.ai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Vec<MemoryResult> {
        map_search_results(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn add_id_prefers_server_id() {
        assert_eq!(resolve_add_id(r#"{"id":"doc_123"}"#, Some("mine")), "doc_123");
        assert_eq!(resolve_add_id(r#"{"status":"queued"}"#, Some("mine")), "mine");
        assert_eq!(resolve_add_id("not json", Some("mine")), "mine");
        assert_eq!(resolve_add_id(r#"{"id":""}"#, None), "");
    }

    #[test]
    fn search_hit_mapping() {
        let results = parse(json!({
            "results": [{
                "id": "m1",
                "memory": "Prefers Kimi K2.5",
                "documents": [{ "metadata": { "containerTag": "blake" } }],
                "metadata": { "category": "preferences", "topics": ["ai"] },
                "similarity": 0.87,
                "updatedAt": "2026-10-01T12:00:00.000Z"
            }]
        }));
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "m1");
        assert_eq!(hit.content, "Prefers Kimi K2.5");
        assert_eq!(hit.container, Container::Blake);
        assert!((hit.score - 0.87).abs() < f64::EPSILON);
        assert_eq!(hit.created_at, "2026-10-01T12:00:00.000Z");
        assert_eq!(hit.metadata.topics, vec!["ai".to_string()]);
    }

    #[test]
    fn search_hit_defaults() {
        let results = parse(json!({
            "results": [{ "id": "c1", "chunk": "a document chunk" }, { "id": "e1" }]
        }));
        assert_eq!(results[0].content, "a document chunk");
        assert_eq!(results[0].container.as_str(), "unknown");
        assert!(results[0].score.abs() < f64::EPSILON);
        assert!(!results[0].created_at.is_empty());
        assert_eq!(results[1].content, "");
    }

    #[test]
    fn missing_results_is_empty() {
        assert!(parse(json!({})).is_empty());
    }

    #[test]
    fn search_request_shape() {
        let options = SearchOptions::in_containers([Container::Learnings, Container::Decisions]).with_limit(5);
        let request = SearchRequest {
            q: "pgvector",
            container_tag: options.container.as_ref().map(Container::as_str),
            container_tags: options.containers.iter().map(Container::as_str).collect(),
            limit: options.effective_limit(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "q": "pgvector", "containerTags": ["learnings", "decisions"], "limit": 5 })
        );
    }

    #[test]
    fn add_request_shape() {
        let entry = MemoryEntry {
            content: "Kimi K2.5".into(),
            custom_id: Some("ai-model-preference".into()),
            container_tag: Container::Blake,
            metadata: None,
        };
        let request = AddRequest {
            content: &entry.content,
            custom_id: entry.custom_id.as_deref(),
            container_tag: entry.container_tag.as_str(),
            metadata: entry.metadata.as_ref(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "content": "Kimi K2.5",
                "customId": "ai-model-preference",
                "containerTag": "blake",
                "metadata": null
            })
        );
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = SupermemoryClient::new("https://example.invalid", "  ", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RemoteError::ConfigError(_)));
    }

    #[test]
    fn from_config_without_key_is_none() {
        let config = RemoteConfig::default();
        assert!(SupermemoryClient::from_config(&config).unwrap().is_none());

        let config = RemoteConfig {
            api_key: Some("sk-test".into()),
            base_url: "https://api.example.test/".into(),
            ..RemoteConfig::default()
        };
        let client = SupermemoryClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.base_url(), "https://api.example.test");
        assert_eq!(client.name(), "supermemory");
        assert_eq!(client.display_name(), "Supermemory.ai");
    }
}
