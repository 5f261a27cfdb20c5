//! The caller-facing facade, [`MemorySystem`].
//!
//! Wraps a [`MemoryClient`] with:
//! - `remember` / `recall` for plain key-value notes,
//! - typed wrappers that format content and pick a fixed container and a
//!   deterministic id (`store_preference`, `store_decision`, …),
//! - `smart_recall`, which routes a query by intent,
//! - a TTL cache in front of `recall`.
//!
//! Cache invalidation is deliberately narrow: a successful store drops only
//! the `container:<tag>` key. Cached `search:` keys stay valid until their
//! TTL runs out.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::cache::{TtlCache, cache_key};
use crate::client::{MemoryClient, StorageMode};
use crate::config::RecallConfig;
use crate::error::Result;
use crate::ids::{generate_id, prefix_chars};
use crate::intent::{QueryIntent, parse_query, route};
use crate::local::MemoryStats;
use crate::templates;
use crate::types::{
    Category, Confidence, Container, DecisionOptions, LearningOptions, MemoryEntry, MemoryMetadata,
    MemoryResult, PreferenceOptions, ProjectStatus, SearchOptions, SessionSummary, Source,
    StoreOptions, now_millis, timestamp_now,
};

/// Outcome of [`MemorySystem::smart_recall`].
#[derive(Debug, Clone, Serialize)]
pub struct SmartRecall {
    /// Hits.
    pub results: Vec<MemoryResult>,
    /// `<backend>:<scope>`, e.g. `local:blake` or `supermemory:learnings+decisions`.
    pub source: String,
    /// Detected intent.
    pub intent: QueryIntent,
}

/// Outcome of [`MemorySystem::init`]. Initialisation always ends ready;
/// the mode says which backend it ended up on.
#[derive(Debug, Clone, Serialize)]
pub struct InitStatus {
    /// Human-readable summary.
    pub message: String,
    /// Backend in use.
    pub mode: StorageMode,
    /// Containers available out of the box.
    pub containers: Vec<Container>,
}

/// Note memory facade.
#[derive(Debug)]
pub struct MemorySystem {
    client: MemoryClient,
    cache: TtlCache<Vec<MemoryResult>>,
    default_limit: usize,
}

impl MemorySystem {
    /// Build a memory system around `client` using `config`'s cache and
    /// search settings.
    #[must_use]
    pub fn new(client: MemoryClient, config: &RecallConfig) -> Self {
        Self {
            client,
            cache: TtlCache::from_config(&config.cache),
            default_limit: config.search.default_limit,
        }
    }

    /// Build with default configuration.
    #[must_use]
    pub fn with_defaults(client: MemoryClient) -> Self {
        Self::new(client, &RecallConfig::default())
    }

    /// Underlying storage client.
    #[must_use]
    pub fn client(&self) -> &MemoryClient {
        &self.client
    }

    /// Backend currently in use.
    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.client.mode()
    }

    // ------------------------------------------------------------------
    // Store / recall
    // ------------------------------------------------------------------

    /// Store `content` with `options`, returning the resolved id.
    ///
    /// Without a custom id, the id is generated from container, topics and
    /// the current time. Confidence defaults to `high`, source to
    /// `explicit`. Caller metadata is merged over the standard keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn store_memory(&self, content: impl Into<String>, options: StoreOptions) -> Result<String> {
        let content = content.into();
        let StoreOptions {
            container,
            custom_id,
            category,
            topics,
            confidence,
            source,
            metadata,
            prevent_duplicates,
        } = options;

        if prevent_duplicates {
            if let Some(existing) = self.client.find_local_duplicate(&container, &content) {
                debug!(id = %existing, container = %container, "Duplicate content, skipping store");
                return Ok(existing);
            }
        }

        let id = custom_id.unwrap_or_else(|| {
            let millis = now_millis().to_string();
            let mut parts: Vec<&str> = vec![container.as_str()];
            parts.extend(topics.iter().map(String::as_str));
            parts.push(&millis);
            generate_id(parts.as_slice())
        });

        let base = MemoryMetadata {
            category,
            topics,
            confidence: Some(confidence.unwrap_or(Confidence::High)),
            source: Some(source.unwrap_or(Source::Explicit)),
            source_date: Some(timestamp_now()),
            ..MemoryMetadata::default()
        };
        let metadata = merge_metadata(&base, metadata)?;

        let entry = MemoryEntry {
            content,
            custom_id: Some(id),
            container_tag: container.clone(),
            metadata: Some(metadata),
        };
        let id = self.client.add(entry).await?;
        self.cache.invalidate(&cache_key("container", &[container.as_str()]));
        Ok(id)
    }

    /// Store `value` under a key-derived id (`generate_id(key)`).
    ///
    /// The container defaults to `blake`; any field set in `options` wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn remember(&self, key: &str, value: impl Into<String>, options: StoreOptions) -> Result<String> {
        let mut options = options;
        if options.custom_id.is_none() {
            options.custom_id = Some(generate_id(&[key]));
        }
        options.confidence.get_or_insert(Confidence::High);
        options.source.get_or_insert(Source::Explicit);
        self.store_memory(value, options).await
    }

    /// Search, served from the cache when an identical query ran within the
    /// TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be serialized into a cache
    /// key.
    pub async fn recall(&self, query: &str, options: SearchOptions) -> Result<Vec<MemoryResult>> {
        let options_json = serde_json::to_string(&options)?;
        let key = cache_key("search", &[query, &options_json]);
        if let Some(hit) = self.cache.get(&key) {
            debug!(query, hits = hit.len(), "Recall served from cache");
            return Ok(hit);
        }

        let mut effective = options;
        effective.limit.get_or_insert(self.default_limit);
        let results = self.client.search(query, &effective).await?;
        self.cache.insert(key, results.clone());
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Typed wrappers
    // ------------------------------------------------------------------

    /// Store a preference in `blake` under `blake-preference-<topic>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn store_preference(&self, topic: &str, value: &str, options: PreferenceOptions) -> Result<String> {
        let mut metadata = Map::new();
        metadata.insert("preferenceTopic".into(), json!(topic));
        metadata.insert("preferenceValue".into(), json!(value));
        metadata.insert("sourceDetail".into(), json!(options.source));

        self.store_memory(
            templates::preference(topic, value),
            StoreOptions {
                container: Container::Blake,
                custom_id: Some(generate_id(&["blake", "preference", topic])),
                category: Some(Category::Preferences),
                topics: vec!["preferences".into(), topic.to_string()],
                confidence: Some(options.confidence.unwrap_or(Confidence::High)),
                source: Some(Source::Explicit),
                metadata,
                prevent_duplicates: false,
            },
        )
        .await
    }

    /// Best match for `topic` in `blake`.
    ///
    /// # Errors
    ///
    /// Propagates [`recall`](Self::recall) errors.
    pub async fn get_preference(&self, topic: &str) -> Result<Option<MemoryResult>> {
        let results = self
            .recall(
                &format!("Blake preference {topic}"),
                SearchOptions::in_container(Container::Blake).with_limit(3),
            )
            .await?;
        Ok(results.into_iter().next())
    }

    /// Store a project status card in `slidetheory` under
    /// `project-<name>-status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn store_project_status(&self, project: &str, status: &ProjectStatus) -> Result<String> {
        let mut metadata = Map::new();
        metadata.insert("projectName".into(), json!(project));
        metadata.insert("projectStatus".into(), json!(status.status));
        metadata.insert("projectUrl".into(), json!(status.url));
        metadata.insert("projectStack".into(), json!(status.stack));

        self.store_memory(
            templates::project_status(project, status, &timestamp_now()),
            StoreOptions {
                container: Container::SlideTheory,
                custom_id: Some(generate_id(&["project", project, "status"])),
                category: Some(Category::Status),
                topics: vec!["project".into(), project.to_string(), "status".into()],
                confidence: Some(Confidence::High),
                source: Some(Source::Explicit),
                metadata,
                prevent_duplicates: false,
            },
        )
        .await
    }

    /// Best status match for `project` in `slidetheory`.
    ///
    /// # Errors
    ///
    /// Propagates [`recall`](Self::recall) errors.
    pub async fn get_project_status(&self, project: &str) -> Result<Option<MemoryResult>> {
        let results = self
            .recall(
                &format!("{project} status"),
                SearchOptions::in_container(Container::SlideTheory).with_limit(3),
            )
            .await?;
        Ok(results.into_iter().next())
    }

    /// Store a decision in `decisions` under
    /// `decision-<first 30 chars of the decision>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn store_decision(&self, decision: &str, rationale: &str, options: DecisionOptions) -> Result<String> {
        let reversible = options.reversible.unwrap_or(true);
        let mut metadata = Map::new();
        metadata.insert("decision".into(), json!(decision));
        metadata.insert("rationale".into(), json!(rationale));
        if !options.alternatives.is_empty() {
            metadata.insert("alternatives".into(), json!(options.alternatives));
        }
        metadata.insert("reversible".into(), json!(reversible));

        self.store_memory(
            templates::decision(decision, rationale, &options, &timestamp_now()),
            StoreOptions {
                container: Container::Decisions,
                custom_id: Some(generate_id(&["decision", prefix_chars(decision, 30)])),
                category: Some(Category::Decision),
                topics: vec!["decision".into(), "rationale".into()],
                confidence: Some(options.confidence.unwrap_or(Confidence::High)),
                source: Some(Source::Explicit),
                metadata,
                prevent_duplicates: false,
            },
        )
        .await
    }

    /// Store a learning in `learnings` under
    /// `learning-<first 30 chars of the insight>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn store_learning(&self, insight: &str, context: &str, options: LearningOptions) -> Result<String> {
        let topic_category = options.category.clone().unwrap_or_else(|| "general".into());
        let mut metadata = Map::new();
        metadata.insert("insight".into(), json!(insight));
        metadata.insert("context".into(), json!(context));
        metadata.insert("learningCategory".into(), json!(options.category));
        metadata.insert("impact".into(), json!(options.impact));
        if !options.related_decisions.is_empty() {
            metadata.insert("relatedDecisions".into(), json!(options.related_decisions));
        }

        self.store_memory(
            templates::learning(insight, context, &options, &timestamp_now()),
            StoreOptions {
                container: Container::Learnings,
                custom_id: Some(generate_id(&["learning", prefix_chars(insight, 30)])),
                category: Some(Category::TechnicalInsight),
                topics: vec!["learning".into(), "insight".into(), topic_category],
                confidence: Some(Confidence::High),
                source: Some(Source::Explicit),
                metadata,
                prevent_duplicates: false,
            },
        )
        .await
    }

    /// Archive a session summary in `sessions` under `session-<date>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub async fn store_session_summary(&self, date: &str, summary: &SessionSummary) -> Result<String> {
        let mut metadata = Map::new();
        metadata.insert("sessionDate".into(), json!(date));
        metadata.insert("sessionFocus".into(), json!(summary.focus));
        metadata.insert("accomplishments".into(), json!(summary.accomplishments));
        metadata.insert("decisionCount".into(), json!(summary.decisions.len()));
        metadata.insert("learningCount".into(), json!(summary.learnings.len()));
        metadata.insert("duration".into(), json!(summary.duration));

        self.store_memory(
            templates::session_summary(date, summary),
            StoreOptions {
                container: Container::Sessions,
                custom_id: Some(generate_id(&["session", date])),
                category: Some(Category::SessionSummary),
                topics: vec!["session".into(), summary.focus.clone()],
                confidence: Some(Confidence::High),
                source: Some(Source::Session),
                metadata,
                prevent_duplicates: false,
            },
        )
        .await
    }

    // ------------------------------------------------------------------
    // Routing, lifecycle, housekeeping
    // ------------------------------------------------------------------

    /// Classify `query` and search the containers its intent maps to.
    ///
    /// # Errors
    ///
    /// Propagates [`recall`](Self::recall) errors.
    pub async fn smart_recall(&self, query: &str) -> Result<SmartRecall> {
        let parsed = parse_query(query);
        let route = route(parsed.intent);
        let results = self.recall(query, route.options).await?;
        // Read after the search: a failing remote flips the label to local.
        let source = format!("{}:{}", self.client.backend_label(), route.scope);
        debug!(query, intent = %parsed.intent, source = %source, hits = results.len(), "Smart recall");
        Ok(SmartRecall {
            results,
            source,
            intent: parsed.intent,
        })
    }

    /// Settle on a backend.
    ///
    /// Without a remote the client is latched to local mode. With one, a
    /// probe recall decides: a failing remote trips the latch.
    pub async fn init(&self) -> InitStatus {
        let containers = Container::DEFAULTS.to_vec();

        if !self.client.has_remote() {
            self.client.fall_back("no API key");
            return InitStatus {
                message: "Memory system ready (local fallback mode - no API key)".into(),
                mode: StorageMode::Local,
                containers,
            };
        }

        let message = match self.recall("test", SearchOptions::default().with_limit(1)).await {
            Ok(_) if self.client.mode() == StorageMode::Remote => {
                format!("Memory system ready ({} connected)", self.client.backend_display_name())
            }
            Ok(_) => "Memory system ready (local fallback mode - API unavailable)".to_string(),
            Err(e) => {
                self.client.fall_back("init probe failed");
                format!("Memory system ready (local fallback): {e}")
            }
        };
        let mode = self.client.mode();
        info!(mode = ?mode, "Memory system initialised");
        InitStatus {
            message,
            mode,
            containers,
        }
    }

    /// Counts over the local store.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        self.client.local_stats()
    }

    /// Remove every local entry. Cached recall results are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be written.
    pub fn clear_local(&self) -> Result<()> {
        self.client.clear_local()
    }
}

/// Merge `extra` over the serialized `base`. Null extras are skipped so an
/// unset optional never erases a standard key.
fn merge_metadata(base: &MemoryMetadata, extra: Map<String, Value>) -> Result<MemoryMetadata> {
    let mut value = serde_json::to_value(base)?;
    if let Value::Object(map) = &mut value {
        for (key, v) in extra {
            if !v.is_null() {
                map.insert(key, v);
            }
        }
    }
    Ok(MemoryMetadata::from_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStore;
    use crate::types::{Impact, ProjectPhase};

    fn system(dir: &tempfile::TempDir) -> MemorySystem {
        let client = MemoryClient::local_only(LocalStore::open(dir.path().join("m.json")));
        MemorySystem::with_defaults(client)
    }

    #[test]
    fn merge_overrides_and_skips_nulls() {
        let base = MemoryMetadata {
            confidence: Some(Confidence::High),
            ..MemoryMetadata::default()
        };
        let mut extra = Map::new();
        extra.insert("confidence".into(), json!("low"));
        extra.insert("source".into(), Value::Null);
        extra.insert("projectName".into(), json!("SlideTheory"));

        let merged = merge_metadata(&base, extra).unwrap();
        assert_eq!(merged.confidence, Some(Confidence::Low));
        assert!(merged.source.is_none());
        assert_eq!(merged.extra["projectName"], json!("SlideTheory"));
    }

    #[tokio::test]
    async fn store_memory_fills_standard_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        let options = StoreOptions {
            topics: vec!["Editor".into()],
            ..StoreOptions::new(Container::People)
        };
        let id = memory.store_memory("Ana maintains the editor", options).await.unwrap();
        assert!(id.starts_with("people-editor-"), "got {id}");

        let hits = memory.recall("editor", SearchOptions::default()).await.unwrap();
        let meta = &hits[0].metadata;
        assert_eq!(meta.confidence, Some(Confidence::High));
        assert_eq!(meta.source, Some(Source::Explicit));
        assert!(meta.source_date.is_some());
    }

    #[tokio::test]
    async fn odd_confidence_keeps_category_and_topics_searchable() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        let mut extra = Map::new();
        extra.insert("confidence".into(), json!(0.9));
        let options = StoreOptions {
            category: Some(Category::Preferences),
            topics: vec!["editor".into()],
            metadata: extra,
            ..StoreOptions::new(Container::Blake)
        };
        memory.store_memory("Prefers helix with soft wrap", options).await.unwrap();

        let by_category = SearchOptions {
            category: Some(Category::Preferences),
            ..SearchOptions::default()
        };
        let hits = memory.recall("helix", by_category).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.topics, vec!["editor"]);
        assert_eq!(hits[0].metadata.extra["confidence"], json!(0.9));

        let by_topic = memory.recall("editor", SearchOptions::default()).await.unwrap();
        assert_eq!(by_topic.len(), 1);
        assert_eq!(by_topic[0].metadata.category, Some(Category::Preferences));
    }

    #[tokio::test]
    async fn remember_uses_key_slug_and_blake() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        let id = memory
            .remember("AI model preference", "Kimi K2.5", StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(id, "ai-model-preference");
        assert_eq!(memory.stats().by_container["blake"], 1);
    }

    #[tokio::test]
    async fn prevent_duplicates_returns_existing_id() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        let first = memory
            .store_memory("Ships on Fridays", StoreOptions::new(Container::System))
            .await
            .unwrap();
        let options = StoreOptions {
            prevent_duplicates: true,
            custom_id: Some("other".into()),
            ..StoreOptions::new(Container::System)
        };
        let second = memory.store_memory("ships on   fridays", options).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(memory.stats().total, 1);
    }

    #[tokio::test]
    async fn wrapper_ids_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);

        let pref = memory
            .store_preference("Communication style", "Direct", PreferenceOptions::default())
            .await
            .unwrap();
        assert_eq!(pref, "blake-preference-communication-style");

        let status = ProjectStatus {
            status: ProjectPhase::Live,
            url: Some("https://slidetheory.io".into()),
            repository: None,
            stack: vec!["Next.js 14".into()],
            goals: vec![],
            blockers: vec![],
        };
        let project = memory.store_project_status("SlideTheory", &status).await.unwrap();
        assert_eq!(project, "project-slidetheory-status");

        let decision = memory
            .store_decision(
                "Reference decks are INTERNAL only, never user-facing",
                "Style inspiration only",
                DecisionOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(decision, "decision-reference-decks-are-internal-o");

        let learning = memory
            .store_learning(
                "AI image models hallucinate text",
                "slide rendering",
                LearningOptions {
                    impact: Some(Impact::High),
                    ..LearningOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(learning, "learning-ai-image-models-hallucinate-te");

        let stats = memory.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_container["decisions"], 1);
    }

    #[tokio::test]
    async fn learning_keeps_typed_category() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        memory
            .store_learning(
                "Cache embeddings per deck",
                "cost spike",
                LearningOptions {
                    category: Some("performance".into()),
                    ..LearningOptions::default()
                },
            )
            .await
            .unwrap();
        let options = SearchOptions {
            category: Some(Category::TechnicalInsight),
            ..SearchOptions::in_container(Container::Learnings)
        };
        let hits = memory.recall("embeddings", options).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.extra["learningCategory"], json!("performance"));
        assert!(hits[0].metadata.topics.contains(&"performance".to_string()));
    }

    #[tokio::test]
    async fn get_preference_finds_stored_value() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        memory
            .store_preference("editor", "helix", PreferenceOptions::default())
            .await
            .unwrap();
        let hit = memory.get_preference("editor").await.unwrap().unwrap();
        assert_eq!(hit.content, "Blake's preference for editor: helix");
        assert!(memory.get_project_status("Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn init_without_remote_is_local() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        let status = memory.init().await;
        assert_eq!(status.mode, StorageMode::Local);
        assert!(status.message.contains("no API key"));
        assert_eq!(status.containers.len(), 6);
    }

    #[tokio::test]
    async fn smart_recall_routes_by_intent() {
        let dir = tempfile::tempdir().unwrap();
        let memory = system(&dir);
        memory
            .store_decision("Disable AI images", "They garble text", DecisionOptions::default())
            .await
            .unwrap();
        memory
            .store_preference("images", "no AI images please", PreferenceOptions::default())
            .await
            .unwrap();

        let routed = memory.smart_recall("rationale behind images").await.unwrap();
        assert_eq!(routed.intent, QueryIntent::DecisionRationale);
        assert_eq!(routed.source, "local:decisions");
        assert_eq!(routed.results.len(), 1);
        assert_eq!(routed.results[0].container, Container::Decisions);
    }
}
