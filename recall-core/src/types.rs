//! Core type definitions for the recall memory store.
//!
//! Wire names are camelCase so the local JSON file and the remote API share
//! one shape.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::RecallError;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Current wall-clock time as an RFC 3339 string with millisecond precision
/// (`2026-10-16T09:30:00.000Z`).
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch, used as the uniqueness suffix of
/// generated ids.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Namespace an entry is stored under.
///
/// The well-known tags get their own variants; anything else (for example the
/// `unknown` tag the remote API reports for orphaned chunks) is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Container {
    /// User profile and preferences.
    #[default]
    Blake,
    /// Project-specific knowledge.
    SlideTheory,
    /// Key decisions with rationale.
    Decisions,
    /// Lessons and insights.
    Learnings,
    /// Session summaries.
    Sessions,
    /// Relationships and contacts.
    People,
    /// System configuration.
    System,
    /// Any other tag.
    Other(String),
}

impl Container {
    /// Containers reported by `init` as available out of the box.
    pub const DEFAULTS: [Container; 6] = [
        Container::Blake,
        Container::SlideTheory,
        Container::Decisions,
        Container::Learnings,
        Container::Sessions,
        Container::People,
    ];

    /// The tag as stored on disk and sent to the remote API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blake => "blake",
            Self::SlideTheory => "slidetheory",
            Self::Decisions => "decisions",
            Self::Learnings => "learnings",
            Self::Sessions => "sessions",
            Self::People => "people",
            Self::System => "system",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for Container {
    fn from(tag: &str) -> Self {
        match tag {
            "blake" => Self::Blake,
            "slidetheory" => Self::SlideTheory,
            "decisions" => Self::Decisions,
            "learnings" => Self::Learnings,
            "sessions" => Self::Sessions,
            "people" => Self::People,
            "system" => Self::System,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Container {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<Container> for String {
    fn from(container: Container) -> Self {
        match container {
            Container::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Container {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Closed string enums
// ---------------------------------------------------------------------------

/// Declares a fieldless enum that serializes as a fixed set of strings, with
/// `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Wire representation.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RecallError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(RecallError::InvalidInput(format!(
                        "unknown {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Category used for filtering within a container.
    Category {
        /// User preferences.
        Preferences => "preferences",
        /// Project status snapshot.
        Status => "status",
        /// Technical lesson learned.
        TechnicalInsight => "technical-insight",
        /// A decision record.
        Decision => "decision",
        /// A milestone reached.
        Milestone => "milestone",
        /// Contact details.
        Contact => "contact",
        /// Archived session summary.
        SessionSummary => "session-summary",
        /// A fixed bug.
        BugFix => "bug-fix",
        /// A shipped feature.
        Feature => "feature",
        /// Architecture note.
        Architecture => "architecture",
        /// Communication note.
        Communication => "communication",
    }
}

string_enum! {
    /// How sure we are that a memory is accurate.
    Confidence {
        /// Weak signal.
        Low => "low",
        /// Reasonable belief.
        Medium => "medium",
        /// Strong belief.
        High => "high",
        /// Stated outright.
        Certain => "certain",
    }
}

string_enum! {
    /// Where a memory came from.
    Source {
        /// The user explicitly stated it.
        Explicit => "explicit",
        /// Inferred from behaviour.
        Inferred => "inferred",
        /// From daily session notes.
        Session => "session",
        /// From code commits.
        Commit => "commit",
        /// From documents or files.
        Document => "document",
    }
}

string_enum! {
    /// Search mode hint forwarded to the remote API.
    SearchMode {
        /// Embedding similarity.
        Semantic => "semantic",
        /// Keyword match.
        Keyword => "keyword",
        /// Both.
        Hybrid => "hybrid",
    }
}

string_enum! {
    /// Lifecycle phase of a tracked project.
    ProjectPhase {
        /// Not started.
        Planning => "planning",
        /// Being built.
        InProgress => "in-progress",
        /// Minimum viable product shipped.
        Mvp => "mvp",
        /// In production.
        Live => "live",
        /// Maintenance only.
        Maintenance => "maintenance",
        /// Being shut down.
        Sunset => "sunset",
    }
}

string_enum! {
    /// Impact rating of a learning.
    Impact {
        /// Minor.
        Low => "low",
        /// Noticeable.
        Medium => "medium",
        /// Significant.
        High => "high",
        /// Must not be forgotten.
        Critical => "critical",
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Metadata attached to each memory.
///
/// Known keys are typed; everything else is kept in [`extra`](Self::extra)
/// and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetadata {
    /// Category within the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Free-form topic labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    /// Accuracy rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// When the memory was recorded (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_date: Option<String>,
    /// For time-sensitive memories (RFC 3339). Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    /// Ids of related memories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_ids: Vec<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Any other keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryMetadata {
    /// Build metadata from an arbitrary JSON value.
    ///
    /// Each known key is decoded on its own. A key whose value does not fit
    /// its typed field (a numeric `confidence`, a category outside the closed
    /// set) stays in `extra` unchanged while the other typed fields are still
    /// filled. Non-object values yield empty metadata.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut extra) = value else {
            return Self::default();
        };
        Self {
            category: take_typed(&mut extra, "category"),
            topics: take_typed(&mut extra, "topics").unwrap_or_default(),
            confidence: take_typed(&mut extra, "confidence"),
            source: take_typed(&mut extra, "source"),
            source_date: take_typed(&mut extra, "sourceDate"),
            expiration_date: take_typed(&mut extra, "expirationDate"),
            related_ids: take_typed(&mut extra, "relatedIds").unwrap_or_default(),
            tags: take_typed(&mut extra, "tags").unwrap_or_default(),
            extra,
        }
    }

    /// Insert an extra key, skipping nulls.
    pub fn insert_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if !value.is_null() {
            self.extra.insert(key.into(), value);
        }
    }
}

/// Remove `key` from `map` if it decodes as `T`; leave it in place otherwise.
/// Nulls are removed and read as absent.
fn take_typed<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key)?;
    if value.is_null() {
        map.remove(key);
        return None;
    }
    let parsed = T::deserialize(value).ok()?;
    map.remove(key);
    Some(parsed)
}

/// `deserialize_with` helper that never fails on odd metadata.
fn lenient_metadata<'de, D>(deserializer: D) -> Result<MemoryMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(MemoryMetadata::from_value(value))
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A memory submitted for storage (matches the remote `/add` body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// The text to remember.
    pub content: String,
    /// Deterministic id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Namespace.
    pub container_tag: Container,
    /// Attached metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MemoryMetadata>,
}

/// A memory as stored in the local JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMemory {
    /// Unique, deterministic id.
    pub id: String,
    /// The remembered text.
    pub content: String,
    /// Namespace.
    pub container: Container,
    /// Attached metadata.
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: MemoryMetadata,
    /// First written (RFC 3339).
    pub created_at: String,
    /// Last written (RFC 3339).
    pub updated_at: String,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResult {
    /// Entry id.
    pub id: String,
    /// Entry text.
    pub content: String,
    /// Namespace.
    pub container: Container,
    /// Attached metadata.
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: MemoryMetadata,
    /// Relevance score (0.0 to 1.0 for local search).
    pub score: f64,
    /// When the entry was written (RFC 3339).
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Default number of results per search.
pub const DEFAULT_LIMIT: usize = 5;

/// Search options. Serialized form doubles as part of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Only this container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    /// Only these containers (ignored when empty).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    /// Only this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Maximum hits; [`DEFAULT_LIMIT`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Remote search mode hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<SearchMode>,
    /// Minimum score (0 to 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Remote recency boost hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recency_boost: Option<bool>,
}

impl SearchOptions {
    /// Search a single container.
    #[must_use]
    pub fn in_container(container: Container) -> Self {
        Self {
            container: Some(container),
            ..Self::default()
        }
    }

    /// Search several containers.
    #[must_use]
    pub fn in_containers(containers: impl IntoIterator<Item = Container>) -> Self {
        Self {
            containers: containers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Set the result limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective limit.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Options for storing a memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOptions {
    /// Target container.
    pub container: Container,
    /// Explicit id; otherwise generated from container, topics and time.
    pub custom_id: Option<String>,
    /// Category.
    pub category: Option<Category>,
    /// Topic labels (also part of the generated id).
    pub topics: Vec<String>,
    /// Defaults to [`Confidence::High`].
    pub confidence: Option<Confidence>,
    /// Defaults to [`Source::Explicit`].
    pub source: Option<Source>,
    /// Extra metadata merged over the standard keys.
    pub metadata: Map<String, Value>,
    /// Skip the write when the container already holds identical content.
    pub prevent_duplicates: bool,
}

impl StoreOptions {
    /// Options targeting `container` with everything else defaulted.
    #[must_use]
    pub fn new(container: Container) -> Self {
        Self {
            container,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Records for the convenience wrappers
// ---------------------------------------------------------------------------

/// Status snapshot of a tracked project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    /// Phase.
    pub status: ProjectPhase,
    /// Public URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Repository location.
    #[serde(default)]
    pub repository: Option<String>,
    /// Technology stack.
    #[serde(default)]
    pub stack: Vec<String>,
    /// Goals.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Current blockers.
    #[serde(default)]
    pub blockers: Vec<String>,
}

/// Extra fields for [`crate::MemorySystem::store_decision`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionOptions {
    /// Alternatives that were considered.
    pub alternatives: Vec<String>,
    /// Surrounding context.
    pub context: Option<String>,
    /// Defaults to `true`.
    pub reversible: Option<bool>,
    /// Defaults to [`Confidence::High`].
    pub confidence: Option<Confidence>,
}

/// Extra fields for [`crate::MemorySystem::store_learning`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningOptions {
    /// Free-form category; `general` when absent.
    pub category: Option<String>,
    /// Impact; `medium` when absent.
    pub impact: Option<Impact>,
    /// Related decision ids.
    pub related_decisions: Vec<String>,
}

/// Extra fields for [`crate::MemorySystem::store_preference`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceOptions {
    /// Defaults to [`Confidence::High`].
    pub confidence: Option<Confidence>,
    /// Where the preference was observed.
    pub source: Option<String>,
}

/// A decision with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    /// What was decided.
    pub decision: String,
    /// Why.
    pub rationale: String,
    /// Alternatives that were considered.
    #[serde(default)]
    pub alternatives_considered: Vec<String>,
    /// Date (ISO).
    pub date: String,
    /// Surrounding context.
    #[serde(default)]
    pub context: Option<String>,
    /// Can it be undone.
    pub reversible: bool,
    /// Confidence.
    pub confidence: Confidence,
}

/// A lesson learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
    /// The insight.
    pub insight: String,
    /// Where it came from.
    pub context: String,
    /// Date (ISO).
    pub date: String,
    /// Free-form category.
    pub category: String,
    /// Impact.
    pub impact: Impact,
    /// Related decision ids.
    #[serde(default)]
    pub related_decisions: Vec<String>,
}

/// Summary of a work session, archived to the `sessions` container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session date (ISO).
    pub date: String,
    /// Main focus.
    pub focus: String,
    /// What got done.
    #[serde(default)]
    pub accomplishments: Vec<String>,
    /// Decisions taken.
    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
    /// Lessons learned.
    #[serde(default)]
    pub learnings: Vec<LearningRecord>,
    /// Unfinished threads.
    #[serde(default)]
    pub open_threads: Vec<String>,
    /// Commit hashes or titles.
    #[serde(default)]
    pub commits: Vec<String>,
    /// Duration in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn container_round_trips_known_and_unknown_tags() {
        let known: Container = serde_json::from_value(json!("slidetheory")).unwrap();
        assert_eq!(known, Container::SlideTheory);
        assert_eq!(serde_json::to_value(&known).unwrap(), json!("slidetheory"));

        let other: Container = serde_json::from_value(json!("unknown")).unwrap();
        assert_eq!(other, Container::Other("unknown".into()));
        assert_eq!(other.to_string(), "unknown");
    }

    #[test]
    fn category_uses_kebab_case() {
        assert_eq!(
            serde_json::to_value(Category::TechnicalInsight).unwrap(),
            json!("technical-insight")
        );
        assert_eq!("session-summary".parse::<Category>().unwrap(), Category::SessionSummary);
        assert!("nonsense".parse::<Category>().is_err());
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let meta = MemoryMetadata::from_value(json!({
            "category": "preferences",
            "topics": ["preferences", "editor"],
            "preferenceValue": "helix",
        }));
        assert_eq!(meta.category, Some(Category::Preferences));
        assert_eq!(meta.topics, vec!["preferences", "editor"]);
        assert_eq!(meta.extra.get("preferenceValue"), Some(&json!("helix")));

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["preferenceValue"], json!("helix"));
        assert!(back.get("confidence").is_none());
    }

    #[test]
    fn metadata_with_foreign_shapes_is_not_rejected() {
        let meta = MemoryMetadata::from_value(json!({
            "category": "work_preferences",
            "confidence": 100,
        }));
        assert!(meta.category.is_none());
        assert_eq!(meta.extra.get("confidence"), Some(&json!(100)));
        assert_eq!(meta.extra.get("category"), Some(&json!("work_preferences")));
    }

    #[test]
    fn one_odd_key_leaves_the_others_typed() {
        let meta = MemoryMetadata::from_value(json!({
            "category": "preferences",
            "topics": ["editor"],
            "confidence": 0.9,
            "source": "explicit",
            "tags": null,
        }));
        assert_eq!(meta.category, Some(Category::Preferences));
        assert_eq!(meta.topics, vec!["editor"]);
        assert_eq!(meta.source, Some(Source::Explicit));
        assert!(meta.confidence.is_none());
        assert_eq!(meta.extra.get("confidence"), Some(&json!(0.9)));
        assert!(!meta.extra.contains_key("category"));
        assert!(!meta.extra.contains_key("tags"));

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["confidence"], json!(0.9));
        assert_eq!(back["category"], json!("preferences"));
    }

    #[test]
    fn local_memory_reads_camel_case() {
        let raw = json!({
            "id": "blake-preference-editor",
            "content": "Blake's preference for editor: helix",
            "container": "blake",
            "metadata": { "confidence": "certain" },
            "createdAt": "2026-01-01T00:00:00.000Z",
            "updatedAt": "2026-01-01T00:00:00.000Z",
        });
        let memory: LocalMemory = serde_json::from_value(raw).unwrap();
        assert_eq!(memory.container, Container::Blake);
        assert_eq!(memory.metadata.confidence, Some(Confidence::Certain));
    }

    #[test]
    fn search_options_skip_empty_fields() {
        let options = SearchOptions::in_container(Container::Blake).with_limit(3);
        let text = serde_json::to_string(&options).unwrap();
        assert_eq!(text, r#"{"container":"blake","limit":3}"#);
        assert_eq!(SearchOptions::default().effective_limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn timestamps_are_millisecond_utc() {
        let ts = timestamp_now();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-10-16T09:30:00.000Z".len());
    }
}
