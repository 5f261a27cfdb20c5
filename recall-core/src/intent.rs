//! Query intent parser.
//!
//! A static rule table: each intent owns a keyword list and the first
//! intent with any keyword contained in the lower-cased query wins. The
//! order of [`INTENT_RULES`] is therefore significant ("why did Blake
//! choose…" is a preference question, not a decision question, because the
//! preference rule comes first).

use serde::{Deserialize, Serialize};

use crate::types::{Container, SearchOptions};

/// What a free-text query is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Likes, dislikes, favourites.
    UserPreference,
    /// Project progress and milestones.
    ProjectStatus,
    /// How-to, bugs, errors, fixes.
    TechnicalKnowledge,
    /// What happened lately.
    RecentActivity,
    /// Why a choice was made.
    DecisionRationale,
    /// Who someone is, how to reach them.
    ContactInfo,
    /// Anything else.
    GeneralKnowledge,
}

impl QueryIntent {
    /// Wire name (`user_preference`, …).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserPreference => "user_preference",
            Self::ProjectStatus => "project_status",
            Self::TechnicalKnowledge => "technical_knowledge",
            Self::RecentActivity => "recent_activity",
            Self::DecisionRationale => "decision_rationale",
            Self::ContactInfo => "contact_info",
            Self::GeneralKnowledge => "general_knowledge",
        }
    }
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window a query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporal {
    /// Today, yesterday, recently.
    Recent,
    /// Some time ago.
    Past,
    /// No time reference.
    All,
}

/// Result of [`parse_query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Detected intent.
    pub intent: QueryIntent,
    /// Lower-cased tokens longer than two characters.
    pub keywords: Vec<String>,
    /// Time window.
    pub temporal: Temporal,
    /// Project mentioned, if any.
    pub project: Option<String>,
    /// Person mentioned, if any.
    pub person: Option<String>,
}

/// Ordered intent rules; first match wins.
pub const INTENT_RULES: &[(QueryIntent, &[&str])] = &[
    (
        QueryIntent::UserPreference,
        &["prefer", "like", "dislike", "hate", "favorite", "blake"],
    ),
    (
        QueryIntent::ProjectStatus,
        &["status", "progress", "how is", "what happened to", "milestone"],
    ),
    (
        QueryIntent::TechnicalKnowledge,
        &["how to", "how do", "why does", "what causes", "bug", "error", "fix"],
    ),
    (
        QueryIntent::RecentActivity,
        &["today", "yesterday", "recent", "last", "this week", "did we"],
    ),
    (
        QueryIntent::DecisionRationale,
        &["why did", "decision", "choose", "instead of", "rationale"],
    ),
    (
        QueryIntent::ContactInfo,
        &["who is", "contact", "email", "phone", "reach"],
    ),
];

const RECENT_WORDS: &[&str] = &["today", "yesterday", "recent"];
const PAST_WORDS: &[&str] = &["ago", "before", "previous"];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Classify a free-text query.
#[must_use]
pub fn parse_query(query: &str) -> ParsedQuery {
    let lower = query.to_lowercase();

    let intent = INTENT_RULES
        .iter()
        .find(|(_, words)| contains_any(&lower, words))
        .map_or(QueryIntent::GeneralKnowledge, |(intent, _)| *intent);

    let temporal = if contains_any(&lower, RECENT_WORDS) {
        Temporal::Recent
    } else if contains_any(&lower, PAST_WORDS) {
        Temporal::Past
    } else {
        Temporal::All
    };

    let project = lower.contains("slidetheory").then(|| "slidetheory".to_string());
    let person = lower.contains("blake").then(|| "blake".to_string());

    let keywords = lower
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect();

    ParsedQuery {
        intent,
        keywords,
        temporal,
        project,
        person,
    }
}

/// Where [`crate::MemorySystem::smart_recall`] looks for an intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Search options (containers and limit).
    pub options: SearchOptions,
    /// Label of the searched scope, used in the result's source tag.
    pub scope: &'static str,
}

/// Search routing for `intent`.
#[must_use]
pub fn route(intent: QueryIntent) -> Route {
    match intent {
        QueryIntent::UserPreference => Route {
            options: SearchOptions::in_container(Container::Blake).with_limit(3),
            scope: "blake",
        },
        QueryIntent::ProjectStatus => Route {
            options: SearchOptions::in_container(Container::SlideTheory).with_limit(5),
            scope: "slidetheory",
        },
        QueryIntent::TechnicalKnowledge => Route {
            options: SearchOptions::in_containers([Container::Learnings, Container::Decisions])
                .with_limit(5),
            scope: "learnings+decisions",
        },
        QueryIntent::DecisionRationale => Route {
            options: SearchOptions::in_container(Container::Decisions).with_limit(3),
            scope: "decisions",
        },
        QueryIntent::RecentActivity | QueryIntent::ContactInfo | QueryIntent::GeneralKnowledge => Route {
            options: SearchOptions::default().with_limit(5),
            scope: "all",
        },
    }
}
