//! `recall backfill`: seed a fresh store with baseline context.
//!
//! The seed lives in `seed/backfill.toml` and is compiled into the binary.
//! Every item is stored through the same `MemorySystem` wrappers a caller
//! would use, so ids are deterministic and a second run replaces rather than
//! duplicates.

use recall_core::{
    Category, Confidence, Container, DecisionOptions, Impact, LearningOptions, MemorySystem,
    PreferenceOptions, ProjectStatus, SessionSummary, StoreOptions,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SEED: &str = include_str!("../seed/backfill.toml");

#[derive(Debug, Deserialize)]
struct Seed {
    preferences: Vec<PreferenceSeed>,
    project: ProjectSeed,
    facts: Vec<FactSeed>,
    decisions: Vec<DecisionSeed>,
    learnings: Vec<LearningSeed>,
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize)]
struct PreferenceSeed {
    topic: String,
    value: String,
    confidence: Confidence,
    source: String,
}

#[derive(Debug, Deserialize)]
struct ProjectSeed {
    name: String,
    status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
struct FactSeed {
    key: String,
    value: String,
    container: Container,
    category: Category,
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DecisionSeed {
    decision: String,
    rationale: String,
    alternatives: Vec<String>,
    reversible: bool,
}

#[derive(Debug, Deserialize)]
struct LearningSeed {
    insight: String,
    context: String,
    category: String,
    impact: Impact,
}

/// One item that could not be stored.
#[derive(Debug, Serialize)]
pub struct Failure {
    /// Which seed item.
    pub item: String,
    /// Why.
    pub error: String,
}

/// What a backfill run did.
#[derive(Debug, Default, Serialize)]
pub struct BackfillReport {
    /// Ids written.
    pub stored: Vec<String>,
    /// Items that failed; the run carries on past them.
    pub failed: Vec<Failure>,
}

impl BackfillReport {
    fn record(&mut self, item: &str, outcome: recall_core::error::Result<String>) {
        match outcome {
            Ok(id) => {
                info!(item, id = %id, "Backfilled");
                self.stored.push(id);
            }
            Err(e) => {
                warn!(item, error = %e, "Backfill item failed");
                self.failed.push(Failure {
                    item: item.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

fn seed() -> anyhow::Result<Seed> {
    Ok(toml::from_str(SEED)?)
}

/// Store the whole seed set.
///
/// # Errors
///
/// Only if the embedded seed cannot be parsed; individual store failures
/// are collected in the report.
pub async fn run(memory: &MemorySystem) -> anyhow::Result<BackfillReport> {
    let seed = seed()?;
    let mut report = BackfillReport::default();

    for pref in &seed.preferences {
        let options = PreferenceOptions {
            confidence: Some(pref.confidence),
            source: Some(pref.source.clone()),
        };
        let outcome = memory.store_preference(&pref.topic, &pref.value, options).await;
        report.record(&pref.topic, outcome);
    }

    let outcome = memory
        .store_project_status(&seed.project.name, &seed.project.status)
        .await;
    report.record(&seed.project.name, outcome);

    for fact in &seed.facts {
        let options = StoreOptions {
            category: Some(fact.category),
            topics: fact.topics.clone(),
            ..StoreOptions::new(fact.container.clone())
        };
        let outcome = memory.remember(&fact.key, fact.value.as_str(), options).await;
        report.record(&fact.key, outcome);
    }

    for dec in &seed.decisions {
        let options = DecisionOptions {
            alternatives: dec.alternatives.clone(),
            reversible: Some(dec.reversible),
            confidence: Some(Confidence::High),
            ..DecisionOptions::default()
        };
        let outcome = memory.store_decision(&dec.decision, &dec.rationale, options).await;
        report.record(&dec.decision, outcome);
    }

    for learning in &seed.learnings {
        let options = LearningOptions {
            category: Some(learning.category.clone()),
            impact: Some(learning.impact),
            ..LearningOptions::default()
        };
        let outcome = memory
            .store_learning(&learning.insight, &learning.context, options)
            .await;
        report.record(&learning.insight, outcome);
    }

    for session in &seed.sessions {
        let outcome = memory.store_session_summary(&session.date, session).await;
        report.record(&session.date, outcome);
    }

    info!(
        stored = report.stored.len(),
        failed = report.failed.len(),
        "Backfill complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::{LocalStore, MemoryClient, SearchOptions};

    #[test]
    fn seed_parses() {
        let seed = seed().unwrap();
        assert_eq!(seed.preferences.len(), 7);
        assert_eq!(seed.decisions.len(), 8);
        assert_eq!(seed.learnings.len(), 7);
        assert_eq!(seed.sessions.len(), 3);
        assert_eq!(seed.sessions[2].duration, Some(540));
        assert_eq!(seed.sessions[1].decisions.len(), 2);
        assert_eq!(seed.project.status.stack.len(), 7);
    }

    #[tokio::test]
    async fn backfill_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("seed.json"));
        let memory = MemorySystem::with_defaults(MemoryClient::local_only(store));

        let first = run(&memory).await.unwrap();
        assert!(first.failed.is_empty());
        let total = memory.stats().total;
        assert_eq!(total, first.stored.len());

        let second = run(&memory).await.unwrap();
        assert_eq!(second.stored, first.stored);
        assert_eq!(memory.stats().total, total);

        let hits = memory
            .recall("Kimi", SearchOptions::in_container(Container::Blake))
            .await
            .unwrap();
        assert_eq!(hits[0].id, "blake-preference-ai-model-preference");
    }
}
