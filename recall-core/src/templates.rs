//! Content templates for the typed `store_*` wrappers.
//!
//! Each renderer takes the timestamp to embed so output is deterministic
//! under test.

use std::fmt::Write as _;

use crate::types::{DecisionOptions, LearningOptions, ProjectStatus, SessionSummary};

/// `Blake's preference for {topic}: {value}`
#[must_use]
pub fn preference(topic: &str, value: &str) -> String {
    format!("Blake's preference for {topic}: {value}")
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

/// Project status card.
#[must_use]
pub fn project_status(project: &str, status: &ProjectStatus, now: &str) -> String {
    format!(
        "Project: {project}\n\
         Status: {}\n\
         URL: {}\n\
         Stack: {}\n\
         Goals: {}\n\
         Blockers: {}\n\
         Last Updated: {now}",
        status.status,
        status.url.as_deref().unwrap_or("N/A"),
        status.stack.join(", "),
        join_or(&status.goals, "None defined"),
        join_or(&status.blockers, "None"),
    )
}

/// Decision record. Alternatives and context lines only appear when set.
#[must_use]
pub fn decision(decision: &str, rationale: &str, options: &DecisionOptions, now: &str) -> String {
    let mut lines = vec![format!("Decision: {decision}"), format!("Rationale: {rationale}")];
    if !options.alternatives.is_empty() {
        lines.push(format!("Alternatives Considered: {}", options.alternatives.join(", ")));
    }
    if let Some(context) = options.context.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("Context: {context}"));
    }
    let reversible = if options.reversible.unwrap_or(true) { "Yes" } else { "No" };
    lines.push(format!("Reversible: {reversible}"));
    lines.push(format!("Date: {now}"));
    lines.join("\n")
}

/// Learning record.
#[must_use]
pub fn learning(insight: &str, context: &str, options: &LearningOptions, now: &str) -> String {
    format!(
        "Insight: {insight}\n\
         Context: {context}\n\
         Category: {}\n\
         Impact: {}\n\
         Date: {now}",
        options.category.as_deref().unwrap_or("general"),
        options.impact.map_or("medium", |i| i.as_str()),
    )
}

fn bullets(out: &mut String, items: impl IntoIterator<Item = String>) {
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

/// Session summary for the `sessions` container.
#[must_use]
pub fn session_summary(date: &str, summary: &SessionSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session: {}", summary.focus);
    let _ = writeln!(out, "Date: {date}");

    out.push_str("Accomplishments:\n");
    bullets(&mut out, summary.accomplishments.iter().cloned());

    out.push_str("\nDecisions Made:\n");
    bullets(
        &mut out,
        summary
            .decisions
            .iter()
            .map(|d| format!("{}: {}", d.decision, d.rationale)),
    );

    out.push_str("\nKey Learnings:\n");
    bullets(&mut out, summary.learnings.iter().map(|l| l.insight.clone()));

    out.push_str("\nOpen Threads:\n");
    bullets(&mut out, summary.open_threads.iter().cloned());

    let _ = write!(out, "\nCommits: {}", summary.commits.join(", "));
    if let Some(minutes) = summary.duration {
        let _ = write!(out, "\nDuration: {minutes} minutes");
    }
    out.trim().to_string()
}
