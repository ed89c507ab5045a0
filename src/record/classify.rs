// src/record/classify.rs

//! Keyword heuristics that turn free-form output into a [`Level`].
//!
//! Everything that interprets output text lives here, so the rest of the
//! pipeline only ever sees levels and statuses.

use super::entry::{Level, Status};

const ERROR_TOKENS: &[&str] = &["error", "failed", "not recognized", "commandnotfound"];
const SUCCESS_TOKENS: &[&str] = &["success", "passed", "completed", "compiled", "ready"];
const WARNING_TOKENS: &[&str] = &["warning", "deprecated"];
const BUILD_COMPLETION_TOKENS: &[&str] = &["compiled", "ready"];
const PROGRESS_TOKENS: &[&str] = &["starting", "building"];

fn contains_any(lower: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| lower.contains(t))
}

/// Classify a line of output. Error wins over success, success over warning;
/// anything without a keyword is `info`.
pub fn classify(text: &str) -> Level {
    let lower = text.to_lowercase();
    if contains_any(&lower, ERROR_TOKENS) {
        Level::Error
    } else if contains_any(&lower, SUCCESS_TOKENS) {
        Level::Success
    } else if contains_any(&lower, WARNING_TOKENS) {
        Level::Warning
    } else {
        Level::Info
    }
}

/// Whether a message reports that a build finished (`hasCompiled`).
pub fn mentions_build_completion(text: &str) -> bool {
    contains_any(&text.to_lowercase(), BUILD_COMPLETION_TOKENS)
}

/// The status an entry pushes towards, if any.
///
/// Info lines only matter when they announce progress (`starting`,
/// `building`).
pub fn status_hint(level: Level, message: &str) -> Option<Status> {
    match level {
        Level::Error => Some(Status::Error),
        Level::Warning => Some(Status::Warning),
        Level::Success => Some(Status::Success),
        Level::Info if contains_any(&message.to_lowercase(), PROGRESS_TOKENS) => {
            Some(Status::Building)
        }
        Level::Info => None,
    }
}
