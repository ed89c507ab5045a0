// tests/classification.rs

use devwatch::record::classify::{classify, mentions_build_completion, status_hint};
use devwatch::record::{Level, Status};

#[test]
fn keywords_map_to_levels() {
    assert_eq!(classify("Failed to compile."), Level::Error);
    assert_eq!(classify("'npx' is not recognized as an internal command"), Level::Error);
    assert_eq!(classify("CommandNotFoundException"), Level::Error);
    assert_eq!(classify("All tests passed"), Level::Success);
    assert_eq!(classify("Build completed in 3.2s"), Level::Success);
    assert_eq!(classify("Warning: something looks off"), Level::Warning);
    assert_eq!(classify("this API is DEPRECATED"), Level::Warning);
    assert_eq!(classify("GET /api/health 200"), Level::Info);
}

#[test]
fn error_wins_over_success_and_warning() {
    assert_eq!(classify("compiled with 1 error"), Level::Error);
    assert_eq!(classify("warning: build failed"), Level::Error);
}

#[test]
fn success_wins_over_warning() {
    assert_eq!(classify("Compiled with warnings"), Level::Success);
}

#[test]
fn classification_is_case_insensitive() {
    assert_eq!(classify("ERROR"), Level::Error);
    assert_eq!(classify("Ready"), Level::Success);
    assert_eq!(classify("WaRnInG"), Level::Warning);
}

#[test]
fn build_completion_markers() {
    assert!(mentions_build_completion("Compiled successfully"));
    assert!(mentions_build_completion("ready - started server"));
    assert!(!mentions_build_completion("Success!"));
    assert!(!mentions_build_completion("Building..."));
}

#[test]
fn status_hints_follow_levels() {
    assert_eq!(status_hint(Level::Error, "x"), Some(Status::Error));
    assert_eq!(status_hint(Level::Warning, "x"), Some(Status::Warning));
    assert_eq!(status_hint(Level::Success, "x"), Some(Status::Success));
    assert_eq!(status_hint(Level::Info, "Starting the dev server"), Some(Status::Building));
    assert_eq!(status_hint(Level::Info, "building"), Some(Status::Building));
    assert_eq!(status_hint(Level::Info, "GET / 200"), None);
}

#[test]
fn status_only_moves_forward() {
    assert_eq!(Status::Starting.advance(Status::Building), Status::Building);
    assert_eq!(Status::Building.advance(Status::Success), Status::Success);
    assert_eq!(Status::Success.advance(Status::Warning), Status::Warning);
    assert_eq!(Status::Warning.advance(Status::Error), Status::Error);

    assert_eq!(Status::Error.advance(Status::Success), Status::Error);
    assert_eq!(Status::Warning.advance(Status::Success), Status::Warning);
    assert_eq!(Status::Success.advance(Status::Building), Status::Success);
    assert_eq!(Status::Building.advance(Status::Starting), Status::Building);
}
