// tests/property/main.rs

use std::sync::Arc;

use proptest::prelude::*;

use devwatch::fs::mock::MockFileSystem;
use devwatch::record::{LogRecorder, Status, StreamSource};
use devwatch::store::StatusStore;

const VOCABULARY: &[&str] = &[
    "Compiled successfully",
    "ready - started server",
    "Failed to compile",
    "error TS2304: cannot find name",
    "warning: unused variable",
    "deprecated API",
    "Starting dev server",
    "Building...",
    "GET / 200 in 12ms",
    "tests passed",
    "",
    "   ",
];

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(VOCABULARY).prop_map(str::to_string),
        "[ -~]{0,40}",
    ]
}

fn stream_strategy() -> impl Strategy<Value = StreamSource> {
    prop_oneof![Just(StreamSource::Stdout), Just(StreamSource::Stderr)]
}

fn recorder() -> LogRecorder {
    let store = StatusStore::with_fs(".cursor", Arc::new(MockFileSystem::new()));
    LogRecorder::start("prop", store)
}

proptest! {
    #[test]
    fn summary_counts_are_consistent(
        lines in proptest::collection::vec((line_strategy(), stream_strategy()), 0..60)
    ) {
        let mut rec = recorder();
        let mut accepted = 0usize;
        for (line, stream) in &lines {
            if rec.append(line, *stream).is_some() {
                accepted += 1;
            }
            let s = rec.summary();
            prop_assert!(s.error_count + s.success_count + s.warning_count <= s.total_logs);
            prop_assert_eq!(s.is_healthy, s.error_count == 0 && s.success_count > 0);
        }

        prop_assert_eq!(accepted, lines.len());
        prop_assert_eq!(rec.summary().total_logs, lines.len());
        prop_assert_eq!(rec.logs().len(), lines.len());
    }

    #[test]
    fn status_never_moves_backwards(
        lines in proptest::collection::vec((line_strategy(), stream_strategy()), 0..60)
    ) {
        let mut rec = recorder();
        let mut previous = rec.status();
        let mut seen_error = false;

        for (line, stream) in &lines {
            rec.append(line, *stream);
            let current = rec.status();
            prop_assert!(current.rank() >= previous.rank());
            seen_error |= rec.summary().error_count > 0;
            if seen_error {
                prop_assert_eq!(current, Status::Error);
            }
            previous = current;
        }
    }

    #[test]
    fn snapshot_matches_recorder_state(
        lines in proptest::collection::vec(line_strategy(), 0..30),
        exit_code in proptest::option::of(-1i32..5)
    ) {
        let mut rec = recorder();
        for line in &lines {
            rec.append(line, StreamSource::Stdout);
        }
        rec.finish(exit_code);

        let snapshot = rec.snapshot();
        prop_assert_eq!(snapshot.status, rec.status());
        prop_assert_eq!(&snapshot.summary, rec.summary());
        prop_assert_eq!(snapshot.logs.len(), snapshot.summary.total_logs);
        prop_assert_eq!(snapshot.exit_code, exit_code);
        prop_assert!(snapshot.finished);
        prop_assert!(snapshot.duration_ms >= 0);
    }
}
