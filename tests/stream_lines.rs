// tests/stream_lines.rs

use devwatch::supervise::LineSplitter;

#[test]
fn newline_carriage_return_and_crlf_each_end_one_line() {
    let mut splitter = LineSplitter::new();
    let lines = splitter.push(b"one\ntwo\r\nthree\rfour");
    assert_eq!(lines, vec!["one", "two", "three"]);
    assert_eq!(splitter.finish(), Some("four".to_string()));
}

#[test]
fn crlf_split_across_chunks_is_still_one_break() {
    let mut splitter = LineSplitter::new();
    assert_eq!(splitter.push(b"Compiled successfully\r"), vec!["Compiled successfully"]);
    assert!(splitter.push(b"\n").is_empty());
    assert_eq!(splitter.push(b"\n"), vec![""]);
    assert_eq!(splitter.finish(), None);
}

#[test]
fn progress_redraws_yield_one_line_each() {
    let mut splitter = LineSplitter::new();
    let lines = splitter.push(b"10%\r50%\r100%\r");
    assert_eq!(lines, vec!["10%", "50%", "100%"]);
}

#[test]
fn long_lines_are_flushed_at_the_limit() {
    let mut splitter = LineSplitter::with_max_len(4);
    assert_eq!(splitter.push(b"abcdefghij"), vec!["abcd", "efgh"]);
    assert_eq!(splitter.push(b"k\n"), vec!["ijk"]);
    assert_eq!(splitter.finish(), None);
}

#[test]
fn invalid_utf8_is_replaced() {
    let mut splitter = LineSplitter::new();
    let lines = splitter.push(b"caf\xe9 ready\n");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains('\u{FFFD}'));
    assert!(lines[0].ends_with(" ready"));
}
