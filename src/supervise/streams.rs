// src/supervise/streams.rs

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::record::{RecorderHandle, StreamSource};

/// Longest line kept in memory; longer output is forwarded in pieces.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines on `\n`, `\r` or `\r\n`.
///
/// Progress output that redraws with a bare `\r` therefore yields one line
/// per redraw. A line reaching [`MAX_LINE_BYTES`] is flushed as is.
#[derive(Debug)]
pub struct LineSplitter {
    line: Vec<u8>,
    after_cr: bool,
    max_len: usize,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_len(MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            line: Vec::new(),
            after_cr: false,
            max_len: max_len.max(1),
        }
    }

    /// Feed a chunk and return every line it completes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            match b {
                // Second half of a `\r\n`.
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' | b'\r' => {
                    self.after_cr = b == b'\r';
                    lines.push(self.take());
                }
                _ => {
                    self.after_cr = false;
                    self.line.push(b);
                    if self.line.len() >= self.max_len {
                        lines.push(self.take());
                    }
                }
            }
        }
        lines
    }

    /// The unterminated tail at end of stream, if any.
    pub fn finish(mut self) -> Option<String> {
        if self.line.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        line
    }
}

/// Forward every line of `reader` to the recorder, in order.
///
/// Bytes are decoded lossily so a stray non-UTF-8 sequence cannot end the
/// stream early. When `echo` is set, lines are also printed to the matching
/// terminal stream, prefixed with the stage name.
pub fn spawn_stream_reader<R>(
    reader: R,
    stream: StreamSource,
    recorder: RecorderHandle,
    echo: bool,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut splitter = LineSplitter::new();

        loop {
            let (lines, used) = match reader.fill_buf().await {
                Ok([]) => break,
                Ok(chunk) => (splitter.push(chunk), chunk.len()),
                Err(e) => {
                    warn!(stage = %recorder.name(), %stream, error = %e, "error reading child output");
                    break;
                }
            };
            reader.consume(used);

            for line in lines {
                forward(&recorder, stream, echo, line).await;
            }
        }

        if let Some(tail) = splitter.finish() {
            forward(&recorder, stream, echo, tail).await;
        }

        debug!(stage = %recorder.name(), %stream, "stream reader ended");
    })
}

async fn forward(recorder: &RecorderHandle, stream: StreamSource, echo: bool, line: String) {
    debug!(stage = %recorder.name(), %stream, "{}", line);
    if echo {
        echo_line(recorder.name(), stream, &line);
    }
    recorder.output(line, stream).await;
}

fn echo_line(stage: &str, stream: StreamSource, line: &str) {
    match stream {
        StreamSource::Stderr => eprintln!("[{stage}] {line}"),
        _ => println!("[{stage}] {line}"),
    }
}
