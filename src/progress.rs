//! Submission progress reporting.
//!
//! Reports per-chunk progress during `qpi submit-names` / `qpi submit-ids` so
//! users see which slice of the input is in flight and when the client is
//! pacing itself. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// A single progress event for a submission run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitProgressEvent {
    /// About to POST profiles `start..end` of `total` (chunk `chunk` of `chunks`, 1-based).
    Requesting {
        chunk: usize,
        chunks: usize,
        start: usize,
        end: usize,
        total: usize,
    },
    /// Chunk accepted by the server.
    Accepted { chunk: usize, chunks: usize },
    /// Pausing before the next chunk.
    Waiting { secs: u64 },
}

/// Reports submission progress. Implementations write to stderr (human or JSON).
pub trait SubmitProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the submission pipeline.
    fn report(&self, event: SubmitProgressEvent);
}

/// Human-friendly progress on stderr: "Requesting 0 - 10 of 1,234  (chunk 1/124)".
pub struct StderrProgress;

impl SubmitProgressReporter for StderrProgress {
    fn report(&self, event: SubmitProgressEvent) {
        let line = match &event {
            SubmitProgressEvent::Requesting {
                chunk,
                chunks,
                start,
                end,
                total,
            } => format!(
                "Requesting {} - {} of {}  (chunk {}/{})\n",
                format_number(*start as u64),
                format_number(*end as u64),
                format_number(*total as u64),
                chunk,
                chunks
            ),
            SubmitProgressEvent::Accepted { chunk, chunks } => {
                format!("  chunk {}/{} ok\n", chunk, chunks)
            }
            SubmitProgressEvent::Waiting { secs } => format!("  waiting {}s\n", secs),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SubmitProgressReporter for JsonProgress {
    fn report(&self, event: SubmitProgressEvent) {
        let obj = match &event {
            SubmitProgressEvent::Requesting {
                chunk,
                chunks,
                start,
                end,
                total,
            } => serde_json::json!({
                "event": "requesting",
                "chunk": chunk,
                "chunks": chunks,
                "start": start,
                "end": end,
                "total": total
            }),
            SubmitProgressEvent::Accepted { chunk, chunks } => serde_json::json!({
                "event": "accepted",
                "chunk": chunk,
                "chunks": chunks
            }),
            SubmitProgressEvent::Waiting { secs } => serde_json::json!({
                "event": "waiting",
                "secs": secs
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SubmitProgressReporter for NoProgress {
    fn report(&self, _event: SubmitProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value. `auto` defers to [`ProgressMode::default_for_tty`].
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "auto" => Ok(Self::default_for_tty()),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            "off" => Ok(ProgressMode::Off),
            other => Err(format!(
                "unknown progress mode '{}': expected auto, human, json, or off",
                other
            )),
        }
    }

    pub fn reporter(&self) -> Box<dyn SubmitProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
