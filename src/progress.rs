//! Upload progress reporting.
//!
//! Reports what `docvec upload` is doing: processing the file, then indexing
//! pages and chunks into their collections. Progress goes to **stderr** so
//! stdout stays parseable for scripts.

use std::io::Write;
use std::sync::Arc;

/// A single progress event for an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadProgressEvent {
    /// The file is being split into pages and chunks.
    Processing { document: String },
    /// `records` records are about to be embedded into `collection`.
    Indexing { collection: String, records: u64 },
    /// `written` of `records` records were stored; the rest were too short.
    Indexed {
        collection: String,
        written: u64,
        records: u64,
    },
}

pub trait UploadProgressReporter: Send + Sync {
    fn report(&self, event: UploadProgressEvent);
}

/// Human-friendly progress on stderr: "upload report_chunks  indexed  1,234 / 1,300 records".
pub struct StderrProgress;

impl UploadProgressReporter for StderrProgress {
    fn report(&self, event: UploadProgressEvent) {
        let line = match &event {
            UploadProgressEvent::Processing { document } => {
                format!("upload {}  processing...\n", document)
            }
            UploadProgressEvent::Indexing {
                collection,
                records,
            } => format!(
                "upload {}  indexing  {} records\n",
                collection,
                format_number(*records)
            ),
            UploadProgressEvent::Indexed {
                collection,
                written,
                records,
            } => format!(
                "upload {}  indexed  {} / {} records\n",
                collection,
                format_number(*written),
                format_number(*records)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &UploadProgressEvent) -> serde_json::Value {
        match event {
            UploadProgressEvent::Processing { document } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "processing"
            }),
            UploadProgressEvent::Indexing {
                collection,
                records,
            } => serde_json::json!({
                "event": "progress",
                "collection": collection,
                "phase": "indexing",
                "records": records
            }),
            UploadProgressEvent::Indexed {
                collection,
                written,
                records,
            } => serde_json::json!({
                "event": "progress",
                "collection": collection,
                "phase": "indexed",
                "written": written,
                "records": records
            }),
        }
    }
}

impl UploadProgressReporter for JsonProgress {
    fn report(&self, event: UploadProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl UploadProgressReporter for NoProgress {
    fn report(&self, _event: UploadProgressEvent) {}
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
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Arc<dyn UploadProgressReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoProgress),
            ProgressMode::Human => Arc::new(StderrProgress),
            ProgressMode::Json => Arc::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_events_name_their_phase() {
        let json = JsonProgress::to_json(&UploadProgressEvent::Indexed {
            collection: "report_pages".to_string(),
            written: 2,
            records: 3,
        });
        assert_eq!(json["phase"], "indexed");
        assert_eq!(json["collection"], "report_pages");
        assert_eq!(json["written"], 2);
        assert_eq!(json["records"], 3);
    }
}
