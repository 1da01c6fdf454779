//! Captured signal rows of the `irlog` table.
//!
//! Rows are append-only. Display names live in `data_name` keyed by the
//! content hash, so relabeling never touches a log row.

use serde::{Deserialize, Serialize};

use crate::signal::{self, Envelope, Signal, SignalError};

/// A stored capture, as read back from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub format: String,
    pub freq: u32,
    pub data: String,
    #[serde(skip)]
    pub data_hash: String,
    pub hostname: String,
    pub deviceid: String,
    pub created_at: i64,
}

impl LogEntry {
    /// Rebuilds the signal so it can be replayed.
    pub fn signal(&self) -> Result<Signal, SignalError> {
        Ok(Signal {
            format: self.format.clone(),
            freq: self.freq,
            data: signal::decode_data(&self.data)?,
        })
    }
}

/// A log entry joined with its display name. When no label exists the name
/// falls back to the first pulse values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledLogEntry {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub name: String,
}

impl LabeledLogEntry {
    pub fn new(entry: LogEntry, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| signal::fallback_label(&entry.data));
        Self { entry, name }
    }
}

/// Row to append for a freshly fetched signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub format: String,
    pub freq: u32,
    pub data: String,
    pub data_hash: String,
    pub hostname: String,
    pub deviceid: String,
    pub created_at: i64,
}

impl NewLogEntry {
    pub fn from_envelope(envelope: Envelope, created_at: i64) -> Self {
        let data = envelope.message.data_string();
        let data_hash = signal::content_hash(&data);
        Self {
            format: envelope.message.format,
            freq: envelope.message.freq,
            data,
            data_hash,
            hostname: envelope.hostname,
            deviceid: envelope.deviceid,
            created_at,
        }
    }
}
