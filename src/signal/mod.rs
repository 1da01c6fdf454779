//! Infrared signal payloads and their persisted text form.
//!
//! A signal's pulse sequence is stored as comma-joined decimal values. The
//! content hash is derived from that text only, so identical pulse sequences
//! share a hash regardless of format or frequency.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const FALLBACK_LABEL_VALUES: usize = 3;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("malformed signal data: '{token}' is not a pulse length")]
    MalformedData {
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// One infrared message as exchanged with the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub format: String,
    pub freq: u32,
    pub data: Vec<u32>,
}

impl Signal {
    pub fn data_string(&self) -> String {
        encode_data(&self.data)
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.data_string())
    }
}

/// A pending signal together with where it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub message: Signal,
    pub hostname: String,
    pub deviceid: String,
}

pub fn encode_data(data: &[u32]) -> String {
    data.iter()
        .map(|pulse| pulse.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a comma-joined pulse sequence. The empty string is the encoding of
/// an empty sequence and decodes back to one.
pub fn decode_data(value: &str) -> Result<Vec<u32>, SignalError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(',')
        .map(|token| {
            token.parse::<u32>().map_err(|source| SignalError::MalformedData {
                token: token.to_string(),
                source,
            })
        })
        .collect()
}

/// Hex-encoded SHA-256 of the encoded data string.
pub fn content_hash(data_string: &str) -> String {
    hex::encode(Sha256::digest(data_string.as_bytes()))
}

/// Display name for a signal nobody has labeled yet. Computed on read, never stored.
pub fn fallback_label(data_string: &str) -> String {
    let head: Vec<&str> = data_string
        .splitn(FALLBACK_LABEL_VALUES + 1, ',')
        .take(FALLBACK_LABEL_VALUES)
        .collect();
    format!("{}...", head.join(","))
}
