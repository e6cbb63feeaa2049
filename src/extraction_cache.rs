//! In-memory cache of extraction results keyed by transcript digest.
//!
//! Entries are stored as JSON together with a SHA-256 checksum of that JSON.
//! An entry whose checksum no longer matches is dropped and treated as a
//! miss, so a corrupted entry can only cost a fresh provider call.

use crate::models::ExtractedFields;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Cache key for a transcript. Surrounding whitespace does not change the key.
pub fn transcript_key(transcript: &str) -> String {
    format!("extraction:{}", sha256_hex(transcript.trim().as_bytes()))
}

/// Serialized extraction plus its checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksummedEntry {
    pub data: String,
    pub checksum: String,
}

impl ChecksummedEntry {
    pub fn seal(fields: &ExtractedFields) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_string(fields)?;
        let checksum = sha256_hex(data.as_bytes());
        Ok(Self { data, checksum })
    }

    pub fn is_valid(&self) -> bool {
        sha256_hex(self.data.as_bytes()) == self.checksum
    }

    /// Returns the fields if the checksum matches and the JSON still decodes.
    pub fn open(&self) -> Option<ExtractedFields> {
        if !self.is_valid() {
            tracing::warn!(
                "Extraction cache entry failed validation (expected checksum {}, {} bytes)",
                self.checksum,
                self.data.len()
            );
            return None;
        }
        serde_json::from_str(&self.data).ok()
    }
}

#[derive(Clone)]
pub struct ExtractionCache {
    entries: Cache<String, ChecksummedEntry>,
}

impl ExtractionCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }

    pub async fn get(&self, transcript: &str) -> Option<ExtractedFields> {
        let key = transcript_key(transcript);
        let entry = self.entries.get(&key).await?;
        match entry.open() {
            Some(fields) => Some(fields),
            None => {
                self.entries.invalidate(&key).await;
                None
            }
        }
    }

    pub async fn insert(&self, transcript: &str, fields: &ExtractedFields) {
        match ChecksummedEntry::seal(fields) {
            Ok(entry) => self.entries.insert(transcript_key(transcript), entry).await,
            Err(e) => tracing::warn!("Skipping extraction cache insert: {}", e),
        }
    }
}
