//! Tune index structures

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Current envelope version
pub const VERSION: &str = "1.0";

/// Age after which a cached index should be fetched again
pub const DEFAULT_MAX_AGE_DAYS: i64 = 28;

/// Key holding the fingerprint inside each tune entry
const CONTOUR_KEY: &str = "contour";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("tune {identifier} is malformed: {source}")]
    MalformedEntry {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("index document is neither a tune map nor a versioned index: {0}")]
    MalformedDocument(#[source] serde_json::Error),
}

/// A tune as handed to the search engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Identifier of the tune (key in the index map)
    pub identifier: String,
    /// Fingerprint string of the tune
    pub fingerprint: String,
    /// Display metadata, opaque to the search engine
    pub metadata: Value,
}

impl IndexRecord {
    pub fn new(identifier: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            fingerprint: fingerprint.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One entry of the tune map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneEntry {
    pub contour: String,
    /// Everything else stored with the tune (title, file name, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Versioned index file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneIndexFile {
    pub version: String,
    /// When the index was last downloaded or built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    /// Identifier -> tune entry, in file order
    pub tunes: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexDocument {
    Versioned(TuneIndexFile),
    Bare(Map<String, Value>),
}

impl TuneIndexFile {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            version: VERSION.to_string(),
            fetched_at: None,
            tunes: Map::new(),
        }
    }

    /// Stamp the index with its fetch time
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = Some(fetched_at);
        self
    }

    /// Parse either a bare tune map or a versioned index
    pub fn from_json_str(json: &str) -> Result<Self, IndexError> {
        let document: IndexDocument =
            serde_json::from_str(json).map_err(IndexError::MalformedDocument)?;

        Ok(match document {
            IndexDocument::Versioned(file) => file,
            IndexDocument::Bare(tunes) => Self {
                version: VERSION.to_string(),
                fetched_at: None,
                tunes,
            },
        })
    }

    pub fn len(&self) -> usize {
        self.tunes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunes.is_empty()
    }

    /// Add or replace a tune. Object metadata is merged into the entry,
    /// any other metadata is stored under `metadata`.
    pub fn add_record(&mut self, record: &IndexRecord) {
        let mut entry = match &record.metadata {
            Value::Object(fields) => fields.clone(),
            Value::Null => Map::new(),
            other => {
                let mut fields = Map::new();
                fields.insert("metadata".to_string(), other.clone());
                fields
            }
        };
        entry.insert(CONTOUR_KEY.to_string(), Value::String(record.fingerprint.clone()));

        self.tunes.insert(record.identifier.clone(), Value::Object(entry));
    }

    /// All tunes as search records, in file order
    pub fn records(&self) -> Result<Vec<IndexRecord>, IndexError> {
        self.tunes
            .iter()
            .map(|(identifier, value)| {
                let entry: TuneEntry = serde_json::from_value(value.clone()).map_err(|source| {
                    IndexError::MalformedEntry {
                        identifier: identifier.clone(),
                        source,
                    }
                })?;

                Ok(IndexRecord {
                    identifier: identifier.clone(),
                    fingerprint: entry.contour,
                    metadata: Value::Object(entry.extra),
                })
            })
            .collect()
    }

    /// True when the index was never stamped or is at least `max_age_days` old
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_days: i64) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at >= Duration::days(max_age_days),
            None => true,
        }
    }
}

impl Default for TuneIndexFile {
    fn default() -> Self {
        Self::new()
    }
}
