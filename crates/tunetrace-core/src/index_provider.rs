//! Index providers
//!
//! Abstraction over where the tune index comes from. Providers hand out
//! search-ready records and drop any whose fingerprint contains symbols
//! outside the alphabet.

use crate::fingerprint::is_valid_fingerprint;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tunetrace_index::{IndexReader, IndexRecord, DEFAULT_MAX_AGE_DAYS};

/// Source of index records
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Load every record, in index order
    async fn load_records(&self) -> Result<Vec<IndexRecord>>;

    /// Human-readable description of the source
    fn describe(&self) -> String;
}

/// Records held in memory
pub struct MemoryProvider {
    records: Vec<IndexRecord>,
}

impl MemoryProvider {
    pub fn new(records: Vec<IndexRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl IndexProvider for MemoryProvider {
    async fn load_records(&self) -> Result<Vec<IndexRecord>> {
        Ok(retain_searchable(self.records.clone()))
    }

    fn describe(&self) -> String {
        format!("memory ({} records)", self.records.len())
    }
}

/// JSON index file on disk
pub struct FilesystemProvider {
    path: PathBuf,
    max_age_days: i64,
}

impl FilesystemProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }

    /// Age after which a warning about a stale index is logged
    pub fn with_max_age_days(mut self, days: i64) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IndexProvider for FilesystemProvider {
    async fn load_records(&self) -> Result<Vec<IndexRecord>> {
        let path = self.path.clone();
        let max_age_days = self.max_age_days;

        let records = tokio::task::spawn_blocking(move || -> Result<Vec<IndexRecord>> {
            let index = IndexReader::read(&path)?;
            if index.is_stale(Utc::now(), max_age_days) {
                log::warn!(
                    "Tune index {} is older than {} days or undated; consider refreshing it",
                    path.display(),
                    max_age_days
                );
            }
            index
                .records()
                .with_context(|| format!("Invalid tune entry in {}", path.display()))
        })
        .await
        .context("Index loading task failed")??;

        Ok(retain_searchable(records))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Drop records whose fingerprint cannot be searched
pub fn retain_searchable(records: Vec<IndexRecord>) -> Vec<IndexRecord> {
    let total = records.len();
    let kept: Vec<IndexRecord> = records
        .into_iter()
        .filter(|record| {
            let valid = is_valid_fingerprint(&record.fingerprint);
            if !valid {
                log::warn!(
                    "Skipping tune {}: fingerprint has symbols outside the alphabet",
                    record.identifier
                );
            }
            valid
        })
        .collect();

    if kept.len() < total {
        log::info!("Kept {} of {} index records", kept.len(), total);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tunetrace_index::{IndexWriter, TuneIndexFile};

    #[tokio::test]
    async fn test_memory_provider_drops_invalid_records() {
        let provider = MemoryProvider::new(vec![
            IndexRecord::new("1", "abcd"),
            IndexRecord::new("2", "ab-d"),
            IndexRecord::new("3", "mnoW"),
            IndexRecord::new("4", "ABCV"),
        ]);

        let records = provider.load_records().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();

        assert_eq!(ids, vec!["1", "4"]);
        assert!(provider.describe().contains("4 records"));
    }

    #[tokio::test]
    async fn test_filesystem_provider_reads_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunes.json");

        let mut index = TuneIndexFile::new().with_fetched_at(Utc::now());
        index.add_record(&IndexRecord::new("100", "mmoqrqom").with_metadata(json!({"title": "The Kesh"})));
        index.add_record(&IndexRecord::new("7", "qrsrqomo"));
        index.add_record(&IndexRecord::new("bad", "qr?rqomo"));
        IndexWriter::new().write(&path, &index).unwrap();

        let provider = FilesystemProvider::new(&path);
        let records = provider.load_records().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "100");
        assert_eq!(records[0].metadata["title"], "The Kesh");
        assert_eq!(records[1].fingerprint, "qrsrqomo");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemProvider::new(dir.path().join("missing.json"));
        assert!(provider.load_records().await.is_err());
    }
}
