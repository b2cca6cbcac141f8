//! Tune index writer

use crate::format::TuneIndexFile;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct IndexWriter {
    pretty: bool,
}

impl IndexWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Write compact JSON instead of indented JSON
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// Write an index file, creating parent directories as needed
    pub fn write(&self, path: &Path, index: &TuneIndexFile) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create index directory: {}", parent.display())
                })?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create tune index: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, index)?;
        } else {
            serde_json::to_writer(&mut writer, index)?;
        }
        writer.flush()?;

        log::info!("Wrote {} tunes to {}", index.len(), path.display());

        Ok(())
    }
}

impl Default for IndexWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IndexRecord;
    use crate::reader::IndexReader;
    use chrono::Utc;

    #[test]
    fn test_written_index_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tunes.json");

        let mut index = TuneIndexFile::new().with_fetched_at(Utc::now());
        index.add_record(&IndexRecord::new("jig-1", "aaccee"));
        index.add_record(&IndexRecord::new("jig-2", "eeccaa"));

        IndexWriter::new().compact().write(&path, &index).unwrap();

        let read = IndexReader::read(&path).unwrap();
        assert_eq!(read.len(), 2);
        assert!(read.fetched_at.is_some());
        let records = read.records().unwrap();
        assert_eq!(records[0].identifier, "jig-1");
        assert_eq!(records[1].fingerprint, "eeccaa");
    }
}
