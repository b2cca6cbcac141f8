//! Tune index reader

use crate::format::{IndexRecord, TuneIndexFile};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct IndexReader;

impl IndexReader {
    /// Read an index file
    pub fn read(path: &Path) -> Result<TuneIndexFile> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open tune index: {}", path.display()))?;

        let mut reader = BufReader::new(file);
        let mut json = String::new();
        reader
            .read_to_string(&mut json)
            .with_context(|| format!("Failed to read tune index: {}", path.display()))?;

        let index = TuneIndexFile::from_json_str(&json)
            .with_context(|| format!("Invalid tune index: {}", path.display()))?;

        log::info!("Read {} tunes from {}", index.len(), path.display());

        Ok(index)
    }

    /// Read an index file straight into search records
    pub fn read_records(path: &Path) -> Result<Vec<IndexRecord>> {
        let index = Self::read(path)?;
        let records = index
            .records()
            .with_context(|| format!("Invalid tune entry in {}", path.display()))?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "1": {{ "contour": "abcd" }}, "2": {{ "contour": "abce" }} }}"#
        )
        .unwrap();

        let records = IndexReader::read_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fingerprint, "abce");
    }

    #[test]
    fn test_missing_file() {
        let err = IndexReader::read(Path::new("/nonexistent/tunes.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to open tune index"));
    }
}
