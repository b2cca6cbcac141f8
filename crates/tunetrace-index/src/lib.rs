//! TuneTrace tune index file format library
//!
//! The index is a JSON object mapping each tune identifier to a record that
//! carries the tune's `contour` fingerprint plus display metadata. Both the
//! bare map and the versioned envelope written by [`IndexWriter`] are read.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{IndexError, IndexRecord, TuneEntry, TuneIndexFile, DEFAULT_MAX_AGE_DAYS, VERSION};
pub use reader::IndexReader;
pub use writer::IndexWriter;
