//! Two-stage fingerprint search
//!
//! The first stage counts the query's n-grams in every index record with an
//! Aho-Corasick automaton and keeps the best candidates. The second stage
//! scores those candidates by global alignment.

pub mod alignment;
pub mod prefilter;

#[cfg(test)]
mod tests;

use crate::config::TuneConfig;
use alignment::{alignment_score, AlignmentScores};
use prefilter::AhoCorasick;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tunetrace_index::IndexRecord;

/// Final search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    /// Identifier of the matched tune
    pub identifier: String,
    /// Alignment score; 1.0 for an exact match
    pub score: f32,
}

/// Record that survived the n-gram prefilter
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub record: &'a IndexRecord,
    /// Number of query n-gram occurrences in the record
    pub hits: usize,
}

/// Searches a set of index records
pub struct Matcher {
    ngram_size: usize,
    first_max: usize,
    second_max: usize,
    scores: AlignmentScores,
}

impl Matcher {
    pub fn new(config: &TuneConfig) -> Self {
        Self {
            ngram_size: config.ngram_size,
            first_max: config.first_search_max_results,
            second_max: config.second_search_max_results,
            scores: AlignmentScores::from_config(config),
        }
    }

    /// Rank records by n-gram hits. Records without a hit are dropped; ties
    /// keep index order.
    pub fn first_search<'a>(&self, query: &str, records: &'a [IndexRecord]) -> Vec<Candidate<'a>> {
        let automaton = AhoCorasick::from_ngrams(query, self.ngram_size);

        let mut candidates: Vec<Candidate<'a>> = records
            .iter()
            .filter_map(|record| {
                let hits = automaton.count_matches(&record.fingerprint);
                (hits > 0).then_some(Candidate { record, hits })
            })
            .collect();

        candidates.sort_by(|a, b| b.hits.cmp(&a.hits));
        candidates.truncate(self.first_max);

        log::debug!(
            "First search kept {} of {} records",
            candidates.len(),
            records.len()
        );

        candidates
    }

    /// Rank candidates by alignment score. Ties keep candidate order.
    pub fn second_search(&self, query: &str, candidates: &[&IndexRecord]) -> Vec<RankedMatch> {
        let mut results: Vec<RankedMatch> = candidates
            .par_iter()
            .map(|record| {
                let score = alignment_score(query, &record.fingerprint, &self.scores);
                log::trace!("Candidate {} scores {:.4}", record.identifier, score);
                RankedMatch {
                    identifier: record.identifier.clone(),
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(self.second_max);

        results
    }

    /// Both stages in sequence
    pub fn search(&self, query: &str, records: &[IndexRecord]) -> Vec<RankedMatch> {
        if query.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<&IndexRecord> = self
            .first_search(query, records)
            .into_iter()
            .map(|c| c.record)
            .collect();

        self.second_search(query, &candidates)
    }
}
