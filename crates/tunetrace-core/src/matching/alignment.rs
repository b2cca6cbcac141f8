//! Global alignment scoring between two fingerprints

use crate::config::TuneConfig;

/// Match, mismatch and gap scores of the alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentScores {
    pub matched: i32,
    pub mismatched: i32,
    pub gap: i32,
}

impl AlignmentScores {
    pub fn from_config(config: &TuneConfig) -> Self {
        Self {
            matched: config.match_score,
            mismatched: config.mismatch_score,
            gap: config.gap_score,
        }
    }
}

impl Default for AlignmentScores {
    fn default() -> Self {
        Self::from_config(&TuneConfig::default())
    }
}

/// Similarity of `query` and `candidate`.
///
/// The shorter string runs along the row, the longer one down the columns,
/// and only one row of the matrix is kept. The last cell of the row carries
/// the running maximum of every cell value it has overwritten, and that
/// maximum feeds the following rows, so a short melody may end anywhere
/// inside a long one. The result is half the best value of the final row
/// per character of the shorter string: identical strings score 1.0.
pub fn alignment_score(query: &str, candidate: &str, scores: &AlignmentScores) -> f32 {
    let query: Vec<char> = query.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (a, b) = if query.len() <= candidate.len() {
        (&query, &candidate)
    } else {
        (&candidate, &query)
    };

    let width = a.len();
    if width == 0 {
        return 0.0;
    }

    let mut row = vec![0i32; width + 1];

    for &symbol in b.iter() {
        let mut diagonal = row[0];
        for j in 1..=width {
            let up = row[j];
            let substitution = if a[j - 1] == symbol {
                scores.matched
            } else {
                scores.mismatched
            };
            row[j] = (diagonal + substitution)
                .max(row[j - 1] + scores.gap)
                .max(up + scores.gap);
            row[width] = row[width].max(up);
            diagonal = up;
        }
    }

    let best = row.iter().copied().max().unwrap_or(0);
    0.5 * best as f32 / width as f32
}
