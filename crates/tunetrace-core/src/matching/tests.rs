//! Tests for the two-stage search

use super::*;
use approx::assert_relative_eq;

fn records(entries: &[(&str, &str)]) -> Vec<IndexRecord> {
    entries
        .iter()
        .map(|(id, fingerprint)| IndexRecord::new(*id, *fingerprint))
        .collect()
}

/// Deterministic pseudo-random fingerprint over the first 24 symbols
fn synthetic_fingerprint(seed: usize, len: usize) -> String {
    let mut state = (seed as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            crate::fingerprint::ALPHABET[((state >> 33) % 24) as usize]
        })
        .collect()
}

#[test]
fn test_first_search_ranks_shared_ngrams() {
    let matcher = Matcher::new(&TuneConfig::default());
    let index = records(&[("1", "abcd"), ("2", "abce")]);

    let candidates = matcher.first_search("abcd", &index);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].record.identifier, "1");
    assert_eq!(candidates[0].hits, 1);
}

#[test]
fn test_second_search_prefers_exact_record() {
    let matcher = Matcher::new(&TuneConfig::default());
    let index = records(&[("1", "abcd"), ("2", "abce")]);
    let all: Vec<&IndexRecord> = index.iter().collect();

    let results = matcher.second_search("abcd", &all);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].identifier, "1");
    assert_relative_eq!(results[0].score, 1.0);
    assert!(results[0].score > results[1].score);
}

#[test]
fn test_self_match_hits() {
    let matcher = Matcher::new(&TuneConfig::default());
    let query = "mnopqrstuv";
    let index = records(&[("self", query)]);

    let candidates = matcher.first_search(query, &index);
    assert_eq!(candidates[0].hits, query.len() - 4 + 1);
}

#[test]
fn test_first_search_is_stable_on_ties() {
    let matcher = Matcher::new(&TuneConfig::default());
    let index = records(&[
        ("a", "xxabcdxx"),
        ("b", "abcdefgh"),
        ("c", "yyyabcdy"),
        ("d", "zzzzzzzz"),
    ]);

    let candidates = matcher.first_search("abcdefgh", &index);
    let ids: Vec<&str> = candidates.iter().map(|c| c.record.identifier.as_str()).collect();

    assert_eq!(ids, vec!["b", "a", "c"]);
}

#[test]
fn test_result_counts_are_capped() {
    let config = TuneConfig::default();
    let matcher = Matcher::new(&config);

    // every record shares "abcd" with the query
    let index: Vec<IndexRecord> = (0..2500)
        .map(|i| IndexRecord::new(i.to_string(), format!("abcd{}", synthetic_fingerprint(i, 16))))
        .collect();

    let candidates = matcher.first_search("abcdmnop", &index);
    assert_eq!(candidates.len(), config.first_search_max_results);

    let refs: Vec<&IndexRecord> = candidates.iter().map(|c| c.record).collect();
    let results = matcher.second_search("abcdmnop", &refs);
    assert_eq!(results.len(), config.second_search_max_results);

    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_search_finds_tune_from_excerpt() {
    let matcher = Matcher::new(&TuneConfig::default());
    let mut index: Vec<IndexRecord> = (0..200)
        .map(|i| IndexRecord::new(format!("tune-{}", i), synthetic_fingerprint(i, 64)))
        .collect();
    let target = synthetic_fingerprint(9999, 64);
    index.push(IndexRecord::new("target", target.clone()));

    let excerpt = &target[20..44];
    let results = matcher.search(excerpt, &index);

    assert!(!results.is_empty());
    assert_eq!(results[0].identifier, "target");
    assert_relative_eq!(results[0].score, 1.0);
}

#[test]
fn test_empty_query_finds_nothing() {
    let matcher = Matcher::new(&TuneConfig::default());
    let index = records(&[("1", "abcd")]);
    assert!(matcher.search("", &index).is_empty());
}

#[test]
fn test_ranked_match_json() {
    let result = RankedMatch {
        identifier: "2041".to_string(),
        score: 0.75,
    };

    let json = serde_json::to_string(&result).unwrap();
    assert_eq!(json, r#"{"identifier":"2041","score":0.75}"#);

    let back: RankedMatch = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}
