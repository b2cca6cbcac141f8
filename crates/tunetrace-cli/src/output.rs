//! JSON output formatting

use serde::Serialize;
use tunetrace_core::{Outcome, RankedMatch};
use tunetrace_index::IndexRecord;

/// A ranked match joined with the tune's display metadata
#[derive(Debug, Serialize)]
pub struct MatchOutput<'a> {
    pub identifier: &'a str,
    pub score: f32,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    fingerprint: &'a str,
    detections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    results: Vec<MatchOutput<'a>>,
}

/// Attach metadata from the index to each match
pub fn with_metadata<'a>(matches: &'a [RankedMatch], records: &'a [IndexRecord]) -> Vec<MatchOutput<'a>> {
    matches
        .iter()
        .map(|m| MatchOutput {
            identifier: &m.identifier,
            score: m.score,
            metadata: records
                .iter()
                .find(|r| r.identifier == m.identifier)
                .map(|r| r.metadata.clone())
                .unwrap_or_default(),
        })
        .collect()
}

/// JSON document for a finished search
pub fn search_json(query: &str, outcome: &Outcome, records: &[IndexRecord]) -> serde_json::Result<String> {
    let output = SearchOutput {
        query,
        fingerprint: &outcome.fingerprint,
        detections: outcome.matches.len(),
        error: outcome.error.as_deref(),
        results: with_metadata(&outcome.matches, records),
    };
    serde_json::to_string_pretty(&output)
}

/// Print a finished search as JSON
pub fn print_search(query: &str, outcome: &Outcome, records: &[IndexRecord]) {
    match search_json(query, outcome, records) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_search_json_joins_metadata() {
        let records = vec![
            IndexRecord::new("12", "mmoqrqom").with_metadata(json!({"title": "The Banshee"})),
            IndexRecord::new("40", "qrstqrst"),
        ];
        let outcome = Outcome {
            request: 1,
            fingerprint: "mmoqrqom".to_string(),
            matches: vec![
                RankedMatch { identifier: "12".to_string(), score: 1.0 },
                RankedMatch { identifier: "40".to_string(), score: 0.25 },
            ],
            error: None,
            discarded: false,
        };

        let json: Value = serde_json::from_str(&search_json("reel.wav", &outcome, &records).unwrap()).unwrap();

        assert_eq!(json["detections"], 2);
        assert_eq!(json["results"][0]["metadata"]["title"], "The Banshee");
        assert!(json["results"][1].get("metadata").is_none());
        assert!(json.get("error").is_none());
    }
}
