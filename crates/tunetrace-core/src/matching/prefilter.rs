//! Multi-pattern n-gram counting with an Aho-Corasick automaton

use std::collections::{HashMap, VecDeque};

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct Node {
    children: HashMap<char, usize>,
    failure: usize,
    /// Patterns ending here, including those reached through failure links
    outputs: usize,
}

/// Automaton over a fixed set of patterns.
///
/// Duplicate patterns are kept, so a text occurrence of a pattern given
/// twice counts twice.
#[derive(Debug)]
pub struct AhoCorasick {
    nodes: Vec<Node>,
}

impl AhoCorasick {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes = vec![Node::default()];

        for pattern in patterns {
            let mut current = ROOT;
            for c in pattern.as_ref().chars() {
                current = match nodes[current].children.get(&c) {
                    Some(&next) => next,
                    None => {
                        nodes.push(Node::default());
                        let next = nodes.len() - 1;
                        nodes[current].children.insert(c, next);
                        next
                    }
                };
            }
            nodes[current].outputs += 1;
        }

        let mut automaton = Self { nodes };
        automaton.link_failures();
        automaton
    }

    /// Every n-gram of `text`, window `n`, step 1
    pub fn from_ngrams(text: &str, n: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let ngrams: Vec<String> = if n == 0 {
            Vec::new()
        } else {
            chars.windows(n).map(|w| w.iter().collect()).collect()
        };
        Self::new(ngrams)
    }

    fn link_failures(&mut self) {
        let mut queue: VecDeque<usize> = VecDeque::new();

        let first_level: Vec<usize> = self.nodes[ROOT].children.values().copied().collect();
        for child in first_level {
            self.nodes[child].failure = ROOT;
            queue.push_back(child);
        }

        while let Some(current) = queue.pop_front() {
            let edges: Vec<(char, usize)> = self.nodes[current]
                .children
                .iter()
                .map(|(&c, &child)| (c, child))
                .collect();

            for (c, child) in edges {
                queue.push_back(child);

                let mut fallback = self.nodes[current].failure;
                while fallback != ROOT && !self.nodes[fallback].children.contains_key(&c) {
                    fallback = self.nodes[fallback].failure;
                }
                let failure = self.nodes[fallback].children.get(&c).copied().unwrap_or(ROOT);

                self.nodes[child].failure = failure;
                self.nodes[child].outputs += self.nodes[failure].outputs;
            }
        }
    }

    /// Number of pattern occurrences in `text`
    pub fn count_matches(&self, text: &str) -> usize {
        let mut count = 0;
        let mut state = ROOT;
        let mut chars = text.chars().peekable();

        while let Some(&c) = chars.peek() {
            if let Some(&next) = self.nodes[state].children.get(&c) {
                state = next;
                count += self.nodes[state].outputs;
                chars.next();
            } else if state == ROOT {
                chars.next();
            } else {
                state = self.nodes[state].failure;
            }
        }

        count
    }

    /// Number of trie nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_patterns() {
        let automaton = AhoCorasick::new(["he", "she", "his", "hers"]);
        // she, he, hers
        assert_eq!(automaton.count_matches("ushers"), 3);
        assert_eq!(automaton.count_matches("xyz"), 0);
    }

    #[test]
    fn test_self_match_counts_every_ngram() {
        let query = "abcdefghij";
        let automaton = AhoCorasick::from_ngrams(query, 4);
        assert_eq!(automaton.count_matches(query), query.len() - 4 + 1);
    }

    #[test]
    fn test_duplicate_ngrams_count_twice() {
        let automaton = AhoCorasick::from_ngrams("aaaaa", 4);
        // "aaaa" given twice, found twice in "aaaaa"
        assert_eq!(automaton.count_matches("aaaaa"), 4);
    }

    #[test]
    fn test_failure_links_resume_matching() {
        let automaton = AhoCorasick::from_ngrams("abcd", 4);
        assert_eq!(automaton.count_matches("abcabcd"), 1);
        assert_eq!(automaton.count_matches("abcabce"), 0);
    }

    #[test]
    fn test_short_query_builds_empty_automaton() {
        let automaton = AhoCorasick::from_ngrams("abc", 4);
        assert!(automaton.is_empty());
        assert_eq!(automaton.len(), 1);
        assert_eq!(automaton.count_matches("abcabc"), 0);
    }
}
