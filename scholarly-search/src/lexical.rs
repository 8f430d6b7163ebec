//! Deterministic tokenization and TF-IDF scoring for the lexical branch of
//! hybrid search (§4.A step 3).

use std::collections::{HashMap, HashSet};

/// Lower-case, punctuation-stripped whitespace tokenization. Deterministic
//  and stable across calls, matching the §3 Chunk invariant that
//  `lexical_index` is derived from `text` deterministically.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score `query_tokens` against each document's token list with a standard
/// TF-IDF formulation: `tf(term, doc) * ln((1 + N) / (1 + df(term)))`,
/// where `N` is the number of candidate documents. Returns one score per
/// document, in the same order as `documents`.
#[must_use]
pub fn tf_idf_scores(query_tokens: &[String], documents: &[Vec<String>]) -> Vec<f32> {
    let n = documents.len();
    if n == 0 {
        return Vec::new();
    }

    let query_set: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for doc in documents {
        let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
        for term in unique {
            if query_set.contains(term) {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }
    }

    documents
        .iter()
        .map(|doc| {
            if doc.is_empty() {
                return 0.0;
            }
            let mut term_freq: HashMap<&str, usize> = HashMap::new();
            for term in doc {
                *term_freq.entry(term.as_str()).or_insert(0) += 1;
            }
            let doc_len = doc.len() as f32;
            query_set
                .iter()
                .map(|term| {
                    let tf = *term_freq.get(term).unwrap_or(&0) as f32 / doc_len;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let df = *document_frequency.get(term).unwrap_or(&0) as f32;
                    let idf = ((1.0 + n as f32) / (1.0 + df)).ln();
                    tf * idf
                })
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_is_deterministic_and_lowercases() {
        let a = tokenize("Attention Is All You Need!");
        let b = tokenize("attention is all you need");
        assert_eq!(a, b);
    }

    #[test]
    fn rarer_terms_score_higher() {
        let query = tokenize("transformer");
        let docs = vec![
            tokenize("transformer transformer transformer architectures"),
            tokenize("transformer networks are common"),
            tokenize("recurrent networks are common too"),
        ];
        let scores = tf_idf_scores(&query, &docs);
        assert!(scores[0] > scores[2]);
        assert_eq!(scores[2], 0.0);
    }
}
