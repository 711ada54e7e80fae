//! Local extractive summarizer used when no model could be loaded.
//!
//! Sentences are scored by the average corpus frequency of their content
//! words; the best ones are kept (in document order) until the summary
//! reaches `min_length` words without exceeding `max_length`.

use super::GenerationParams;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static SENTENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^.!?]+(?:[.!?]+["'”’)\]]*|$)"#).expect("static regex")
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("static regex"));

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "it's", "its", "just", "more",
    "most", "new", "not", "of", "on", "one", "or", "our", "out", "over", "said", "she", "so",
    "some", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "to", "up", "was", "we", "were", "what", "when", "which", "who", "will", "with", "would",
    "you",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractivePipeline;

struct Sentence<'a> {
    text: &'a str,
    words: usize,
    score: f64,
}

impl ExtractivePipeline {
    pub fn summarize(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Err(Error::Generation("no sentences to extract".to_string()));
        }

        let frequencies = word_frequencies(text);
        let scored: Vec<Sentence<'_>> = sentences
            .into_iter()
            .map(|s| {
                let content: Vec<String> = content_words(s).collect();
                let score = if content.is_empty() {
                    0.0
                } else {
                    content
                        .iter()
                        .map(|w| f64::from(frequencies.get(w).copied().unwrap_or(0)))
                        .sum::<f64>()
                        / content.len() as f64
                };
                Sentence {
                    text: s,
                    words: s.split_whitespace().count(),
                    score,
                }
            })
            .collect();

        let mut ranked: Vec<usize> = (0..scored.len()).collect();
        // Stable sort: equal scores keep document order.
        ranked.sort_by(|&a, &b| scored[b].score.total_cmp(&scored[a].score));

        let mut chosen = Vec::new();
        let mut total = 0;
        for idx in ranked.iter().copied() {
            if total >= params.min_length && !chosen.is_empty() {
                break;
            }
            if total + scored[idx].words <= params.max_length {
                total += scored[idx].words;
                chosen.push(idx);
            }
        }

        if chosen.is_empty() {
            // Even the best sentence is too long: keep its head.
            let best = &scored[ranked[0]];
            return Ok(best
                .text
                .split_whitespace()
                .take(params.max_length)
                .collect::<Vec<_>>()
                .join(" "));
        }

        chosen.sort_unstable();
        Ok(chosen
            .into_iter()
            .map(|i| scored[i].text)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| WORD.is_match(s))
        .collect()
}

fn content_words(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !STOPWORD_SET.contains(w.as_str()))
}

fn word_frequencies(text: &str) -> HashMap<String, u32> {
    let mut freq = HashMap::new();
    for word in content_words(text) {
        *freq.entry(word).or_insert(0) += 1;
    }
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "OpenAI released a new reasoning model today. \
        The reasoning model beats earlier models on math benchmarks. \
        Lunch was served at noon. \
        Researchers say the reasoning model still struggles with long documents.";

    #[test]
    fn test_split_sentences_keeps_trailing_fragment() {
        let sentences = split_sentences("First one. Second one! Third without a stop");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third without a stop"]);
    }

    #[test]
    fn test_prefers_topical_sentences_in_document_order() {
        let summary = ExtractivePipeline
            .summarize(TEXT, &GenerationParams::new(20, 30))
            .unwrap();

        assert!(!summary.contains("Lunch"));
        let first = summary.find("beats").unwrap();
        let second = summary.find("struggles").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_respects_max_length() {
        let summary = ExtractivePipeline
            .summarize(TEXT, &GenerationParams::new(50, 12))
            .unwrap();
        assert!(summary.split_whitespace().count() <= 12);
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_overlong_single_sentence_is_cut() {
        let text = vec!["token"; 40].join(" ");
        let summary = ExtractivePipeline
            .summarize(&text, &GenerationParams::new(5, 10))
            .unwrap();
        assert_eq!(summary.split_whitespace().count(), 10);
    }

    #[test]
    fn test_punctuation_only_is_an_error() {
        let err = ExtractivePipeline
            .summarize("... !!! ???", &GenerationParams::new(5, 10))
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
