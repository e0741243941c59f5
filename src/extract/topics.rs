//! Document topic extraction, used to give the AI-assisted layer context
//! about what the surrounding document is about.

use std::collections::HashMap;

/// Generic English stop words, lowercase.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see", "two",
    "way", "who", "did", "its", "let", "she", "too", "use", "that", "with", "have", "this",
    "will", "your", "from", "they", "know", "want", "been", "good", "much", "some", "time",
    "very", "when", "come", "here", "just", "like", "long", "make", "many", "more", "most",
    "over", "such", "take", "than", "them", "well", "were", "what", "which", "their", "would",
    "there", "could", "other", "after", "first", "these", "about", "where", "being", "every",
    "between", "because", "through", "during", "before", "should", "however", "therefore",
    "also", "into", "only", "then", "each", "while", "both", "those", "same", "another",
];

/// Words common in any academic document regardless of field. Keeping them
/// would make every context string look alike.
const ACADEMIC_STOP_WORDS: &[&str] = &[
    "study", "studies", "research", "paper", "article", "chapter", "section", "figure",
    "table", "analysis", "method", "methods", "results", "discussion", "conclusion",
    "abstract", "introduction", "literature", "review", "data", "findings", "evidence",
    "approach", "theory", "model", "framework", "significant", "however", "therefore",
    "university", "press", "journal", "volume", "page", "pages", "author", "authors",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word) || ACADEMIC_STOP_WORDS.contains(&word)
}

/// Extract up to `limit` recurring topic words from a document.
///
/// A word counts as a topic candidate when it is at least four characters,
/// alphabetic, not a stop word, and appears at least three times. Results
/// are ordered by frequency, ties broken alphabetically so output is stable.
pub fn extract_topics(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        let word = raw.to_lowercase();
        if word.len() >= 4 && word.chars().all(|c| c.is_alphabetic()) && !is_stop_word(&word) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut topics: Vec<(String, usize)> =
        counts.into_iter().filter(|(_, n)| *n >= 3).collect();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    topics.truncate(limit);
    topics.into_iter().map(|(w, _)| w).collect()
}

/// Build the context phrase handed to the AI layer, e.g.
/// `"an academic document about psychology, neurology"`.
pub fn format_context_string(topics: &[String]) -> Option<String> {
    if topics.is_empty() {
        return None;
    }
    Some(format!("an academic document about {}", topics.join(", ")))
}
