//! Author-position scoring for ambiguous fragments.
//!
//! Search engines return candidates ranked by relevance to the whole query
//! string, which is a poor proxy for "is this the paper by the author the
//! writer named". The scorer re-ranks on a single signal: where the query
//! author's surname sits in each candidate's author list.

use std::sync::LazyLock;

use std::collections::HashSet;

use crate::models::ResolvedMetadata;

/// Score when the candidate's sole author matches the query surname.
pub const SCORE_SOLE_AUTHOR: f64 = 1.0;
/// First of several authors.
pub const SCORE_FIRST_AUTHOR: f64 = 0.9;
/// Second or third author.
pub const SCORE_EARLY_AUTHOR: f64 = 0.7;
/// Fourth author or later.
pub const SCORE_LATE_AUTHOR: f64 = 0.3;
/// Surname not found in the author list at all.
pub const SCORE_NOT_FOUND: f64 = 0.1;
/// No surname could be extracted from the query; position is unknowable.
pub const SCORE_NO_SURNAME: f64 = 0.5;

/// Given names so common they are never the surname the writer meant.
/// "Eric Caplan trains brains" must yield "caplan", not "eric".
static COMMON_FIRST_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "james", "john", "robert", "michael", "william", "david", "richard", "joseph",
        "thomas", "charles", "christopher", "daniel", "matthew", "anthony", "mark",
        "donald", "steven", "paul", "andrew", "joshua", "kenneth", "kevin", "brian",
        "george", "edward", "ronald", "timothy", "jason", "jeffrey", "ryan", "jacob",
        "gary", "nicholas", "eric", "jonathan", "stephen", "larry", "justin", "scott",
        "brandon", "benjamin", "samuel", "frank", "gregory", "raymond", "alexander",
        "patrick", "jack", "dennis", "jerry", "mary", "patricia", "jennifer", "linda",
        "elizabeth", "barbara", "susan", "jessica", "sarah", "karen", "nancy", "lisa",
        "margaret", "betty", "sandra", "ashley", "dorothy", "kimberly", "emily",
        "donna", "michelle", "carol", "amanda", "melissa", "deborah", "stephanie",
        "rebecca", "laura", "sharon", "cynthia", "kathleen", "amy", "shirley", "anna",
        "angela", "helen", "ruth", "brenda", "pamela", "nicole", "katherine",
        "samantha", "christine", "emma", "catherine", "virginia", "rachel", "carolyn",
        "janet", "maria", "heather", "diane", "julie", "joyce", "victoria", "kelly",
        "christina", "joan", "evelyn", "lauren", "judith", "olivia", "frances",
    ]
    .into_iter()
    .collect()
});

/// Query words that are never names: verbs, topic nouns, connectives that
/// show up in keyword-style fragments.
static SKIP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "and", "for", "with", "about", "from", "into", "over", "under",
        "trains", "train", "training", "brains", "brain", "mind", "minds", "body",
        "study", "studies", "paper", "book", "work", "works", "theory", "model",
        "history", "science", "social", "human", "nature", "culture", "society",
        "politics", "economics", "psychology", "philosophy", "analysis", "essay",
        "review", "guide", "introduction", "handbook", "volume", "edition",
    ]
    .into_iter()
    .collect()
});

/// Extract the most likely author surname from a free-text query.
///
/// Only a capitalized word of at least three letters can be a surname;
/// lowercase prose never qualifies. Of the candidates, the first that is
/// neither a common given name nor a skip word wins, lowercased for
/// matching. Returns `None` when nothing qualifies, which scores as
/// [`SCORE_NO_SURNAME`] rather than penalizing every candidate.
pub fn extract_query_author(query: &str) -> Option<String> {
    query
        .split_whitespace()
        .filter_map(|w| {
            let word = w.trim_matches(|c: char| !c.is_alphabetic());
            if word.chars().count() < 3
                || !word.chars().all(|c| c.is_alphabetic())
                || !word.chars().next().is_some_and(char::is_uppercase)
            {
                return None;
            }
            Some(word.to_lowercase())
        })
        .find(|w| !COMMON_FIRST_NAMES.contains(w.as_str()) && !SKIP_WORDS.contains(w.as_str()))
}

/// Score one candidate by the position of `surname` in its author list.
pub fn score_author_position(surname: Option<&str>, candidate: &ResolvedMetadata) -> f64 {
    let Some(surname) = surname else {
        return SCORE_NO_SURNAME;
    };
    let surname = surname.to_lowercase();

    let position = candidate.authors.iter().position(|author| {
        author
            .to_lowercase()
            .split_whitespace()
            .any(|part| part.trim_matches(|c: char| !c.is_alphabetic()) == surname)
    });

    match position {
        Some(0) if candidate.authors.len() == 1 => SCORE_SOLE_AUTHOR,
        Some(0) => SCORE_FIRST_AUTHOR,
        Some(1) | Some(2) => SCORE_EARLY_AUTHOR,
        Some(_) => SCORE_LATE_AUTHOR,
        None => SCORE_NOT_FOUND,
    }
}

/// Score a whole candidate list and return the best candidate with its
/// score, preferring earlier candidates on ties (upstream relevance order).
pub fn best_by_author_position<'a>(
    surname: Option<&str>,
    candidates: &'a [ResolvedMetadata],
) -> Option<(&'a ResolvedMetadata, f64)> {
    let mut best: Option<(&ResolvedMetadata, f64)> = None;
    for c in candidates {
        let score = score_author_position(surname, c);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((c, score));
        }
    }
    best
}
