//! Fragment extraction: pull citation candidates out of free text with
//! exact character spans.
//!
//! Three extractors run in a fixed priority order: URLs, then bare
//! identifiers, then parentheticals. A span claimed by an earlier
//! extractor is never
//! reclaimed by a later one. The catch-all parenthetical pass runs last so
//! that `(Smith, 2020)` is never double-reported as both an author-year
//! citation and a keyword guess.

mod identifier;
mod parenthetical;
mod topics;
mod url;

pub use identifier::extract_identifiers;
pub use parenthetical::{extract_parentheticals, parse_author_list};
pub use topics::{extract_topics, format_context_string};
pub use url::{clean_url, extract_urls};

use crate::models::CitationFragment;

/// Extract every citation candidate from `text`, sorted by position.
///
/// URLs are claimed first (the most common real-world input), then bare
/// identifiers, then parentheticals. Later extractors skip any span that
/// overlaps an earlier claim.
pub fn extract_fragments(text: &str) -> Vec<CitationFragment> {
    let mut fragments: Vec<CitationFragment> = Vec::new();

    for frag in extract_urls(text) {
        if !claimed(&fragments, &frag) {
            fragments.push(frag);
        }
    }

    for frag in extract_identifiers(text) {
        if !claimed(&fragments, &frag) {
            fragments.push(frag);
        }
    }

    for frag in extract_parentheticals(text) {
        if !claimed(&fragments, &frag) {
            fragments.push(frag);
        }
    }

    fragments.sort_by_key(|f| f.position_start);
    fragments
}

/// Deduplicate fragments by canonical key, keeping the first occurrence.
/// Multiple occurrences of `(Coleman, 1988)` only need one lookup.
pub fn unique_fragments(fragments: &[CitationFragment]) -> Vec<CitationFragment> {
    let mut seen = std::collections::HashSet::new();
    fragments
        .iter()
        .filter(|f| seen.insert((f.fragment_type, f.canonical_key.clone())))
        .cloned()
        .collect()
}

fn claimed(fragments: &[CitationFragment], candidate: &CitationFragment) -> bool {
    fragments.iter().any(|f| f.overlaps(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FragmentType;

    #[test]
    fn test_url_and_parenthetical_do_not_overlap() {
        let text = "See https://doi.org/10.1/x (Smith, 2020).";
        let fragments = extract_fragments(text);

        assert_eq!(fragments.len(), 2);
        let url = &fragments[0];
        let paren = &fragments[1];
        assert_eq!(url.fragment_type, FragmentType::Url);
        assert_eq!(paren.fragment_type, FragmentType::AuthorYear);
        assert!(!url.overlaps(paren));
        assert_eq!(&text[paren.span()], "(Smith, 2020)");
    }

    #[test]
    fn test_identifier_not_reclaimed_from_url() {
        // The DOI inside the URL must not be reported a second time as a
        // bare identifier.
        let text = "At https://doi.org/10.1086/226147 you will find it.";
        let fragments = extract_fragments(text);

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].fragment_type, FragmentType::Url);
    }

    #[test]
    fn test_mixed_document() {
        let text = "According to (Coleman, 1988), capital matters. The DOI is \
                    10.1086/226147 and a draft sits at https://example.com/draft. \
                    Some argue (caplan trains spain) that transport matters.";
        let fragments = extract_fragments(text);

        let types: Vec<FragmentType> = fragments.iter().map(|f| f.fragment_type).collect();
        assert!(types.contains(&FragmentType::AuthorYear));
        assert!(types.contains(&FragmentType::Doi));
        assert!(types.contains(&FragmentType::Url));
        assert!(types.contains(&FragmentType::Keywords));

        // Sorted by position.
        let mut starts: Vec<usize> = fragments.iter().map(|f| f.position_start).collect();
        let sorted = starts.clone();
        starts.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_unique_fragments() {
        let text = "(Coleman, 1988) said so, and later (Coleman, 1988) repeated it.";
        let fragments = extract_fragments(text);
        assert_eq!(fragments.len(), 2);
        assert_eq!(unique_fragments(&fragments).len(), 1);
    }
}
