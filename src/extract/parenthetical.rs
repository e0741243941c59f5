//! Parenthetical citation extraction: `(Smith, 2020)`, multi-citation
//! groups, narrative `Smith (2020)` forms, and messy keyword parentheticals.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CitationFragment, FragmentType, SubCitation};

static PAREN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*)\)").expect("valid paren regex"));

// Case-sensitive on purpose: a capitalized lead token is what separates an
// author name from prose like "(caplan trains spain)".
static STANDARD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<authors>[A-Z][^;]*?),\s*(?P<year>\d{4}[a-z]?)\b(?:,\s*(?P<page>pp?\.?\s*\d+(?:\s*[-–]\s*\d+)?))?$",
    )
    .expect("valid standard citation regex")
});

static NARRATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<author>[A-Z][A-Za-z'\-]+(?:\s+(?:et\s+al\.?|(?:and|&)\s+[A-Z][A-Za-z'\-]+))?)\s+\((?P<year>\d{4}[a-z]?)\)",
    )
    .expect("valid narrative citation regex")
});

/// Lead tokens that mark a parenthetical as prose, not a citation.
const PROSE_MARKERS: &[&str] = &[
    "e.g.", "e.g,", "i.e.", "i.e,", "see ", "cf.", "cf ", "but see", "etc.", "viz.",
    "for example", "that is", "namely",
];

/// Split an author string like `Smith, Jones & Lee` or `Smith et al.` into
/// individual surnames-with-given-names, in order.
pub fn parse_author_list(authors: &str) -> Vec<String> {
    let trimmed = authors.trim();

    // "et al." marks truncation; only the lead author is recoverable.
    if let Some(idx) = trimmed.find("et al") {
        let lead = trimmed[..idx].trim_end_matches([',', ' ']).trim();
        if !lead.is_empty() {
            return vec![lead.to_string()];
        }
        return Vec::new();
    }

    trimmed
        .replace(" and ", " & ")
        .split(['&', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract parenthetical and narrative citations from `text`, sorted by
/// position.
///
/// Standard `(Author, Year)` forms become [`FragmentType::AuthorYear`]
/// fragments with author and year hints. Multi-citation groups separated by
/// semicolons keep the full parenthetical span but decompose into
/// [`SubCitation`]s. Anything left that still looks like searchable content
/// becomes a [`FragmentType::Keywords`] fragment.
pub fn extract_parentheticals(text: &str) -> Vec<CitationFragment> {
    let mut results: Vec<CitationFragment> = Vec::new();

    for m in NARRATIVE_PATTERN.captures_iter(text) {
        let whole = m.get(0).expect("match");
        let author = m.name("author").expect("author").as_str();
        let year = m.name("year").expect("year").as_str();

        let mut frag = CitationFragment::new(
            whole.as_str(),
            FragmentType::AuthorYear,
            whole.range(),
            format!("({author}, {year})"),
        );
        frag.author_hint = parse_author_list(author).into_iter().next();
        frag.year_hint = Some(year.to_string());
        frag.narrative = true;
        results.push(frag);
    }

    for m in PAREN_PATTERN.captures_iter(text) {
        let whole = m.get(0).expect("match");
        if results.iter().any(|f| {
            f.position_start < whole.end() && whole.start() < f.position_end
        }) {
            continue;
        }

        let inner = m[1].trim();
        if inner.is_empty() {
            continue;
        }

        if let Some(frag) = parse_multi_citation(whole.as_str(), whole.range(), inner) {
            results.push(frag);
            continue;
        }

        if let Some(caps) = STANDARD_PATTERN.captures(inner) {
            let authors = caps.name("authors").expect("authors").as_str();
            let year = caps.name("year").expect("year").as_str();

            let mut frag = CitationFragment::new(
                whole.as_str(),
                FragmentType::AuthorYear,
                whole.range(),
                format!("({authors}, {year})"),
            );
            frag.author_hint = parse_author_list(authors).into_iter().next();
            frag.year_hint = Some(year.to_string());
            frag.page_hint = caps.name("page").map(|p| p.as_str().to_string());
            results.push(frag);
            continue;
        }

        if looks_like_keywords(inner) {
            results.push(CitationFragment::new(
                whole.as_str(),
                FragmentType::Keywords,
                whole.range(),
                inner,
            ));
        }
    }

    results.sort_by_key(|f| f.position_start);
    results
}

/// Decompose `(Coleman, 1988; Weber, 1905)` into sub-citations. Returns
/// `None` unless at least two segments parse as standard citations.
fn parse_multi_citation(
    raw: &str,
    span: std::ops::Range<usize>,
    inner: &str,
) -> Option<CitationFragment> {
    if !inner.contains(';') {
        return None;
    }

    let subs: Vec<SubCitation> = inner
        .split(';')
        .map(str::trim)
        .filter_map(|segment| {
            let caps = STANDARD_PATTERN.captures(segment)?;
            let author = caps.name("authors")?.as_str().to_string();
            let year = caps.name("year")?.as_str().to_string();
            let citation_text = format!("({author}, {year})");
            Some(SubCitation { author, year, citation_text })
        })
        .collect();

    if subs.len() < 2 {
        return None;
    }

    let mut frag = CitationFragment::new(raw, FragmentType::AuthorYear, span, raw);
    frag.author_hint = parse_author_list(&subs[0].author).into_iter().next();
    frag.year_hint = Some(subs[0].year.clone());
    frag.sub_fragments = subs;
    Some(frag)
}

/// Whether a parenthetical that failed citation parsing still carries
/// enough searchable content to try as keywords.
fn looks_like_keywords(inner: &str) -> bool {
    let lower = inner.to_lowercase();
    if PROSE_MARKERS.iter().any(|m| lower.starts_with(m)) {
        return false;
    }

    let words: Vec<&str> = inner.split_whitespace().collect();
    words.len() >= 2 && words.iter().any(|w| w.len() >= 3 && w.chars().any(|c| c.is_alphabetic()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_citation() {
        let text = "Social capital matters (Coleman, 1988).";
        let frags = extract_parentheticals(text);

        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].fragment_type, FragmentType::AuthorYear);
        assert_eq!(frags[0].canonical_key, "(Coleman, 1988)");
        assert_eq!(frags[0].author_hint.as_deref(), Some("Coleman"));
        assert_eq!(frags[0].year_hint.as_deref(), Some("1988"));
        assert!(!frags[0].narrative);
        assert_eq!(&text[frags[0].span()], "(Coleman, 1988)");
    }

    #[test]
    fn test_standard_with_page() {
        let frags = extract_parentheticals("As shown (Smith, 2020, p. 95).");
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].page_hint.as_deref(), Some("p. 95"));
        assert_eq!(frags[0].canonical_key, "(Smith, 2020)");
    }

    #[test]
    fn test_year_suffix() {
        let frags = extract_parentheticals("Twice that year (Putnam, 2000a).");
        assert_eq!(frags[0].year_hint.as_deref(), Some("2000a"));
    }

    #[test]
    fn test_multi_citation_decomposed() {
        let frags = extract_parentheticals("Classic works (Coleman, 1988; Weber, 1905) agree.");
        assert_eq!(frags.len(), 1);

        let frag = &frags[0];
        assert_eq!(frag.sub_fragments.len(), 2);
        assert_eq!(frag.sub_fragments[0].citation_text, "(Coleman, 1988)");
        assert_eq!(frag.sub_fragments[1].citation_text, "(Weber, 1905)");
        assert_eq!(frag.raw_text, "(Coleman, 1988; Weber, 1905)");
    }

    #[test]
    fn test_narrative_citation() {
        let text = "Coleman (1988) argued that social capital matters.";
        let frags = extract_parentheticals(text);

        assert_eq!(frags.len(), 1);
        assert!(frags[0].narrative);
        assert_eq!(frags[0].canonical_key, "(Coleman, 1988)");
        assert_eq!(frags[0].raw_text, "Coleman (1988)");
    }

    #[test]
    fn test_narrative_et_al() {
        let frags = extract_parentheticals("Smith et al. (2019) measured it.");
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].author_hint.as_deref(), Some("Smith"));
        assert_eq!(frags[0].year_hint.as_deref(), Some("2019"));
    }

    #[test]
    fn test_messy_parenthetical_becomes_keywords() {
        let frags = extract_parentheticals("Some argue (caplan trains spain) oddly.");
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].fragment_type, FragmentType::Keywords);
        assert_eq!(frags[0].canonical_key, "caplan trains spain");
    }

    #[test]
    fn test_prose_markers_skipped() {
        assert!(extract_parentheticals("Fruits (e.g. apples and pears) are good.").is_empty());
        assert!(extract_parentheticals("The method (i.e. the second one) works.").is_empty());
        assert!(extract_parentheticals("Related (see the appendix for details).").is_empty());
    }

    #[test]
    fn test_bare_year_not_a_citation() {
        // A lone year in parens has no author to search by.
        assert!(extract_parentheticals("It happened later (1988).").is_empty());
    }

    #[test]
    fn test_parse_author_list() {
        assert_eq!(parse_author_list("Smith"), vec!["Smith"]);
        assert_eq!(parse_author_list("Smith & Jones"), vec!["Smith", "Jones"]);
        assert_eq!(parse_author_list("Smith and Jones"), vec!["Smith", "Jones"]);
        assert_eq!(parse_author_list("Smith, Jones & Lee"), vec!["Smith", "Jones", "Lee"]);
        assert_eq!(parse_author_list("Smith et al."), vec!["Smith"]);
    }

    #[test]
    fn test_ampersand_citation() {
        let frags = extract_parentheticals("Jointly shown (Smith & Jones, 2021).");
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].canonical_key, "(Smith & Jones, 2021)");
        assert_eq!(frags[0].author_hint.as_deref(), Some("Smith"));
    }
}
