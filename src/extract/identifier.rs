//! Bare identifier extraction: DOIs, PMIDs, arXiv ids and ISBNs that appear
//! without a full URL, typically copied from PDFs or reference lists.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CitationFragment, FragmentType};

static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(10\.\d{4,}/[^\s<>"')\],;]+)"#).expect("valid DOI regex"));

static PMID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPMID:?\s*(\d{6,9})\b").expect("valid PMID regex"));

// Modern "2301.12345" form plus the legacy "hep-th/9901001" slash form.
static ARXIV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\barXiv:?\s*(\d{4}\.\d{4,5}(?:v\d+)?|[a-z-]+/\d{7})\b")
        .expect("valid arXiv regex")
});

static ISBN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bISBN[-:]?\s*((?:\d[-\s]?){9}[\dXx]|(?:\d[-\s]?){12}\d)\b")
        .expect("valid ISBN regex")
});

/// Extract all bare identifiers from `text`, sorted by position.
///
/// The canonical key is the cleaned identifier (trailing punctuation
/// stripped from DOIs, hyphens and spaces removed from ISBNs); the span
/// covers the full matched text including any `PMID:` style label so the
/// whole thing can be replaced later.
pub fn extract_identifiers(text: &str) -> Vec<CitationFragment> {
    let mut results = Vec::new();

    for m in DOI_PATTERN.captures_iter(text) {
        let whole = m.get(0).expect("match");
        let doi = m[1].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"']);
        let span = whole.start()..whole.start() + doi.len();
        results.push(CitationFragment::new(
            &text[span.clone()],
            FragmentType::Doi,
            span,
            doi,
        ));
    }

    for m in PMID_PATTERN.captures_iter(text) {
        let whole = m.get(0).expect("match");
        results.push(CitationFragment::new(
            whole.as_str(),
            FragmentType::Pmid,
            whole.range(),
            &m[1],
        ));
    }

    for m in ARXIV_PATTERN.captures_iter(text) {
        let whole = m.get(0).expect("match");
        results.push(CitationFragment::new(
            whole.as_str(),
            FragmentType::Arxiv,
            whole.range(),
            &m[1],
        ));
    }

    for m in ISBN_PATTERN.captures_iter(text) {
        let whole = m.get(0).expect("match");
        let isbn: String = m[1].chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        results.push(CitationFragment::new(
            whole.as_str(),
            FragmentType::Isbn,
            whole.range(),
            isbn,
        ));
    }

    results.sort_by_key(|f| f.position_start);
    results
}

/// Whether `doi` is a well-formed DOI.
pub fn is_valid_doi(doi: &str) -> bool {
    DOI_PATTERN
        .find(doi)
        .is_some_and(|m| m.start() == 0 && m.end() == doi.len())
}

/// Whether `pmid` is a bare 6-9 digit PMID.
pub fn is_valid_pmid(pmid: &str) -> bool {
    pmid.len() >= 6 && pmid.len() <= 9 && pmid.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_doi() {
        let text = "The DOI is 10.1086/226147 for the Coleman paper.";
        let ids = extract_identifiers(text);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].fragment_type, FragmentType::Doi);
        assert_eq!(ids[0].canonical_key, "10.1086/226147");
        assert_eq!(&text[ids[0].span()], "10.1086/226147");
    }

    #[test]
    fn test_doi_trailing_punctuation_stripped() {
        let ids = extract_identifiers("Another DOI: 10.1177/0003122410395370.");
        assert_eq!(ids[0].canonical_key, "10.1177/0003122410395370");
    }

    #[test]
    fn test_extract_pmid() {
        let ids = extract_identifiers("See PMID: 12345678 for the trial.");
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].fragment_type, FragmentType::Pmid);
        assert_eq!(ids[0].canonical_key, "12345678");
        assert_eq!(ids[0].raw_text, "PMID: 12345678");
    }

    #[test]
    fn test_bare_number_is_not_a_pmid() {
        // Without the label a 6-9 digit run is just a number.
        assert!(extract_identifiers("the year 1234567 was long ago").is_empty());
    }

    #[test]
    fn test_extract_arxiv_both_forms() {
        let ids =
            extract_identifiers("The preprint is arXiv:2301.12345 or arXiv: hep-th/9901001.");
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].canonical_key, "2301.12345");
        assert_eq!(ids[1].canonical_key, "hep-th/9901001");
        assert!(ids.iter().all(|f| f.fragment_type == FragmentType::Arxiv));
    }

    #[test]
    fn test_extract_isbn_normalized() {
        let ids = extract_identifiers("The book ISBN is 978-0-14-028329-7.");
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].fragment_type, FragmentType::Isbn);
        assert_eq!(ids[0].canonical_key, "9780140283297");
    }

    #[test]
    fn test_isbn10_with_check_x() {
        let ids = extract_identifiers("ISBN: 0-19-852663-X");
        assert_eq!(ids[0].canonical_key, "019852663X");
    }

    #[test]
    fn test_validators() {
        assert!(is_valid_doi("10.1086/226147"));
        assert!(!is_valid_doi("doi-ish"));
        assert!(is_valid_pmid("12345678"));
        assert!(!is_valid_pmid("123"));
        assert!(!is_valid_pmid("12a45678"));
    }
}
