//! Fragment classification and refinement.
//!
//! Extraction assigns a provisional type from surface shape alone; this pass
//! looks deeper. URLs that embed a DOI, PMID or arXiv id are reclassified to
//! the deterministic type so they take the fast lookup path, and text that
//! reads like a legal citation is routed to the legal type.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::{CitationFragment, FragmentType};

static RAW_DOI_IN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"10\.\d{4,}/[^\s?#]+").expect("valid DOI-in-path regex"));

static PUBMED_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{6,9})/?$").expect("valid PubMed tail regex"));

static ARXIV_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:abs|pdf)/(\d{4}\.\d{4,5}|[a-z-]+/\d{7})(?:v\d+)?(?:\.pdf)?$")
        .expect("valid arXiv path regex")
});

// "Brown v. Board of Education" style case names.
static CASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][A-Za-z'.\-]+(?:\s+[A-Za-z'.\-]+)*\s+v\.?\s+[A-Z][A-Za-z'.\-]+")
        .expect("valid case name regex")
});

// Reporter citations: "347 U.S. 483", "98 F.3d 1512", "112 S. Ct. 2791".
static REPORTER_CITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s+(?:U\.S\.|S\.\s?Ct\.|F\.(?:\s?Supp\.)?(?:\s?\dd)?|L\.\s?Ed\.)\s*\d+")
        .expect("valid reporter citation regex")
});

/// Refine a fragment's provisional type.
///
/// Deterministic types pass through unchanged. URLs are inspected for an
/// embedded identifier; author-year and keyword fragments are checked for
/// legal-citation shape. The canonical key is rewritten when the type
/// changes so lookup always receives the bare identifier.
pub fn classify_fragment(mut fragment: CitationFragment) -> CitationFragment {
    match fragment.fragment_type {
        FragmentType::Url => {
            if let Some((kind, key)) = identifier_from_url(&fragment.canonical_key) {
                fragment.fragment_type = kind;
                fragment.canonical_key = key;
            }
        }
        FragmentType::AuthorYear | FragmentType::Keywords => {
            if is_legal_citation(&fragment.raw_text) {
                fragment.fragment_type = FragmentType::Legal;
            }
        }
        _ => {}
    }
    fragment
}

/// Pull a deterministic identifier out of a URL, if one is embedded.
pub fn identifier_from_url(raw_url: &str) -> Option<(FragmentType, String)> {
    let parsed = Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let path = parsed.path();

    if host == "doi.org" || host.ends_with(".doi.org") {
        let doi = path.trim_start_matches('/');
        let doi = urlencoding::decode(doi).ok()?;
        let doi = doi.trim_end_matches(['.', ',', ';']);
        if !doi.is_empty() {
            return Some((FragmentType::Doi, doi.to_string()));
        }
    }

    if host.contains("arxiv.org") {
        if let Some(caps) = ARXIV_PATH.captures(path) {
            return Some((FragmentType::Arxiv, caps[1].to_string()));
        }
    }

    if host == "pubmed.ncbi.nlm.nih.gov"
        || (host.contains("ncbi.nlm.nih.gov") && path.contains("/pubmed"))
    {
        if let Some(caps) = PUBMED_TAIL.captures(path) {
            return Some((FragmentType::Pmid, caps[1].to_string()));
        }
    }

    // Publisher URLs often carry the DOI verbatim in the path.
    if let Some(m) = RAW_DOI_IN_PATH.find(path) {
        let doi = m.as_str().trim_end_matches(['.', ',', ';']);
        return Some((FragmentType::Doi, doi.to_string()));
    }

    None
}

/// Whether text reads like a legal citation: a case name or a reporter cite.
pub fn is_legal_citation(text: &str) -> bool {
    CASE_NAME.is_match(text) || REPORTER_CITE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_fragment(url: &str) -> CitationFragment {
        CitationFragment::new(url, FragmentType::Url, 0..url.len(), url)
    }

    #[test]
    fn test_doi_org_url_reclassified() {
        let frag = classify_fragment(url_fragment("https://doi.org/10.1086/226147"));
        assert_eq!(frag.fragment_type, FragmentType::Doi);
        assert_eq!(frag.canonical_key, "10.1086/226147");
    }

    #[test]
    fn test_doi_org_url_percent_encoded() {
        let frag = classify_fragment(url_fragment("https://doi.org/10.1002/%28SICI%291097"));
        assert_eq!(frag.fragment_type, FragmentType::Doi);
        assert_eq!(frag.canonical_key, "10.1002/(SICI)1097");
    }

    #[test]
    fn test_publisher_url_with_embedded_doi() {
        let frag = classify_fragment(url_fragment(
            "https://link.springer.com/article/10.1007/s11229-020-02724-x",
        ));
        assert_eq!(frag.fragment_type, FragmentType::Doi);
        assert_eq!(frag.canonical_key, "10.1007/s11229-020-02724-x");
    }

    #[test]
    fn test_pubmed_url_reclassified() {
        let frag = classify_fragment(url_fragment("https://pubmed.ncbi.nlm.nih.gov/12345678/"));
        assert_eq!(frag.fragment_type, FragmentType::Pmid);
        assert_eq!(frag.canonical_key, "12345678");
    }

    #[test]
    fn test_arxiv_url_version_stripped() {
        let frag = classify_fragment(url_fragment("https://arxiv.org/abs/2301.12345v2"));
        assert_eq!(frag.fragment_type, FragmentType::Arxiv);
        assert_eq!(frag.canonical_key, "2301.12345");

        let frag = classify_fragment(url_fragment("https://arxiv.org/pdf/hep-th/9901001.pdf"));
        assert_eq!(frag.fragment_type, FragmentType::Arxiv);
        assert_eq!(frag.canonical_key, "hep-th/9901001");
    }

    #[test]
    fn test_plain_url_unchanged() {
        let frag = classify_fragment(url_fragment("https://example.com/blog/post"));
        assert_eq!(frag.fragment_type, FragmentType::Url);
    }

    #[test]
    fn test_legal_case_name() {
        assert!(is_legal_citation("Brown v. Board of Education"));
        assert!(is_legal_citation("Roe v Wade"));
        assert!(!is_legal_citation("(Coleman, 1988)"));
    }

    #[test]
    fn test_reporter_citation() {
        assert!(is_legal_citation("347 U.S. 483"));
        assert!(is_legal_citation("112 S. Ct. 2791"));
    }

    #[test]
    fn test_keywords_with_case_name_reclassified() {
        let mut frag = CitationFragment::new(
            "(Brown v. Board of Education, 1954)",
            FragmentType::Keywords,
            0..35,
            "Brown v. Board of Education, 1954",
        );
        frag = classify_fragment(frag);
        assert_eq!(frag.fragment_type, FragmentType::Legal);
    }
}
