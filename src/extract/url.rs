//! URL extraction with trailing-punctuation and parenthesis repair.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CitationFragment, FragmentType};

// Parentheses are allowed mid-URL: DOI suffixes and Lancet article ids
// legitimately contain them. Unbalanced trailing parens are repaired by
// clean_url.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"'\]]+"#).expect("valid URL regex"));

/// Strip trailing punctuation the regex over-captured, then repair
/// unbalanced trailing parentheses. Internal parentheses (DOI suffixes
/// like `10.1016/S0140-6736(20)30183-5`) are preserved.
pub fn clean_url(url: &str) -> String {
    let mut url = url.trim_end_matches(['.', ',', ';', ':', '!', '?', ']', '\'', '"']);

    let mut open = url.matches('(').count();
    let mut close = url.matches(')').count();
    while close > open && url.ends_with(')') {
        url = &url[..url.len() - 1];
        close -= 1;
        // Trailing punctuation may have hidden behind the paren.
        url = url.trim_end_matches(['.', ',', ';', ':', '!', '?', ']', '\'', '"']);
        open = url.matches('(').count();
        close = url.matches(')').count();
    }

    url.to_string()
}

/// Extract all URLs from `text` with exact spans. The reported span ends at
/// the cleaned URL, not the raw regex match, so splice-back is exact.
pub fn extract_urls(text: &str) -> Vec<CitationFragment> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| {
            let cleaned = clean_url(m.as_str());
            let span = m.start()..m.start() + cleaned.len();
            CitationFragment::new(cleaned.clone(), FragmentType::Url, span, cleaned)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_url_trailing_punctuation() {
        assert_eq!(clean_url("https://example.com/page."), "https://example.com/page");
        assert_eq!(clean_url("https://example.com/page?,"), "https://example.com/page");
        assert_eq!(
            clean_url("https://example.com/page?q=1,"),
            "https://example.com/page?q=1"
        );
    }

    #[test]
    fn test_clean_url_unbalanced_paren() {
        // URL pasted inside a parenthetical: the closing paren is prose.
        assert_eq!(
            clean_url("https://example.com/page)"),
            "https://example.com/page"
        );
        assert_eq!(
            clean_url("https://example.com/page)."),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_clean_url_preserves_internal_parens() {
        let lancet = "https://doi.org/10.1016/S0140-6736(20)30183-5";
        assert_eq!(clean_url(lancet), lancet);
    }

    #[test]
    fn test_extract_span_matches_cleaned_text() {
        let text = "(see https://pubmed.ncbi.nlm.nih.gov/12345678/) and more";
        let urls = extract_urls(text);
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].raw_text, "https://pubmed.ncbi.nlm.nih.gov/12345678/");
        assert_eq!(&text[urls[0].span()], urls[0].raw_text);
    }
}
