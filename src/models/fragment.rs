//! Citation fragment model: a span of source text identified as a potential citation.

use serde::{Deserialize, Serialize};

/// The classified type of an extracted fragment.
///
/// `Doi`, `Pmid`, `Arxiv` and `Isbn` are deterministic identifiers: looking
/// one up always yields the same unique record, so they skip scoring
/// entirely. The remaining types require search plus disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentType {
    Doi,
    Pmid,
    Arxiv,
    Isbn,
    Url,
    AuthorYear,
    Keywords,
    Legal,
}

impl FragmentType {
    /// Whether lookup for this type returns a single definitive record.
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            FragmentType::Doi | FragmentType::Pmid | FragmentType::Arxiv | FragmentType::Isbn
        )
    }

    /// Identifier used when matching fragments to engine capabilities.
    pub fn id(&self) -> &'static str {
        match self {
            FragmentType::Doi => "doi",
            FragmentType::Pmid => "pmid",
            FragmentType::Arxiv => "arxiv",
            FragmentType::Isbn => "isbn",
            FragmentType::Url => "url",
            FragmentType::AuthorYear => "author_year",
            FragmentType::Keywords => "keywords",
            FragmentType::Legal => "legal",
        }
    }
}

impl std::fmt::Display for FragmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One "Author, Year" pair split out of a multi-citation parenthetical
/// like `(Coleman, 1988; Weber, 1905)`. Each is resolved independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCitation {
    pub author: String,
    pub year: String,
    /// Rebuilt standalone form, e.g. `(Coleman, 1988)`.
    pub citation_text: String,
}

/// A span of source text identified as a potential citation.
///
/// Fragments are immutable once built; their lifetime is one resolution
/// pass. Character offsets are exact so replacement text can later be
/// spliced back without re-scanning the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationFragment {
    /// The text exactly as it appeared in the source.
    pub raw_text: String,

    /// Classified fragment type.
    pub fragment_type: FragmentType,

    /// Byte offset of the first character of the fragment.
    pub position_start: usize,

    /// Byte offset one past the last character.
    pub position_end: usize,

    /// The key handed to lookup: a cleaned DOI, a bare PMID, a search
    /// string, etc. For author-year fragments this is the rebuilt
    /// `(Author, Year)` form.
    pub canonical_key: String,

    /// Author surname hint for author-year fragments.
    pub author_hint: Option<String>,

    /// Four-digit year hint (may carry a disambiguation suffix, `2020a`).
    pub year_hint: Option<String>,

    /// Page number or range, if the parenthetical carried one.
    pub page_hint: Option<String>,

    /// `Coleman (1988)` rather than `(Coleman, 1988)`.
    pub narrative: bool,

    /// Decomposed sub-citations for multi-citation parentheticals.
    pub sub_fragments: Vec<SubCitation>,
}

impl CitationFragment {
    /// Build a fragment with just the required fields.
    pub fn new(
        raw_text: impl Into<String>,
        fragment_type: FragmentType,
        span: std::ops::Range<usize>,
        canonical_key: impl Into<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            fragment_type,
            position_start: span.start,
            position_end: span.end,
            canonical_key: canonical_key.into(),
            author_hint: None,
            year_hint: None,
            page_hint: None,
            narrative: false,
            sub_fragments: Vec::new(),
        }
    }

    /// The character span this fragment claims in the source text.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.position_start..self.position_end
    }

    /// Whether this fragment's span overlaps another's.
    pub fn overlaps(&self, other: &CitationFragment) -> bool {
        self.position_start < other.position_end && other.position_start < self.position_end
    }
}
