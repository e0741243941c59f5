//! Core data models for citation fragments and resolved metadata.

mod fragment;
mod metadata;

pub use fragment::{CitationFragment, FragmentType, SubCitation};
pub use metadata::{CitationKind, Identifiers, MetadataBuilder, Resolution, ResolvedMetadata};
