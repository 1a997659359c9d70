//! Core domain types for the specmill pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OutputArea
// ---------------------------------------------------------------------------

/// The named slice of pipeline results a pass contributes to.
///
/// An area identifies both "what a pass produces" and "what a caller may
/// selectively request". The set is closed; areas without a dedicated pass
/// (`Metadata`, `Pubrules`, `Legal`) exist for caller passthrough.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputArea {
    Idl,
    Xref,
    References,
    Boilerplate,
    Toc,
    Diagnostics,
    Assertions,
    Metadata,
    Pubrules,
    Legal,
}

impl OutputArea {
    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idl => "idl",
            Self::Xref => "xref",
            Self::References => "references",
            Self::Boilerplate => "boilerplate",
            Self::Toc => "toc",
            Self::Diagnostics => "diagnostics",
            Self::Assertions => "assertions",
            Self::Metadata => "metadata",
            Self::Pubrules => "pubrules",
            Self::Legal => "legal",
        }
    }
}

impl std::fmt::Display for OutputArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputArea {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idl" => Ok(Self::Idl),
            "xref" => Ok(Self::Xref),
            "references" => Ok(Self::References),
            "boilerplate" => Ok(Self::Boilerplate),
            "toc" => Ok(Self::Toc),
            "diagnostics" => Ok(Self::Diagnostics),
            "assertions" => Ok(Self::Assertions),
            "metadata" => Ok(Self::Metadata),
            "pubrules" => Ok(Self::Pubrules),
            "legal" => Ok(Self::Legal),
            other => Err(format!("unknown output area: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-reference queries
// ---------------------------------------------------------------------------

/// A single term lookup sent to an external cross-reference resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrefQuery {
    /// Correlation id echoed back with results. Falls back to the term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The term to resolve, as written in the document.
    pub term: String,
    /// Spec shortnames constraining the lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<Vec<String>>,
}

/// One candidate destination returned by a resolver.
///
/// A resolver returns a *list* of candidates per query because a term may
/// be defined in several external corpora; disambiguation happens later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefResult {
    /// Absolute destination URL.
    pub href: String,
    /// Display text for the destination, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Shortname of the spec the destination lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cite: Option<String>,
}

// ---------------------------------------------------------------------------
// Bibliography
// ---------------------------------------------------------------------------

/// One caller-supplied bibliography record, keyed by citation id.
///
/// Absence of an entry for a cited id is not an error — the references
/// assembler renders a visible placeholder and warns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiblioEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// An in-text citation recorded by the markdown collaborator, available to
/// callers before any document tree exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Bibliographic id, e.g. `RFC2119`.
    pub id: String,
    /// Whether the citation was written in normative form (`[[!ID]]`).
    pub normative: bool,
}

// ---------------------------------------------------------------------------
// Normative assertions
// ---------------------------------------------------------------------------

/// RFC 2119 conformance keyword recognized by the assertion extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormativeKeyword {
    #[serde(rename = "MUST")]
    Must,
    #[serde(rename = "MUST NOT")]
    MustNot,
    #[serde(rename = "SHOULD")]
    Should,
    #[serde(rename = "MAY")]
    May,
}

impl NormativeKeyword {
    /// Parse an already upper-cased, whitespace-collapsed marker text.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "MUST" => Some(Self::Must),
            "MUST NOT" => Some(Self::MustNot),
            "SHOULD" => Some(Self::Should),
            "MAY" => Some(Self::May),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::MustNot => "MUST NOT",
            Self::Should => "SHOULD",
            Self::May => "MAY",
        }
    }
}

impl std::fmt::Display for NormativeKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted conformance requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionItem {
    /// Standardized id, e.g. `UJSE-1-001`, sequential in document order.
    pub id: String,
    /// The anchor id used for linking — the block's pre-existing id when it
    /// has one, otherwise the standardized id made unique in the tree.
    pub anchor_id: String,
    /// Normative keyword type (first keyword wins inside a block).
    #[serde(rename = "type")]
    pub keyword: NormativeKeyword,
    /// Whitespace-collapsed block text, truncated to 200 characters.
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// One entry of the document outline, derived from heading ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    pub id: String,
    pub text: String,
    /// 1 for top-level headings, 2 for their subsections.
    pub depth: u8,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Processing statistics reported with every render.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Number of section elements processed.
    pub elements_processed: usize,
    /// Number of files pulled in by the include processor.
    pub files_included: usize,
    /// Number of markdown blocks converted.
    pub markdown_blocks: usize,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u128,
}
