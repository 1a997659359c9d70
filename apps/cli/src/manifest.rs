//! Optional `specmill.toml` document manifest.
//!
//! CLI flags override manifest values, which override defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use specmill_shared::{BiblioEntry, Result, SpecmillError, XrefResult};

/// Top-level manifest, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub document: DocumentSection,

    #[serde(default)]
    pub biblio: BiblioSection,

    #[serde(default)]
    pub boilerplate: BoilerplateSection,
}

/// `[document]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSection {
    /// Spec shortname used for assertion ids.
    pub spec: Option<String>,
    /// Version string; leading digits form the major version.
    pub version: Option<String>,
    /// Canonical base URL of the published document.
    pub base_url: Option<String>,
    /// Render the outline (default true).
    pub toc: bool,
}

impl Default for DocumentSection {
    fn default() -> Self {
        Self {
            spec: None,
            version: None,
            base_url: None,
            toc: true,
        }
    }
}

/// `[biblio]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BiblioSection {
    /// Path to a JSON bibliography database (id → entry).
    pub path: Option<String>,
}

/// `[boilerplate]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoilerplateSection {
    #[serde(default)]
    pub conformance: bool,
    #[serde(default)]
    pub security: bool,
    #[serde(default)]
    pub privacy: bool,
    /// Mount point: "end", "before-references", or "after-toc".
    pub mount: Option<String>,
}

/// Load a manifest from a TOML file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| SpecmillError::io(path, e))?;
    toml::from_str(&raw)
        .map_err(|e| SpecmillError::config(format!("invalid manifest {}: {e}", path.display())))
}

/// Load a JSON bibliography database keyed by citation id.
pub fn load_biblio(path: &Path) -> Result<BTreeMap<String, BiblioEntry>> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| SpecmillError::io(path, e))?;
    let entries: BTreeMap<String, BiblioEntry> = serde_json::from_str(&raw).map_err(|e| {
        SpecmillError::validation(format!("invalid biblio database {}: {e}", path.display()))
    })?;
    Ok(entries)
}

/// JSON cross-reference lookup table for offline resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct XrefTable {
    /// Spec shortnames in disambiguation-priority order.
    #[serde(default)]
    pub specs: Option<Vec<String>>,
    /// Candidate destinations keyed by term.
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<XrefResult>>,
}

/// Load a cross-reference lookup table.
pub fn load_xrefs(path: &Path) -> Result<XrefTable> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| SpecmillError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| {
        SpecmillError::validation(format!("invalid xref table {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn parses_full_manifest() {
        let toml = r#"
            [document]
            spec = "ujse"
            version = "1.0"
            base_url = "https://specs.example.org/ujse/1.0/"

            [biblio]
            path = "biblio.json"

            [boilerplate]
            conformance = true
            mount = "before-references"
        "#;
        let manifest: Manifest = toml::from_str(toml).expect("parse");
        assert_eq!(manifest.document.spec.as_deref(), Some("ujse"));
        assert!(manifest.document.toc);
        assert!(manifest.boilerplate.conformance);
        assert!(!manifest.boilerplate.security);
        assert_eq!(
            manifest.boilerplate.mount.as_deref(),
            Some("before-references")
        );
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest: Manifest = toml::from_str("").expect("parse");
        assert!(manifest.document.spec.is_none());
        assert!(manifest.document.toc);
        assert!(!manifest.boilerplate.conformance);
    }

    #[test]
    fn loads_xref_table() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{ "specs": ["html", "dom"],
                 "entries": {{ "event loop": [{{ "href": "https://html.spec/#event-loop", "cite": "html" }}] }} }}"#
        )
        .expect("write");

        let table = load_xrefs(file.path()).expect("load");
        assert_eq!(table.specs.as_deref(), Some(["html".to_string(), "dom".to_string()].as_slice()));
        assert_eq!(table.entries["event loop"][0].cite.as_deref(), Some("html"));
    }

    #[test]
    fn loads_biblio_database() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{ "RFC2119": {{ "id": "RFC2119", "title": "Key words", "href": "https://rfc.example/2119" }} }}"#
        )
        .expect("write");

        let entries = load_biblio(file.path()).expect("load");
        assert_eq!(entries["RFC2119"].title.as_deref(), Some("Key words"));
    }
}
