//! Configuration snapshot driving incremental re-execution.
//!
//! A [`ConfigSnapshot`] captures the caller-supplied document inputs of one
//! render. The scheduler compares two snapshots field by field (shallow
//! list equality, not deep structural equality of the parsed trees) to
//! decide which output areas are stale. The snapshot is held by the
//! *caller* in a session value and passed into every run — the pipeline
//! itself keeps no cross-run state.

use serde::{Deserialize, Serialize};

/// The per-run document inputs compared by the incremental scheduler.
///
/// Section and fragment markup is captured as the raw strings handed in by
/// the caller; two runs with identical strings are considered unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Document section fragments, in order.
    #[serde(default)]
    pub sections: Vec<String>,
    /// Optional document header fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Optional "status of this document" fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sotd: Option<String>,
    /// Optional pubrules fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubrules: Option<String>,
    /// Optional legal fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal: Option<String>,
}

/// The named snapshot fields the scheduler can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Sections,
    Header,
    Sotd,
    Pubrules,
    Legal,
}

impl ConfigSnapshot {
    /// Shallow comparison of one field between two snapshots: length plus
    /// element equality for the sections list, value equality otherwise.
    pub fn field_changed(&self, other: &ConfigSnapshot, field: ConfigField) -> bool {
        match field {
            ConfigField::Sections => {
                self.sections.len() != other.sections.len()
                    || self
                        .sections
                        .iter()
                        .zip(other.sections.iter())
                        .any(|(a, b)| a != b)
            }
            ConfigField::Header => self.header != other.header,
            ConfigField::Sotd => self.sotd != other.sotd,
            ConfigField::Pubrules => self.pubrules != other.pubrules,
            ConfigField::Legal => self.legal != other.legal,
        }
    }
}
