//! Incremental re-execution scheduling.
//!
//! The scheduler is a pure function from two configuration snapshots to
//! the set of stale output areas, driven by a static table mapping config
//! fields to the areas they feed. Cross-run state lives in a [`Session`]
//! value owned by the caller — there is no hidden instance state, so
//! concurrent runs against different sessions cannot race.

use std::collections::BTreeSet;

use specmill_shared::config::{ConfigField, ConfigSnapshot};
use specmill_shared::OutputArea;

/// One row of the invalidation table: if any of `fields` changed, all of
/// `areas` must re-run.
struct FieldMapping {
    fields: &'static [ConfigField],
    areas: &'static [OutputArea],
}

const CONFIG_TO_AREAS: &[FieldMapping] = &[
    FieldMapping {
        fields: &[ConfigField::Sections],
        areas: &[
            OutputArea::Idl,
            OutputArea::Xref,
            OutputArea::References,
            OutputArea::Boilerplate,
            OutputArea::Toc,
            OutputArea::Diagnostics,
            OutputArea::Assertions,
        ],
    },
    FieldMapping {
        fields: &[
            ConfigField::Header,
            ConfigField::Sotd,
            ConfigField::Pubrules,
            ConfigField::Legal,
        ],
        areas: &[OutputArea::Boilerplate],
    },
];

/// Compute the output areas stale between two snapshots.
///
/// With no previous snapshot every mapped area is stale (first run).
pub fn changed_areas(
    prev: Option<&ConfigSnapshot>,
    next: &ConfigSnapshot,
) -> BTreeSet<OutputArea> {
    let Some(prev) = prev else {
        return CONFIG_TO_AREAS
            .iter()
            .flat_map(|m| m.areas.iter().copied())
            .collect();
    };

    let mut areas = BTreeSet::new();
    for mapping in CONFIG_TO_AREAS {
        if mapping
            .fields
            .iter()
            .any(|&field| prev.field_changed(next, field))
        {
            areas.extend(mapping.areas.iter().copied());
        }
    }
    areas
}

/// Caller-held cross-run state: the snapshot of the previous run.
///
/// One session per logical document; runs against the same session must
/// be sequential, which the `&mut` receiver enforces at compile time.
#[derive(Debug, Default)]
pub struct Session {
    prev: Option<ConfigSnapshot>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `next` as the latest snapshot and return the areas stale
    /// relative to the snapshot it replaces.
    pub fn advance(&mut self, next: &ConfigSnapshot) -> BTreeSet<OutputArea> {
        let changed = changed_areas(self.prev.as_ref(), next);
        self.prev = Some(next.clone());
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(sections: &[&str], header: Option<&str>) -> ConfigSnapshot {
        ConfigSnapshot {
            sections: sections.iter().map(|s| s.to_string()).collect(),
            header: header.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn first_run_marks_all_mapped_areas() {
        let areas = changed_areas(None, &snapshot(&["<p>a</p>"], None));
        assert!(areas.contains(&OutputArea::Idl));
        assert!(areas.contains(&OutputArea::Assertions));
        assert!(areas.contains(&OutputArea::Boilerplate));
        // Passthrough areas have no pass to schedule.
        assert!(!areas.contains(&OutputArea::Metadata));
    }

    #[test]
    fn unchanged_snapshot_yields_empty_set() {
        let a = snapshot(&["<p>a</p>"], Some("<header>h</header>"));
        assert!(changed_areas(Some(&a), &a.clone()).is_empty());
    }

    #[test]
    fn header_change_invalidates_only_boilerplate() {
        let a = snapshot(&["<p>a</p>"], Some("<header>v1</header>"));
        let b = snapshot(&["<p>a</p>"], Some("<header>v2</header>"));
        let areas = changed_areas(Some(&a), &b);
        assert_eq!(areas.len(), 1);
        assert!(areas.contains(&OutputArea::Boilerplate));
    }

    #[test]
    fn section_change_invalidates_everything_mapped() {
        let a = snapshot(&["<p>a</p>"], None);
        let b = snapshot(&["<p>b</p>"], None);
        let areas = changed_areas(Some(&a), &b);
        for area in [
            OutputArea::Idl,
            OutputArea::Xref,
            OutputArea::References,
            OutputArea::Boilerplate,
            OutputArea::Toc,
            OutputArea::Diagnostics,
            OutputArea::Assertions,
        ] {
            assert!(areas.contains(&area), "missing {area}");
        }
    }

    #[test]
    fn scheduler_is_pure() {
        let a = snapshot(&["<p>a</p>"], None);
        let b = snapshot(&["<p>b</p>"], None);
        assert_eq!(changed_areas(Some(&a), &b), changed_areas(Some(&a), &b));
    }

    #[test]
    fn session_tracks_previous_snapshot() {
        let mut session = Session::new();
        let a = snapshot(&["<p>a</p>"], None);

        let first = session.advance(&a);
        assert!(!first.is_empty());

        let second = session.advance(&a);
        assert!(second.is_empty());

        let b = snapshot(&["<p>b</p>"], None);
        let third = session.advance(&b);
        assert!(third.contains(&OutputArea::Xref));
    }
}
