//! Local terminology index: term → in-document anchor.
//!
//! Built from definition markers (`dfn`, including `data-lt` alternate
//! term lists) and from h2–h6 headings as a fallback. Keys are normalized
//! terms; the first writer wins, and definitions are indexed before
//! headings so they take priority.

use std::collections::BTreeMap;

use specmill_dom::Document;

use crate::text::{normalize_term, slugify};

/// Where a local target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    Definition,
    Heading,
}

/// One resolvable in-document destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    /// Fragment href, e.g. `#event-loop`.
    pub href: String,
    /// Display text of the defining element.
    pub text: String,
    pub source: TargetSource,
}

/// Build the term → anchor map, assigning ids to definition markers and
/// headings that lack one.
pub fn build_local_map(doc: &mut Document) -> BTreeMap<String, LocalTarget> {
    let mut map = BTreeMap::new();

    // Definition markers first: they take priority over headings.
    for dfn in doc.elements_with_tag(&["dfn"]) {
        let text = doc
            .attr(dfn, "data-lt")
            .map(String::from)
            .unwrap_or_else(|| doc.text_content(dfn));
        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }

        if doc.attr(dfn, "id").is_none() {
            // The first alternate term names the anchor.
            let first = text
                .split(['|', ','])
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| doc.text_content(dfn).trim().to_string());
            doc.set_attr(dfn, "id", &slugify(&first));
        }
        let href = format!("#{}", doc.attr(dfn, "id").unwrap_or_default());

        for variant in text.split(['|', ',']).map(str::trim).filter(|s| !s.is_empty()) {
            let key = normalize_term(variant);
            map.entry(key).or_insert_with(|| LocalTarget {
                href: href.clone(),
                text: variant.to_string(),
                source: TargetSource::Definition,
            });
        }
    }

    // Headings as fallback targets.
    for heading in doc.elements_with_tag(&["h2", "h3", "h4", "h5", "h6"]) {
        let label = doc.text_content(heading).trim().to_string();
        if label.is_empty() {
            continue;
        }

        // Prefer the enclosing section's id to avoid pointing at a
        // duplicate anchor on heading and section.
        let section_id = doc
            .closest(heading, |d, n| {
                d.tag(n) == Some("section") && d.attr(n, "id").is_some()
            })
            .and_then(|s| doc.attr(s, "id"))
            .map(String::from);

        let existing_id = doc.attr(heading, "id").map(String::from);
        let target_id = match (section_id, existing_id) {
            (Some(id), _) => id,
            (None, Some(id)) => id,
            (None, None) => {
                let id = doc.unique_id(&slugify(&label));
                doc.set_attr(heading, "id", &id);
                id
            }
        };

        let key = normalize_term(&label);
        map.entry(key).or_insert_with(|| LocalTarget {
            href: format!("#{target_id}"),
            text: label,
            source: TargetSource::Heading,
        });
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use specmill_dom::{ScraperParser, TreeParser};

    #[test]
    fn dfn_terms_are_indexed_with_generated_ids() {
        let mut doc = ScraperParser.parse("<p><dfn>Event Loop</dfn> spins.</p>");
        let map = build_local_map(&mut doc);

        let target = &map["event loop"];
        assert_eq!(target.href, "#event-loop");
        assert_eq!(target.source, TargetSource::Definition);

        let dfn = doc.elements_with_tag(&["dfn"])[0];
        assert_eq!(doc.attr(dfn, "id"), Some("event-loop"));
    }

    #[test]
    fn data_lt_registers_all_variants_under_one_anchor() {
        let mut doc =
            ScraperParser.parse("<dfn data-lt=\"task queue|task queues, queue of tasks\">task queue</dfn>");
        let map = build_local_map(&mut doc);

        assert_eq!(map["task queue"].href, "#task-queue");
        assert_eq!(map["task queues"].href, "#task-queue");
        assert_eq!(map["queue of tasks"].href, "#task-queue");
    }

    #[test]
    fn heading_prefers_enclosing_section_id() {
        let mut doc = ScraperParser
            .parse("<section id=\"sec-model\"><h2>Processing Model</h2></section>");
        let map = build_local_map(&mut doc);
        assert_eq!(map["processing model"].href, "#sec-model");
        assert_eq!(map["processing model"].source, TargetSource::Heading);
    }

    #[test]
    fn heading_without_id_gets_unique_generated_one() {
        let mut doc =
            ScraperParser.parse("<div id=\"setup\">x</div><h3>Setup</h3>");
        let map = build_local_map(&mut doc);
        // "setup" is taken by the div, so the heading is disambiguated.
        assert_eq!(map["setup"].href, "#setup-2");
        let h3 = doc.elements_with_tag(&["h3"])[0];
        assert_eq!(doc.attr(h3, "id"), Some("setup-2"));
    }

    #[test]
    fn dfn_beats_heading_for_the_same_term() {
        let mut doc = ScraperParser.parse(
            "<h2>Fetch</h2><p><dfn id=\"dfn-fetch\">fetch</dfn></p>",
        );
        let map = build_local_map(&mut doc);
        assert_eq!(map["fetch"].source, TargetSource::Definition);
        assert_eq!(map["fetch"].href, "#dfn-fetch");
    }
}
