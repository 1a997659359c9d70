//! Pluggable external cross-reference resolvers.
//!
//! The xref pass talks to the outside world only through [`XrefResolver`].
//! Two implementations ship with the crate: [`StaticResolver`] serves a
//! fixed in-memory table (tests, CLI-supplied lookup files) and
//! [`RemoteResolver`] queries a JSON batch endpoint over HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use specmill_shared::{Result, XrefQuery, XrefResult};

use crate::text::normalize_term;

/// Resolves batches of term queries against an external corpus.
///
/// The returned map is keyed by each query's `id` when present, otherwise
/// by the query term. A missing key or an empty hit list both mean "no
/// match"; a transport failure is an `Err` and is isolated per resolver by
/// the xref pass.
#[async_trait]
pub trait XrefResolver: Send + Sync {
    async fn resolve_batch(&self, queries: &[XrefQuery]) -> Result<HashMap<String, Vec<XrefResult>>>;
}

/// One registered resolver plus the spec shortnames it may answer for.
/// Registration order doubles as the default disambiguation priority.
#[derive(Clone)]
pub struct XrefSource {
    /// Allowed spec shortnames, in priority order. `None` means unscoped.
    pub specs: Option<Vec<String>>,
    pub resolver: Arc<dyn XrefResolver>,
}

// ---------------------------------------------------------------------------
// Static resolver
// ---------------------------------------------------------------------------

/// In-memory resolver backed by a term table.
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<XrefResult>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register candidate results for a term (normalized internally).
    pub fn with_entry(mut self, term: &str, results: Vec<XrefResult>) -> Self {
        self.entries
            .entry(normalize_term(term))
            .or_default()
            .extend(results);
        self
    }
}

#[async_trait]
impl XrefResolver for StaticResolver {
    async fn resolve_batch(&self, queries: &[XrefQuery]) -> Result<HashMap<String, Vec<XrefResult>>> {
        let mut out = HashMap::new();
        for query in queries {
            let hits = self
                .entries
                .get(&normalize_term(&query.term))
                .cloned()
                .unwrap_or_default();
            let hits = match &query.specs {
                Some(specs) => hits
                    .into_iter()
                    .filter(|h| h.cite.as_ref().is_some_and(|c| specs.contains(c)))
                    .collect(),
                None => hits,
            };
            let key = query.id.clone().unwrap_or_else(|| query.term.clone());
            out.insert(key, hits);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Remote resolver
// ---------------------------------------------------------------------------

/// Resolver querying a remote xref database over HTTP.
///
/// Queries are chunked by their spec constraint; each chunk becomes one
/// GET request with repeated `terms` parameters and a comma-separated
/// `cite` filter. The response is a JSON object mapping lower-cased terms
/// to candidate arrays. A failed chunk degrades to zero hits for its
/// queries rather than failing the batch.
pub struct RemoteResolver {
    endpoint: Url,
    client: reqwest::Client,
}

impl RemoteResolver {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl XrefResolver for RemoteResolver {
    async fn resolve_batch(&self, queries: &[XrefQuery]) -> Result<HashMap<String, Vec<XrefResult>>> {
        let mut by_specs: HashMap<String, Vec<&XrefQuery>> = HashMap::new();
        for query in queries {
            let mut specs = query.specs.clone().unwrap_or_default();
            specs.sort();
            by_specs.entry(specs.join(",")).or_default().push(query);
        }

        let mut out = HashMap::new();
        for (spec_key, chunk) in by_specs {
            let mut url = self.endpoint.clone();
            {
                let mut params = url.query_pairs_mut();
                for query in &chunk {
                    params.append_pair("terms", &query.term);
                }
                if !spec_key.is_empty() {
                    params.append_pair("cite", &spec_key);
                }
            }

            match self.fetch(url).await {
                Ok(data) => {
                    for query in chunk {
                        let hits = data
                            .get(&query.term.to_lowercase())
                            .map(|items| items.iter().filter_map(to_result).collect())
                            .unwrap_or_default();
                        let key = query.id.clone().unwrap_or_else(|| query.term.clone());
                        out.insert(key, hits);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "xref chunk failed, treating as unresolved");
                    for query in chunk {
                        let key = query.id.clone().unwrap_or_else(|| query.term.clone());
                        out.insert(key, Vec::new());
                    }
                }
            }
        }
        Ok(out)
    }
}

impl RemoteResolver {
    async fn fetch(
        &self,
        url: Url,
    ) -> std::result::Result<HashMap<String, Vec<serde_json::Value>>, reqwest::Error> {
        debug!(%url, "querying remote xref database");
        self.client.get(url).send().await?.json().await
    }
}

/// Map one raw candidate object to an [`XrefResult`], tolerating the field
/// aliases different database versions use.
fn to_result(item: &serde_json::Value) -> Option<XrefResult> {
    let pick = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| item.get(*k).and_then(|v| v.as_str()))
            .map(String::from)
    };
    let href = pick(&["uri", "url", "href"])?;
    Some(XrefResult {
        href,
        text: pick(&["title", "term", "text"]),
        cite: pick(&["spec", "shortname"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(href: &str, cite: &str) -> XrefResult {
        XrefResult {
            href: href.into(),
            text: None,
            cite: Some(cite.into()),
        }
    }

    #[tokio::test]
    async fn static_resolver_normalizes_terms() {
        let resolver = StaticResolver::new()
            .with_entry("Event Loop", vec![hit("https://html.spec/e-loop", "html")]);

        let queries = vec![XrefQuery {
            id: Some("q0".into()),
            term: "event   loop".into(),
            specs: None,
        }];
        let results = resolver.resolve_batch(&queries).await.expect("resolve");
        assert_eq!(results["q0"].len(), 1);
        assert_eq!(results["q0"][0].href, "https://html.spec/e-loop");
    }

    #[tokio::test]
    async fn static_resolver_honors_spec_filter() {
        let resolver = StaticResolver::new().with_entry(
            "node",
            vec![hit("https://dom.spec/node", "dom"), hit("https://other/node", "svg")],
        );

        let queries = vec![XrefQuery {
            id: None,
            term: "node".into(),
            specs: Some(vec!["dom".into()]),
        }];
        let results = resolver.resolve_batch(&queries).await.expect("resolve");
        let hits = &results["node"];
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cite.as_deref(), Some("dom"));
    }

    #[test]
    fn raw_hit_field_aliases() {
        let raw = serde_json::json!({ "uri": "https://x/#a", "title": "A", "shortname": "x" });
        let result = to_result(&raw).expect("mapped");
        assert_eq!(result.href, "https://x/#a");
        assert_eq!(result.cite.as_deref(), Some("x"));

        let no_href = serde_json::json!({ "title": "A" });
        assert!(to_result(&no_href).is_none());
    }
}
