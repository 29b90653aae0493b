//! In-process search backend
//!
//! Evaluates a [`BooleanQuery`] over a fixed set of JSON documents with the
//! same clause semantics the HTTP backend is asked for. Keyword variants
//! (`<field>.keyword`) resolve to the plain source field; normalized variants
//! (`<field>.normalized`) resolve to the source field passed through
//! [`normalize`], as the index normalizer would store it.

use crate::search::backend::{
    RawAggregation, RawBucket, RawHit, RawHits, RawSearchResponse, SearchBackend,
};
use crate::search::catalog::{KEYWORD_SUFFIX, NORMALIZED_SUFFIX};
use crate::search::dsl::{HighlightDirective, SearchBody};
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{BooleanQuery, Clause, Fuzziness};
use crate::search::text::{auto_fuzziness, edit_distance, normalize, tokenize, wildcard_matches};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Read-only document set searched in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    documents: Arc<Vec<Value>>,
}

impl InMemoryBackend {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: Arc::new(documents),
        }
    }

    /// Load documents from a file holding a JSON array
    pub fn from_file(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchError::InvalidConfiguration(format!(
                "cannot read seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        let documents: Vec<Value> = serde_json::from_str(&text).map_err(|e| {
            SearchError::InvalidConfiguration(format!(
                "seed file {} is not a JSON array: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Run the query without the async wrapper
    pub fn execute(&self, body: &SearchBody) -> RawSearchResponse {
        let mut matched: Vec<(usize, f64)> = self
            .documents
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| score_query(&body.query, doc).map(|score| (idx, score)))
            .collect();

        // stable: equal scores keep insertion order
        matched.sort_by(|a, b| b.1.total_cmp(&a.1));

        let aggregations = body
            .aggregations
            .facets
            .iter()
            .map(|(name, field)| {
                let buckets = count_buckets(
                    matched.iter().map(|(idx, _)| &self.documents[*idx]),
                    field,
                    body.aggregations.size,
                );
                (
                    name.clone(),
                    RawAggregation {
                        buckets: Some(buckets),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        let hits = matched
            .iter()
            .take(body.size)
            .map(|&(idx, score)| {
                let doc = &self.documents[idx];
                let highlight = highlight_document(&body.query, &body.highlight, doc);
                RawHit {
                    id: Some(document_id(doc, idx)),
                    score: Some(score),
                    source: doc.clone(),
                    highlight: (!highlight.is_empty()).then_some(highlight),
                }
            })
            .collect();

        RawSearchResponse {
            took: Some(0),
            hits: RawHits { hits },
            aggregations: Some(aggregations),
        }
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn search(&self, body: &SearchBody) -> SearchResult<RawSearchResponse> {
        Ok(self.execute(body))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn document_id(doc: &Value, idx: usize) -> String {
    match doc.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => idx.to_string(),
    }
}

/// Scalar values of `field` as text; arrays are flattened
fn field_values(doc: &Value, field: &str) -> Vec<String> {
    if let Some(name) = field.strip_suffix(NORMALIZED_SUFFIX) {
        return field_values(doc, name)
            .iter()
            .map(|value| normalize(value))
            .filter(|value| !value.is_empty())
            .collect();
    }

    let name = field.strip_suffix(KEYWORD_SUFFIX).unwrap_or(field);
    let mut out = Vec::new();
    if let Some(value) = doc.get(name) {
        collect_scalars(value, &mut out);
    }
    out
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_scalars(item, out)),
        Value::Null | Value::Object(_) => {}
    }
}

/// Score of a matching document, `None` if it does not match
fn score_query(query: &BooleanQuery, doc: &Value) -> Option<f64> {
    if query.is_empty() {
        return Some(1.0);
    }

    let mut score = 0.0;
    for clause in &query.must {
        score += score_clause(clause, doc)?;
    }
    for clause in &query.filter {
        score_clause(clause, doc)?;
    }
    if query
        .must_not
        .iter()
        .any(|clause| score_clause(clause, doc).is_some())
    {
        return None;
    }

    let required = query.minimum_should_match.map(|m| m as usize).unwrap_or(
        if query.must.is_empty() && query.filter.is_empty() && !query.should.is_empty() {
            1
        } else {
            0
        },
    );
    let mut matched = 0;
    for clause in &query.should {
        if let Some(s) = score_clause(clause, doc) {
            matched += 1;
            score += s;
        }
    }
    if matched < required {
        return None;
    }

    Some(score)
}

fn score_clause(clause: &Clause, doc: &Value) -> Option<f64> {
    match clause {
        Clause::MatchAll => Some(1.0),
        Clause::Bool(group) => score_query(group, doc),
        Clause::Term { boost, .. } => {
            (!matching_values(clause, doc).is_empty()).then(|| f64::from(boost.unwrap_or(1.0)))
        }
        leaf => (!matching_values(leaf, doc).is_empty()).then_some(1.0),
    }
}

/// Values of the leaf's field that satisfy it
fn matching_values(leaf: &Clause, doc: &Value) -> Vec<String> {
    let Some(field) = leaf.field() else {
        return Vec::new();
    };
    let values = field_values(doc, field);

    values
        .into_iter()
        .filter(|value| match leaf {
            Clause::Term { value: wanted, .. } => value == wanted,
            Clause::Terms { values: wanted, .. } => wanted.contains(value),
            Clause::MatchPhrasePrefix { query, .. } => phrase_prefix_matches(query, value),
            Clause::Wildcard {
                pattern,
                case_insensitive,
                ..
            } => wildcard_matches(pattern, value, *case_insensitive),
            Clause::Match {
                query,
                fuzziness: Fuzziness::Auto,
                ..
            } => fuzzy_matches(query, value),
            Clause::Range { gte, lte, .. } => {
                let date = value.get(..10).unwrap_or(value);
                date >= gte.as_str() && date <= lte.as_str()
            }
            Clause::Exists { .. } => true,
            Clause::MatchAll | Clause::Bool(_) => false,
        })
        .collect()
}

fn phrase_prefix_matches(query: &str, value: &str) -> bool {
    let wanted = tokenize(query);
    let Some((last, head)) = wanted.split_last() else {
        return false;
    };
    let tokens = tokenize(value);
    if tokens.len() < wanted.len() {
        return false;
    }

    tokens.windows(wanted.len()).any(|window| {
        window[..head.len()] == *head && window[head.len()].starts_with(last.as_str())
    })
}

/// `match` with `AUTO` fuzziness and the `and` operator: every analyzed
/// query token is within its edit budget of some token of the value.
fn fuzzy_matches(query: &str, value: &str) -> bool {
    let wanted = tokenize(query);
    let candidates = tokenize(value);
    if wanted.is_empty() {
        return false;
    }

    wanted.iter().all(|w| {
        let allowed = auto_fuzziness(w.chars().count());
        candidates
            .iter()
            .any(|candidate| edit_distance(w, candidate) <= allowed)
    })
}

/// Terms buckets ordered by descending count, then key
fn count_buckets<'a>(
    docs: impl Iterator<Item = &'a Value>,
    field: &str,
    size: usize,
) -> Vec<RawBucket> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for doc in docs {
        for value in field_values(doc, field) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let mut buckets: Vec<(String, u64)> = counts.into_iter().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    buckets
        .into_iter()
        .take(size)
        .map(|(key, doc_count)| RawBucket {
            key: Value::String(key),
            key_as_string: None,
            doc_count,
        })
        .collect()
}

/// Fragments for every highlighted field a text or term leaf matched
fn highlight_document(
    query: &BooleanQuery,
    directive: &HighlightDirective,
    doc: &Value,
) -> HashMap<String, Vec<String>> {
    let mut highlight: HashMap<String, Vec<String>> = HashMap::new();

    for leaf in query.leaves() {
        if matches!(leaf, Clause::Range { .. } | Clause::Exists { .. }) {
            continue;
        }
        let Some(field) = leaf.field() else {
            continue;
        };
        if !directive.fields.iter().any(|f| f == field) {
            continue;
        }
        for value in matching_values(leaf, doc) {
            let fragment = format!("{}{}{}", directive.pre_tag, value, directive.post_tag);
            let fragments = highlight.entry(field.to_string()).or_default();
            if !fragments.contains(&fragment) {
                fragments.push(fragment);
            }
        }
    }

    highlight
}
