//! Search request body and its lowering to the backend's JSON query DSL
//!
//! Clause composition happens on the [`BooleanQuery`] tree; this module is the
//! single place that knows how the backend spells it.

use crate::search::catalog::FieldCatalog;
use crate::search::config::SearchSettings;
use crate::search::query::{BooleanQuery, Clause, Fuzziness};
use serde_json::{json, Map, Value};

/// Date format of range bounds
pub const DATE_FORMAT: &str = "yyyy-MM-dd";

/// Fields to highlight and the tags wrapping matched fragments
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightDirective {
    pub fields: Vec<String>,
    pub pre_tag: String,
    pub post_tag: String,
}

impl HighlightDirective {
    /// Plain and keyword-exact variant of every searchable field
    pub fn from_catalog(catalog: &FieldCatalog, settings: &SearchSettings) -> Self {
        let mut fields = Vec::new();
        for field in catalog.searchable() {
            fields.push(field.name.clone());
            if field.exact_field() != field.name {
                fields.push(field.exact_field().to_string());
            }
        }

        Self {
            fields,
            pre_tag: settings.highlight_pre_tag.clone(),
            post_tag: settings.highlight_post_tag.clone(),
        }
    }

    pub fn to_dsl(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.clone(), json!({})))
            .collect();

        json!({
            "type": "unified",
            "pre_tags": [self.pre_tag],
            "post_tags": [self.post_tag],
            "fields": fields,
        })
    }
}

/// One terms aggregation per faceted field
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationDirective {
    /// (facet name, field bucketed on)
    pub facets: Vec<(String, String)>,
    /// Bucket cap per facet
    pub size: usize,
}

impl AggregationDirective {
    pub fn from_catalog(catalog: &FieldCatalog, settings: &SearchSettings) -> Self {
        Self {
            facets: catalog
                .aggregatable()
                .map(|f| (f.name.clone(), f.exact_field().to_string()))
                .collect(),
            size: settings.aggregation_size,
        }
    }

    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.facets.iter().map(|(name, _)| name.as_str())
    }

    pub fn to_dsl(&self) -> Value {
        let aggs: Map<String, Value> = self
            .facets
            .iter()
            .map(|(name, field)| {
                (
                    name.clone(),
                    json!({ "terms": { "field": field, "size": self.size } }),
                )
            })
            .collect();
        Value::Object(aggs)
    }
}

/// Everything sent to the backend for one search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBody {
    pub query: BooleanQuery,
    pub highlight: HighlightDirective,
    pub aggregations: AggregationDirective,
    /// Maximum number of ranked hits
    pub size: usize,
}

impl SearchBody {
    pub fn to_dsl(&self) -> Value {
        let mut body = json!({
            "query": query_to_dsl(&self.query),
            "size": self.size,
            "highlight": self.highlight.to_dsl(),
        });
        if !self.aggregations.facets.is_empty() {
            body["aggs"] = self.aggregations.to_dsl();
        }
        body
    }
}

/// Lower a boolean query; an empty one matches everything
pub fn query_to_dsl(query: &BooleanQuery) -> Value {
    if query.is_empty() {
        return json!({ "match_all": {} });
    }
    bool_to_dsl(query)
}

fn bool_to_dsl(query: &BooleanQuery) -> Value {
    let mut body = Map::new();
    for (section, clauses) in [
        ("must", &query.must),
        ("filter", &query.filter),
        ("should", &query.should),
        ("must_not", &query.must_not),
    ] {
        if !clauses.is_empty() {
            body.insert(
                section.to_string(),
                Value::Array(clauses.iter().map(clause_to_dsl).collect()),
            );
        }
    }
    if let Some(min) = query.minimum_should_match {
        body.insert("minimum_should_match".to_string(), json!(min));
    }
    keyed("bool", Value::Object(body))
}

/// Lower a single clause
pub fn clause_to_dsl(clause: &Clause) -> Value {
    match clause {
        Clause::MatchAll => json!({ "match_all": {} }),
        Clause::Term {
            field,
            value,
            boost,
        } => {
            let mut inner = json!({ "value": value });
            if let Some(boost) = boost {
                inner["boost"] = json!(boost);
            }
            keyed("term", keyed(field, inner))
        }
        Clause::Terms { field, values } => keyed("terms", keyed(field, json!(values))),
        Clause::MatchPhrasePrefix {
            field,
            query,
            max_expansions,
        } => keyed(
            "match_phrase_prefix",
            keyed(
                field,
                json!({ "query": query, "max_expansions": max_expansions }),
            ),
        ),
        Clause::Wildcard {
            field,
            pattern,
            case_insensitive,
        } => keyed(
            "wildcard",
            keyed(
                field,
                json!({ "value": pattern, "case_insensitive": case_insensitive }),
            ),
        ),
        Clause::Match {
            field,
            query,
            fuzziness,
        } => {
            let fuzziness = match fuzziness {
                Fuzziness::Auto => "AUTO",
            };
            keyed(
                "match",
                keyed(
                    field,
                    json!({ "query": query, "fuzziness": fuzziness, "operator": "and" }),
                ),
            )
        }
        Clause::Range { field, gte, lte } => keyed(
            "range",
            keyed(
                field,
                json!({ "gte": gte, "lte": lte, "format": DATE_FORMAT }),
            ),
        ),
        Clause::Exists { field } => json!({ "exists": { "field": field } }),
        Clause::Bool(group) => bool_to_dsl(group),
    }
}

fn keyed(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
