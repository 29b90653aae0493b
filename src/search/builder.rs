//! Query assembly
//!
//! Pure functions from a [`SearchRequest`] to a [`BooleanQuery`]. Every field
//! name is resolved through the [`FieldCatalog`] before a clause is built, so
//! a caller can never address an index field the catalog does not know.

use crate::search::catalog::FieldCatalog;
use crate::search::config::SearchSettings;
use crate::search::error::SearchResult;
use crate::search::query::{
    AccessControl, BooleanQuery, Clause, DateRange, Fuzziness, MatchType, SearchRequest,
};
use crate::search::text::{escape_query_term, has_special_chars, normalize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds boolean queries against one field catalog
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    catalog: Arc<FieldCatalog>,
    exact_boost: f32,
    prefix_max_expansions: u32,
}

impl QueryBuilder {
    /// Create a builder with default settings
    pub fn new(catalog: Arc<FieldCatalog>) -> Self {
        Self::with_settings(catalog, &SearchSettings::default())
    }

    pub fn with_settings(catalog: Arc<FieldCatalog>, settings: &SearchSettings) -> Self {
        Self {
            catalog,
            exact_boost: settings.exact_boost,
            prefix_max_expansions: settings.prefix_max_expansions,
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Build the complete query for a request.
    ///
    /// Field names are validated before any clause is built. Access control
    /// is always attached, even when nothing else is.
    pub fn assemble(&self, request: &SearchRequest) -> SearchResult<BooleanQuery> {
        self.validate(request)?;

        let mut query = BooleanQuery::new();
        query.absorb(self.build_free_text_clause(&request.term, request.match_type));
        query.absorb(self.build_categorical_filters(&request.filters)?);
        query.absorb(self.build_date_range_filters(&request.dates)?);
        query.absorb(self.build_owner_clause(request.owner.as_deref()));
        query.absorb(self.build_access_control_clauses(&request.access));

        debug!(
            must = query.must.len(),
            filter = query.filter.len(),
            must_not = query.must_not.len(),
            "Assembled search query"
        );

        Ok(query)
    }

    /// Reject filter and date field names the catalog does not allow
    pub fn validate(&self, request: &SearchRequest) -> SearchResult<()> {
        for field in request.filters.keys() {
            self.catalog.require_filterable(field)?;
        }
        for field in request.dates.keys() {
            self.catalog.require_date(field)?;
        }
        Ok(())
    }

    /// Free-text clause across every searchable field.
    ///
    /// An empty term is no constraint. Exact mode is a keyword lookup only.
    /// Fuzzy mode ORs a boosted keyword match and an escaped trailing
    /// wildcard per field. A term without query-syntax characters also gets
    /// a normalized keyword match and prefix, a phrase prefix and a
    /// typo-tolerant match; a term with them is only ever matched literally.
    pub fn build_free_text_clause(&self, term: &str, match_type: MatchType) -> Clause {
        let term = term.trim();
        if term.is_empty() {
            return Clause::MatchAll;
        }

        let mut alternatives = Vec::new();
        match match_type {
            MatchType::Exact => {
                for field in self.catalog.searchable() {
                    alternatives.push(Clause::term(field.exact_field(), term));
                }
            }
            MatchType::Fuzzy => {
                let pattern = format!("{}*", escape_query_term(term));
                let literal = has_special_chars(term);
                let folded = normalize(term);
                for field in self.catalog.searchable() {
                    alternatives.push(Clause::Term {
                        field: field.exact_field().to_string(),
                        value: term.to_string(),
                        boost: Some(self.exact_boost),
                    });
                    alternatives.push(Clause::Wildcard {
                        field: field.exact_field().to_string(),
                        pattern: pattern.clone(),
                        case_insensitive: true,
                    });
                    if literal {
                        continue;
                    }

                    let normalized = field.normalized_field().filter(|_| !folded.is_empty());
                    if let Some(normalized) = normalized {
                        alternatives.push(Clause::term(normalized, folded.clone()));
                        alternatives.push(Clause::Wildcard {
                            field: normalized.to_string(),
                            pattern: format!("{}*", folded),
                            case_insensitive: false,
                        });
                    }
                    alternatives.push(Clause::MatchPhrasePrefix {
                        field: field.name.clone(),
                        query: term.to_string(),
                        max_expansions: self.prefix_max_expansions,
                    });
                    alternatives.push(Clause::Match {
                        field: field.name.clone(),
                        query: term.to_string(),
                        fuzziness: Fuzziness::Auto,
                    });
                }
            }
        }

        if alternatives.is_empty() {
            warn!("Catalog has no searchable fields, ignoring search term");
            return Clause::MatchAll;
        }

        BooleanQuery::any_of(alternatives).into_clause()
    }

    /// One non-scoring `terms` filter per field with values.
    ///
    /// Values of one field are OR'd, distinct fields are AND'd.
    pub fn build_categorical_filters(
        &self,
        filters: &BTreeMap<String, BTreeSet<String>>,
    ) -> SearchResult<Clause> {
        let mut group = BooleanQuery::new();
        for (name, values) in filters {
            let field = self.catalog.require_filterable(name)?;
            if values.is_empty() {
                continue;
            }
            group = group.filter(Clause::Terms {
                field: field.exact_field().to_string(),
                values: values.iter().cloned().collect(),
            });
        }
        Ok(group.into_clause())
    }

    /// Inclusive range filter per field with both bounds present.
    ///
    /// Inverted ranges are passed through and match nothing.
    pub fn build_date_range_filters(
        &self,
        dates: &BTreeMap<String, DateRange>,
    ) -> SearchResult<Clause> {
        let mut group = BooleanQuery::new();
        for (name, range) in dates {
            let field = self.catalog.require_date(name)?;
            let Some((start, end)) = range.bounds() else {
                continue;
            };
            if range.is_inverted() {
                debug!(field = %name, %start, %end, "Date range starts after it ends");
            }
            group = group.filter(Clause::Range {
                field: field.exact_field().to_string(),
                gte: start.to_string(),
                lte: end.to_string(),
            });
        }
        Ok(group.into_clause())
    }

    /// Restrict to documents owned by `owner`; blank means any owner
    pub fn build_owner_clause(&self, owner: Option<&str>) -> Clause {
        match owner.map(str::trim).filter(|o| !o.is_empty()) {
            Some(owner) => {
                let field = self.catalog.access_exact_field(&self.catalog.access().owner_field);
                BooleanQuery::new()
                    .filter(Clause::term(field, owner))
                    .into_clause()
            }
            None => Clause::MatchAll,
        }
    }

    /// Hard visibility constraints.
    ///
    /// Federally flagged documents are excluded unless federal access is
    /// allowed. With the sensitivity check on, a document must carry one of
    /// the allowed levels or no level at all.
    pub fn build_access_control_clauses(&self, access: &AccessControl) -> Clause {
        let fields = self.catalog.access();
        let mut group = BooleanQuery::new();

        if !access.federal_access_allowed {
            group = group.must_not(Clause::term(
                self.catalog.access_exact_field(&fields.federal_flag_field),
                fields.federal_flag_value.clone(),
            ));
        }

        if access.sensitivity_check_required {
            let level_field = self.catalog.access_exact_field(&fields.sensitivity_field);
            let mut alternatives: Vec<Clause> = access
                .allowed_sensitivity_levels
                .iter()
                .map(|level| Clause::term(level_field.clone(), level.clone()))
                .collect();
            alternatives.push(
                BooleanQuery::new()
                    .must_not(Clause::exists(fields.sensitivity_field.clone()))
                    .into_clause(),
            );
            group = group.must(BooleanQuery::any_of(alternatives).into_clause());
        }

        group.into_clause()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::error::SearchError;
    use chrono::NaiveDate;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(Arc::new(FieldCatalog::order_details()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_request_only_carries_access_control() {
        let request = SearchRequest::new("").with_access(
            AccessControl::default().with_sensitivity_levels(["1", "6", "8"]),
        );
        let query = builder().assemble(&request).unwrap();

        assert!(query.filter.is_empty());
        assert!(query.should.is_empty());
        assert_eq!(query.must_not.len(), 1);
        assert_eq!(query.must.len(), 1);
        assert_eq!(query.clause_count(), 2);
    }

    #[test]
    fn test_unrestricted_empty_request_is_empty() {
        let request = SearchRequest::new("   ").with_access(AccessControl::unrestricted());
        let query = builder().assemble(&request).unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn test_exact_mode_emits_only_keyword_terms() {
        let b = builder();
        let Clause::Bool(group) = b.build_free_text_clause("ORD-1009", MatchType::Exact) else {
            panic!("expected a group");
        };

        assert_eq!(group.minimum_should_match, Some(1));
        assert_eq!(group.should.len(), b.catalog().searchable().count());
        for clause in &group.should {
            match clause {
                Clause::Term { field, value, boost } => {
                    assert!(field.ends_with(".keyword"));
                    assert_eq!(value, "ORD-1009");
                    assert!(boost.is_none());
                }
                other => panic!("unexpected clause {:?}", other),
            }
        }
    }

    #[test]
    fn test_fuzzy_mode_combines_strategies_per_field() {
        let b = builder();
        let Clause::Bool(group) = b.build_free_text_clause("Ord1009", MatchType::Fuzzy) else {
            panic!("expected a group");
        };

        let searchable = b.catalog().searchable().count();
        assert_eq!(group.should.len(), searchable * 6);
        assert_eq!(group.minimum_should_match, Some(1));

        assert!(group.should.contains(&Clause::term("orderNumber.normalized", "ord1009")));
        assert!(group.should.contains(&Clause::Wildcard {
            field: "orderNumber.normalized".to_string(),
            pattern: "ord1009*".to_string(),
            case_insensitive: false,
        }));
        assert!(group.should.iter().any(|c| matches!(
            c,
            Clause::Term { boost: Some(boost), value, .. } if *boost > 1.0 && value == "Ord1009"
        )));
        assert!(group.should.iter().any(|c| matches!(
            c,
            Clause::Match { fuzziness: Fuzziness::Auto, .. }
        )));
    }

    #[test]
    fn test_fuzzy_term_with_special_chars_stays_literal() {
        let b = builder();
        let Clause::Bool(group) = b.build_free_text_clause("a+b*c", MatchType::Fuzzy) else {
            panic!("expected a group");
        };

        let searchable = b.catalog().searchable().count();
        assert_eq!(group.should.len(), searchable * 2);
        for clause in &group.should {
            match clause {
                Clause::Term { field, value, boost } => {
                    assert!(field.ends_with(".keyword"));
                    assert_eq!(value, "a+b*c");
                    assert!(boost.is_some());
                }
                Clause::Wildcard { field, pattern, .. } => {
                    assert!(field.ends_with(".keyword"));
                    assert_eq!(pattern, r"a\+b\*c*");
                }
                other => panic!("analyzed clause for a literal term: {:?}", other),
            }
        }
    }

    #[test]
    fn test_categorical_filters_use_keyword_terms() {
        let request = SearchRequest::new("")
            .with_filter("crStatus", ["OPEN", "CLOSED"])
            .with_filter("source", ["WEB"])
            .with_access(AccessControl::unrestricted());
        let query = builder().assemble(&request).unwrap();

        assert_eq!(query.filter.len(), 2);
        assert!(query.must.is_empty());
        assert_eq!(
            query.filter[0],
            Clause::Terms {
                field: "crStatus.keyword".to_string(),
                values: vec!["CLOSED".to_string(), "OPEN".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_filter_set_is_no_constraint() {
        let mut request = SearchRequest::new("").with_access(AccessControl::unrestricted());
        request.filters.insert("crStatus".to_string(), BTreeSet::new());
        assert!(builder().assemble(&request).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_filter_field_is_rejected() {
        let request = SearchRequest::new("x").with_filter("crStatus.keyword", ["OPEN"]);
        assert!(matches!(
            builder().assemble(&request),
            Err(SearchError::UnknownField(_))
        ));

        let mut request = SearchRequest::new("x");
        request.filters.insert("nope".to_string(), BTreeSet::new());
        assert!(builder().assemble(&request).is_err());
    }

    #[test]
    fn test_date_filter_needs_both_bounds() {
        let b = builder();
        let mut dates = BTreeMap::new();
        dates.insert(
            "dueDate".to_string(),
            DateRange {
                start_date: Some(date(2024, 1, 1)),
                end_date: None,
            },
        );
        assert!(b.build_date_range_filters(&dates).unwrap().is_match_all());

        dates.insert(
            "dueDate".to_string(),
            DateRange::new(date(2024, 1, 1), date(2024, 1, 31)),
        );
        let Clause::Bool(group) = b.build_date_range_filters(&dates).unwrap() else {
            panic!("expected a group");
        };
        assert_eq!(
            group.filter[0],
            Clause::Range {
                field: "dueDate".to_string(),
                gte: "2024-01-01".to_string(),
                lte: "2024-01-31".to_string(),
            }
        );
    }

    #[test]
    fn test_inverted_range_passes_through() {
        let request = SearchRequest::new("")
            .with_date_range("dueDate", DateRange::new(date(2024, 2, 1), date(2024, 1, 1)))
            .with_access(AccessControl::unrestricted());
        let query = builder().assemble(&request).unwrap();
        assert_eq!(query.filter.len(), 1);
    }

    #[test]
    fn test_date_filter_on_keyword_field_is_rejected() {
        let request = SearchRequest::new("")
            .with_date_range("source", DateRange::new(date(2024, 1, 1), date(2024, 1, 2)));
        assert!(matches!(
            builder().assemble(&request),
            Err(SearchError::FieldNotDate(_))
        ));
    }

    #[test]
    fn test_owner_clause() {
        let b = builder();
        assert!(b.build_owner_clause(None).is_match_all());
        assert!(b.build_owner_clause(Some("  ")).is_match_all());

        let request = SearchRequest::new("")
            .with_owner("jdoe")
            .with_access(AccessControl::unrestricted());
        let query = b.assemble(&request).unwrap();
        assert_eq!(query.filter, vec![Clause::term("userName.keyword", "jdoe")]);
    }

    #[test]
    fn test_federal_restriction() {
        let clause = builder().build_access_control_clauses(&AccessControl::default());
        let Clause::Bool(group) = clause else {
            panic!("expected a group");
        };
        assert_eq!(
            group.must_not,
            vec![Clause::term("federalFlag.keyword", "FEDERAL")]
        );
        assert!(group.must.is_empty());
    }

    #[test]
    fn test_sensitivity_group_admits_unset_level() {
        let access = AccessControl::unrestricted().with_sensitivity_levels(["1", "6", "8"]);
        let Clause::Bool(group) = builder().build_access_control_clauses(&access) else {
            panic!("expected a group");
        };
        assert!(group.must_not.is_empty());
        let Clause::Bool(levels) = &group.must[0] else {
            panic!("expected a sensitivity group");
        };
        assert_eq!(levels.minimum_should_match, Some(1));
        assert_eq!(levels.should.len(), 4);
        assert_eq!(
            levels.should[3],
            BooleanQuery::new()
                .must_not(Clause::exists("gsamSensitivityLevel"))
                .into_clause()
        );
    }

    #[test]
    fn test_sensitivity_check_without_levels_keeps_unset_alternative() {
        let access = AccessControl::unrestricted().with_sensitivity_levels(Vec::<String>::new());
        let Clause::Bool(group) = builder().build_access_control_clauses(&access) else {
            panic!("expected a group");
        };
        let Clause::Bool(levels) = &group.must[0] else {
            panic!("expected a sensitivity group");
        };
        assert_eq!(levels.should.len(), 1);
    }

    #[test]
    fn test_access_control_survives_text_and_filters() {
        let request = SearchRequest::new("ord")
            .with_filter("workType", ["INSTALL"])
            .with_access(AccessControl::default().with_sensitivity_levels(["1"]));
        let query = builder().assemble(&request).unwrap();

        // text group + sensitivity group
        assert_eq!(query.must.len(), 2);
        assert_eq!(query.filter.len(), 1);
        assert_eq!(query.must_not.len(), 1);
        assert!(query.should.is_empty());
    }
}
