//! Search request model and the intermediate boolean query tree

use crate::search::text::split_levels;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use validator::Validate;

/// Free-text matching strategy
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MatchType {
    /// Precise lookup on keyword-exact variants
    Exact,
    /// Prefix, wildcard and typo-tolerant matching
    #[default]
    Fuzzy,
}

impl From<String> for MatchType {
    /// Anything other than `exact` selects fuzzy matching
    fn from(value: String) -> Self {
        MatchType::from_str(value.trim()).unwrap_or_default()
    }
}

impl From<MatchType> for String {
    fn from(value: MatchType) -> Self {
        value.to_string()
    }
}

/// Inclusive date window; both bounds are needed for it to constrain anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(default, alias = "start")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, alias = "end")]
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
        }
    }

    /// Both bounds, if present
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start_date?, self.end_date?))
    }

    /// Start after end; such a range matches nothing
    pub fn is_inverted(&self) -> bool {
        matches!(self.bounds(), Some((start, end)) if start > end)
    }
}

/// Caller clearance, derived from the authenticated identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControl {
    #[serde(default)]
    pub federal_access_allowed: bool,

    #[serde(default)]
    pub sensitivity_check_required: bool,

    #[serde(default)]
    pub allowed_sensitivity_levels: BTreeSet<String>,
}

impl AccessControl {
    /// Unrestricted access, no sensitivity check
    pub fn unrestricted() -> Self {
        Self {
            federal_access_allowed: true,
            ..Default::default()
        }
    }

    pub fn with_federal_access(mut self, allowed: bool) -> Self {
        self.federal_access_allowed = allowed;
        self
    }

    /// Require a sensitivity check limited to the given levels
    pub fn with_sensitivity_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitivity_check_required = true;
        self.allowed_sensitivity_levels = levels.into_iter().map(Into::into).collect();
        self
    }

    /// Build from the raw attribute strings upstream gateways forward.
    ///
    /// Federal access is granted unless the attribute is missing or `No`.
    /// The check flag is on only for `true`. Levels are `,`, `|` or `^` separated.
    pub fn from_header_values(
        federal_access: Option<&str>,
        check_required: Option<&str>,
        levels: Option<&str>,
    ) -> Self {
        let federal_access_allowed =
            matches!(federal_access, Some(v) if !v.trim().eq_ignore_ascii_case("no"));
        let sensitivity_check_required =
            matches!(check_required, Some(v) if v.trim().eq_ignore_ascii_case("true"));
        let allowed_sensitivity_levels = levels
            .map(split_levels)
            .unwrap_or_default()
            .into_iter()
            .collect();

        Self {
            federal_access_allowed,
            sensitivity_check_required,
            allowed_sensitivity_levels,
        }
    }
}

/// Loosely structured search input, created per call
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free-text term; empty means no text constraint
    #[serde(default)]
    #[validate(length(max = 512))]
    pub term: String,

    #[serde(default)]
    pub match_type: MatchType,

    /// Field name to accepted values
    #[serde(default)]
    pub filters: BTreeMap<String, BTreeSet<String>>,

    /// Field name to inclusive date window
    #[serde(default, alias = "dateFilters")]
    pub dates: BTreeMap<String, DateRange>,

    #[serde(default)]
    pub owner: Option<String>,

    /// Never read from a request body; set by the trusted caller
    #[serde(skip)]
    pub access: AccessControl,
}

impl SearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn exact(self) -> Self {
        self.with_match_type(MatchType::Exact)
    }

    /// Accept any of `values` for `field`
    pub fn with_filter<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .entry(field.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_date_range(mut self, field: impl Into<String>, range: DateRange) -> Self {
        self.dates.insert(field.into(), range);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_access(mut self, access: AccessControl) -> Self {
        self.access = access;
        self
    }

    /// Number of fields carrying at least one filter value
    pub fn active_filter_count(&self) -> usize {
        self.filters.values().filter(|v| !v.is_empty()).count()
    }
}

/// Edit-distance tolerance of a typo-tolerant match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Distance chosen from the token length
    Auto,
}

/// One predicate or predicate group of a boolean query
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Always true; never emitted into an assembled query
    MatchAll,
    Term {
        field: String,
        value: String,
        boost: Option<f32>,
    },
    Terms {
        field: String,
        values: Vec<String>,
    },
    MatchPhrasePrefix {
        field: String,
        query: String,
        max_expansions: u32,
    },
    Wildcard {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Typo-tolerant analyzed match; every query token must match
    Match {
        field: String,
        query: String,
        fuzziness: Fuzziness,
    },
    Range {
        field: String,
        gte: String,
        lte: String,
    },
    Exists {
        field: String,
    },
    Bool(BooleanQuery),
}

impl Clause {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Clause::Term {
            field: field.into(),
            value: value.into(),
            boost: None,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Clause::Exists {
            field: field.into(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Clause::MatchAll)
    }

    /// Field the leaf applies to; `None` for groups and match-all
    pub fn field(&self) -> Option<&str> {
        match self {
            Clause::Term { field, .. }
            | Clause::Terms { field, .. }
            | Clause::MatchPhrasePrefix { field, .. }
            | Clause::Wildcard { field, .. }
            | Clause::Match { field, .. }
            | Clause::Range { field, .. }
            | Clause::Exists { field } => Some(field),
            Clause::MatchAll | Clause::Bool(_) => None,
        }
    }
}

/// Boolean clause tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanQuery {
    /// Must match, contributes to score
    pub must: Vec<Clause>,
    /// Must match, no scoring
    pub filter: Vec<Clause>,
    /// At least `minimum_should_match` must match
    pub should: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub minimum_should_match: Option<u32>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group of alternatives where at least one has to match
    pub fn any_of(clauses: Vec<Clause>) -> Self {
        Self {
            should: clauses,
            minimum_should_match: Some(1),
            ..Default::default()
        }
    }

    pub fn must(mut self, clause: Clause) -> Self {
        self.must.push(clause);
        self
    }

    pub fn filter(mut self, clause: Clause) -> Self {
        self.filter.push(clause);
        self
    }

    pub fn should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    pub fn must_not(mut self, clause: Clause) -> Self {
        self.must_not.push(clause);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
    }

    /// Wrap as a clause, collapsing an empty group to match-all
    pub fn into_clause(self) -> Clause {
        if self.is_empty() {
            Clause::MatchAll
        } else {
            Clause::Bool(self)
        }
    }

    /// Conjoin `clause` into this query.
    ///
    /// Match-all is dropped. A group without `should` alternatives is
    /// flattened into the matching sections; anything else becomes a `must`.
    pub fn absorb(&mut self, clause: Clause) {
        match clause {
            Clause::MatchAll => {}
            Clause::Bool(group) if group.should.is_empty() => {
                self.must.extend(group.must);
                self.filter.extend(group.filter);
                self.must_not.extend(group.must_not);
            }
            other => self.must.push(other),
        }
    }

    /// Number of direct clauses across all sections
    pub fn clause_count(&self) -> usize {
        self.must.len() + self.filter.len() + self.should.len() + self.must_not.len()
    }

    /// Every leaf clause in the tree, depth first
    pub fn leaves(&self) -> Vec<&Clause> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Clause>) {
        for clause in self
            .must
            .iter()
            .chain(&self.filter)
            .chain(&self.should)
            .chain(&self.must_not)
        {
            match clause {
                Clause::Bool(group) => group.collect_leaves(out),
                leaf => out.push(leaf),
            }
        }
    }
}
