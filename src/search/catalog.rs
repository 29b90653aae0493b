//! Field catalog
//!
//! The catalog is the single source of truth for which index fields take part
//! in free-text search, filtering, highlighting and faceting. Every field name
//! that reaches a query clause is resolved through it first.

use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Suffix of the non-tokenized sub-field the index mapping creates for text fields
pub const KEYWORD_SUFFIX: &str = ".keyword";

/// Suffix of the keyword sub-field indexed through a lowercase,
/// punctuation-stripping normalizer, so `ORD-1009` is stored as `ord1009`
pub const NORMALIZED_SUFFIX: &str = ".normalized";

/// Storage kind of a catalog field
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Text field with a keyword-exact variant
    #[default]
    Keyword,
    /// Date field, filtered by range only
    Date,
}

/// Descriptor of one logical index field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Logical (and analyzed) field name
    pub name: String,

    /// Keyword-exact variant; defaults to `<name>.keyword` for keyword fields
    #[serde(default)]
    pub keyword: Option<String>,

    /// Normalized keyword variant; defaults to `<name>.normalized` for keyword fields
    #[serde(default)]
    pub normalized: Option<String>,

    #[serde(default)]
    pub kind: FieldKind,

    /// Participates in free-text search and highlighting
    #[serde(default)]
    pub searchable: bool,

    /// May be named in a categorical or date filter
    #[serde(default)]
    pub filterable: bool,

    /// Gets a terms aggregation in every search
    #[serde(default)]
    pub aggregatable: bool,
}

impl FieldDescriptor {
    /// Keyword field that is searchable, filterable and faceted
    pub fn keyword(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyword: None,
            normalized: None,
            kind: FieldKind::Keyword,
            searchable: true,
            filterable: true,
            aggregatable: true,
        }
    }

    /// Date field usable in range filters
    pub fn date(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyword: None,
            normalized: None,
            kind: FieldKind::Date,
            searchable: false,
            filterable: true,
            aggregatable: false,
        }
    }

    /// Keyword field used only by access control
    pub fn restricted(name: impl Into<String>) -> Self {
        Self {
            searchable: false,
            filterable: false,
            aggregatable: false,
            ..Self::keyword(name)
        }
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn with_aggregatable(mut self, aggregatable: bool) -> Self {
        self.aggregatable = aggregatable;
        self
    }

    /// Field to use for exact matching, filtering and faceting
    pub fn exact_field(&self) -> &str {
        self.keyword.as_deref().unwrap_or(&self.name)
    }

    /// Field to use for format-insensitive matching, if the mapping has one
    pub fn normalized_field(&self) -> Option<&str> {
        self.normalized.as_deref()
    }

    pub fn is_date(&self) -> bool {
        self.kind == FieldKind::Date
    }
}

/// Names of the catalog fields that carry access-control attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessFields {
    #[serde(default = "default_federal_flag_field")]
    pub federal_flag_field: String,

    /// Value marking a document as federally restricted
    #[serde(default = "default_federal_flag_value")]
    pub federal_flag_value: String,

    #[serde(default = "default_sensitivity_field")]
    pub sensitivity_field: String,

    #[serde(default = "default_owner_field")]
    pub owner_field: String,
}

impl Default for AccessFields {
    fn default() -> Self {
        Self {
            federal_flag_field: default_federal_flag_field(),
            federal_flag_value: default_federal_flag_value(),
            sensitivity_field: default_sensitivity_field(),
            owner_field: default_owner_field(),
        }
    }
}

fn default_federal_flag_field() -> String {
    "federalFlag".to_string()
}

fn default_federal_flag_value() -> String {
    "FEDERAL".to_string()
}

fn default_sensitivity_field() -> String {
    "gsamSensitivityLevel".to_string()
}

fn default_owner_field() -> String {
    "userName".to_string()
}

/// Ordered, validated set of field descriptors indexed by name
#[derive(Debug, Clone, Serialize)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
    access: AccessFields,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Validate descriptors and build the catalog
    pub fn new(fields: Vec<FieldDescriptor>, access: AccessFields) -> SearchResult<Self> {
        if fields.is_empty() {
            return Err(SearchError::InvalidCatalog("catalog has no fields".to_string()));
        }

        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(SearchError::InvalidCatalog("field with empty name".to_string()));
            }
            if field.is_date() && (field.searchable || field.aggregatable) {
                return Err(SearchError::InvalidCatalog(format!(
                    "date field '{}' cannot be searchable or aggregatable",
                    field.name
                )));
            }
            for (kind, variant) in [("keyword", &field.keyword), ("normalized", &field.normalized)] {
                if variant.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    return Err(SearchError::InvalidCatalog(format!(
                        "field '{}' has an empty {} variant",
                        field.name, kind
                    )));
                }
            }
        }

        let catalog = Self::index(fields, access);

        if catalog.by_name.len() != catalog.fields.len() {
            return Err(SearchError::InvalidCatalog("duplicate field names".to_string()));
        }

        for name in [
            &catalog.access.federal_flag_field,
            &catalog.access.sensitivity_field,
            &catalog.access.owner_field,
        ] {
            match catalog.get(name) {
                Some(field) if !field.is_date() => {}
                Some(_) => {
                    return Err(SearchError::InvalidCatalog(format!(
                        "access field '{}' must be a keyword field",
                        name
                    )))
                }
                None => {
                    return Err(SearchError::InvalidCatalog(format!(
                        "access field '{}' is not in the catalog",
                        name
                    )))
                }
            }
        }

        Ok(catalog)
    }

    /// Catalog of the order-details index
    pub fn order_details() -> Self {
        let mut fields: Vec<FieldDescriptor> = [
            "orderNumber",
            "fulfillmentStatus",
            "crStatus",
            "centerName",
            "source",
            "workType",
            "queueName",
            "orderActivity",
            "taskName",
            "productType",
            "userName",
        ]
        .into_iter()
        .map(FieldDescriptor::keyword)
        .collect();

        fields.extend(
            ["dueDate", "orderSubmitDate", "orderCreationDate"]
                .into_iter()
                .map(FieldDescriptor::date),
        );
        fields.push(FieldDescriptor::restricted("federalFlag"));
        fields.push(FieldDescriptor::restricted("gsamSensitivityLevel"));

        Self::index(fields, AccessFields::default())
    }

    fn index(fields: Vec<FieldDescriptor>, access: AccessFields) -> Self {
        let fields: Vec<FieldDescriptor> = fields
            .into_iter()
            .map(|mut field| {
                if field.kind == FieldKind::Keyword {
                    field
                        .keyword
                        .get_or_insert_with(|| format!("{}{}", field.name, KEYWORD_SUFFIX));
                    field
                        .normalized
                        .get_or_insert_with(|| format!("{}{}", field.name, NORMALIZED_SUFFIX));
                }
                field
            })
            .collect();

        let by_name = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();

        Self {
            fields,
            access,
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&idx| &self.fields[idx])
    }

    /// Resolve a field name, failing on names outside the catalog
    pub fn require(&self, name: &str) -> SearchResult<&FieldDescriptor> {
        self.get(name)
            .ok_or_else(|| SearchError::UnknownField(name.to_string()))
    }

    /// Resolve a field usable in a categorical filter
    pub fn require_filterable(&self, name: &str) -> SearchResult<&FieldDescriptor> {
        let field = self.require(name)?;
        if !field.filterable || field.is_date() {
            return Err(SearchError::FieldNotFilterable(name.to_string()));
        }
        Ok(field)
    }

    /// Resolve a field usable in a date-range filter
    pub fn require_date(&self, name: &str) -> SearchResult<&FieldDescriptor> {
        let field = self.require(name)?;
        if !field.is_date() {
            return Err(SearchError::FieldNotDate(name.to_string()));
        }
        if !field.filterable {
            return Err(SearchError::FieldNotFilterable(name.to_string()));
        }
        Ok(field)
    }

    /// All descriptors in catalog order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn searchable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.searchable)
    }

    pub fn aggregatable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.aggregatable)
    }

    pub fn access(&self) -> &AccessFields {
        &self.access
    }

    /// Exact-match field of an access attribute; access fields are validated at construction
    pub(crate) fn access_exact_field(&self, name: &str) -> String {
        self.get(name)
            .map(|f| f.exact_field().to_string())
            .unwrap_or_else(|| format!("{}{}", name, KEYWORD_SUFFIX))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::order_details()
    }
}
