//! Search settings

use serde::{Deserialize, Serialize};

/// Knobs shared by query assembly and execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    /// Ceiling on ranked hits per search; results beyond it are truncated
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Bucket cap of each terms aggregation
    #[serde(default = "default_aggregation_size")]
    pub aggregation_size: usize,

    #[serde(default)]
    pub highlight_pre_tag: String,

    #[serde(default)]
    pub highlight_post_tag: String,

    /// Boost of the exact-keyword alternative in fuzzy mode
    #[serde(default = "default_exact_boost")]
    pub exact_boost: f32,

    /// Term expansions of the phrase-prefix alternative in fuzzy mode
    #[serde(default = "default_prefix_max_expansions")]
    pub prefix_max_expansions: u32,
}

fn default_max_results() -> usize {
    1000
}

fn default_aggregation_size() -> usize {
    2000
}

fn default_exact_boost() -> f32 {
    2.0
}

fn default_prefix_max_expansions() -> u32 {
    50
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            aggregation_size: default_aggregation_size(),
            highlight_pre_tag: String::new(),
            highlight_post_tag: String::new(),
            exact_boost: default_exact_boost(),
            prefix_max_expansions: default_prefix_max_expansions(),
        }
    }
}

/// Builder for SearchSettings
pub struct SearchSettingsBuilder {
    settings: SearchSettings,
}

impl SearchSettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: SearchSettings::default(),
        }
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.settings.max_results = max;
        self
    }

    pub fn aggregation_size(mut self, size: usize) -> Self {
        self.settings.aggregation_size = size;
        self
    }

    /// Wrap highlighted fragments, e.g. `<strong>` / `</strong>`
    pub fn highlight_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.settings.highlight_pre_tag = pre.into();
        self.settings.highlight_post_tag = post.into();
        self
    }

    pub fn exact_boost(mut self, boost: f32) -> Self {
        self.settings.exact_boost = boost;
        self
    }

    pub fn prefix_max_expansions(mut self, expansions: u32) -> Self {
        self.settings.prefix_max_expansions = expansions;
        self
    }

    pub fn build(self) -> SearchSettings {
        self.settings
    }
}

impl Default for SearchSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
