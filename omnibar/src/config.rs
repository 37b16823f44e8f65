//! Engine tunables.
//!
//! Every weight the scorer and assembler use lives here so hosts can load a
//! different table from JSON. Defaults keep the kind weights strictly ordered
//! Url > Search > Command > Tab > Bookmark > RecentlyClosed > History.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::interface::{CandidateKind, OmniError, SearchField};

/// Default cap on returned results
pub const DEFAULT_MAX_RESULTS: usize = 20;
/// Recency bonus for something visited right now
pub const DEFAULT_MAX_RECENCY_BONUS: f64 = 100.0;
/// Half-life for recency decay: 24 hours
pub const DEFAULT_RECENCY_HALF_LIFE_SECS: f64 = 24.0 * 60.0 * 60.0;
/// Bang popularity ranks are divided by this before becoming a score modifier
pub const DEFAULT_BANG_RANK_SCALE: f64 = 1000.0;
/// `{{{s}}}` is replaced with the URL-encoded query
pub const DEFAULT_SEARCH_TEMPLATE: &str = "https://duckduckgo.com/?q={{{s}}}";

/// Weight of a single occurrence, by how it sits in the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccurrenceWeights {
    pub exact: f64,
    pub prefix: f64,
    pub word_start: f64,
    pub substring: f64,
}

impl Default for OccurrenceWeights {
    fn default() -> Self {
        Self { exact: 100.0, prefix: 80.0, word_start: 60.0, substring: 10.0 }
    }
}

/// Multiplier applied to occurrences found in each field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f64,
    pub url: f64,
    pub supplemental_text: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self { title: 1.5, url: 1.2, supplemental_text: 0.8 }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: SearchField) -> f64 {
        match field {
            SearchField::Title => self.title,
            SearchField::Url => self.url,
            SearchField::SupplementalText => self.supplemental_text,
        }
    }
}

/// Base score added once per surviving candidate, by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub url: f64,
    pub search: f64,
    pub command: f64,
    pub tab: f64,
    pub bookmark: f64,
    pub recently_closed: f64,
    pub history: f64,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            url: 50.0,
            search: 40.0,
            command: 30.0,
            tab: 20.0,
            bookmark: 15.0,
            recently_closed: 10.0,
            history: 5.0,
        }
    }
}

impl KindWeights {
    pub fn weight(&self, kind: CandidateKind) -> f64 {
        match kind {
            CandidateKind::Url => self.url,
            CandidateKind::Search => self.search,
            CandidateKind::Command => self.command,
            CandidateKind::Tab => self.tab,
            CandidateKind::Bookmark => self.bookmark,
            CandidateKind::RecentlyClosed => self.recently_closed,
            CandidateKind::History => self.history,
        }
    }

    /// Kinds from highest to lowest required weight
    const PRECEDENCE: [CandidateKind; 7] = [
        CandidateKind::Url,
        CandidateKind::Search,
        CandidateKind::Command,
        CandidateKind::Tab,
        CandidateKind::Bookmark,
        CandidateKind::RecentlyClosed,
        CandidateKind::History,
    ];

    fn is_strictly_ordered(&self) -> bool {
        Self::PRECEDENCE
            .windows(2)
            .all(|pair| self.weight(pair[0]) > self.weight(pair[1]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_weights"))]
pub struct EngineConfig {
    pub occurrence_weights: OccurrenceWeights,
    pub field_weights: FieldWeights,
    pub kind_weights: KindWeights,
    #[validate(range(min = 0.0))]
    pub max_recency_bonus: f64,
    #[validate(range(min = 1.0))]
    pub recency_half_life_secs: f64,
    #[validate(range(min = 1, max = 10000))]
    pub max_results: usize,
    #[validate(range(min = 1.0))]
    pub bang_rank_scale: f64,
    pub default_search_template: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            occurrence_weights: OccurrenceWeights::default(),
            field_weights: FieldWeights::default(),
            kind_weights: KindWeights::default(),
            max_recency_bonus: DEFAULT_MAX_RECENCY_BONUS,
            recency_half_life_secs: DEFAULT_RECENCY_HALF_LIFE_SECS,
            max_results: DEFAULT_MAX_RESULTS,
            bang_rank_scale: DEFAULT_BANG_RANK_SCALE,
            default_search_template: DEFAULT_SEARCH_TEMPLATE.to_string(),
        }
    }
}

fn validate_weights(config: &EngineConfig) -> Result<(), ValidationError> {
    let o = &config.occurrence_weights;
    let occurrence = [o.exact, o.prefix, o.word_start, o.substring];
    if occurrence.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ValidationError::new("occurrence_weights_negative"));
    }
    let f = &config.field_weights;
    if [f.title, f.url, f.supplemental_text].iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ValidationError::new("field_weights_negative"));
    }
    if !config.max_recency_bonus.is_finite() || !config.recency_half_life_secs.is_finite() {
        return Err(ValidationError::new("recency_not_finite"));
    }
    if !config.kind_weights.is_strictly_ordered() {
        return Err(ValidationError::new("kind_weights_out_of_order"));
    }
    Ok(())
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, OmniError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| OmniError::InvalidConfig(e.to_string()))?;
        config.validated()
    }

    pub fn validated(self) -> Result<Self, OmniError> {
        self.validate().map_err(|e| OmniError::InvalidConfig(e.to_string()))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validated().is_ok());
    }

    #[test]
    fn test_default_kind_order() {
        let w = KindWeights::default();
        assert!(w.weight(CandidateKind::Url) > w.weight(CandidateKind::Search));
        assert!(w.weight(CandidateKind::Search) > w.weight(CandidateKind::Command));
        assert!(w.weight(CandidateKind::Command) > w.weight(CandidateKind::Tab));
        assert!(w.weight(CandidateKind::Tab) > w.weight(CandidateKind::Bookmark));
        assert!(w.weight(CandidateKind::Bookmark) > w.weight(CandidateKind::RecentlyClosed));
        assert!(w.weight(CandidateKind::RecentlyClosed) > w.weight(CandidateKind::History));
    }

    #[test]
    fn test_from_json_partial_overrides() {
        let config = EngineConfig::from_json(r#"{"max_results": 5, "field_weights": {"title": 2.0}}"#).unwrap();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.field_weights.title, 2.0);
        assert_eq!(config.field_weights.url, 1.2);
        assert_eq!(config.recency_half_life_secs, DEFAULT_RECENCY_HALF_LIFE_SECS);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"max_results": 0}"#),
            Err(OmniError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"recency_half_life_secs": 0.0}"#),
            Err(OmniError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"kind_weights": {"history": 500.0}}"#),
            Err(OmniError::InvalidConfig(_))
        ));
        assert!(matches!(EngineConfig::from_json("not json"), Err(OmniError::InvalidConfig(_))));
    }

    #[test]
    fn test_validated_rejects_non_finite_recency() {
        let nan_half_life = EngineConfig { recency_half_life_secs: f64::NAN, ..EngineConfig::default() };
        assert!(matches!(nan_half_life.validated(), Err(OmniError::InvalidConfig(_))));

        let infinite_bonus = EngineConfig { max_recency_bonus: f64::INFINITY, ..EngineConfig::default() };
        assert!(matches!(infinite_bonus.validated(), Err(OmniError::InvalidConfig(_))));
    }
}
