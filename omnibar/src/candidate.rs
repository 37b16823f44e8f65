//! Search candidate with memoized derived state.
//!
//! Module isolation ensures no code outside this module can mutate the field text
//! after construction, so the `OnceLock` caches can never go stale.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interface::{CandidateAction, CandidateKind, SearchField};
use crate::tokenizer::NormalizedText;

/// A single item eligible to appear in results, as supplied by a candidate source.
/// Normalized field text is computed on first access and cached, so a candidate
/// matched against several tokens only normalizes each field once.
#[derive(Clone)]
pub struct SearchCandidate {
    id: String,
    kind: CandidateKind,
    title: String,
    url: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    supplemental_text: Option<String>,
    searchable_fields: Vec<SearchField>,
    score_modifier: Option<f64>,
    action: Option<Arc<dyn CandidateAction>>,
    normalized: [OnceLock<Option<NormalizedText>>; 3],
}

impl fmt::Debug for SearchCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCandidate")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("timestamp", &self.timestamp)
            .field("supplemental_text", &self.supplemental_text)
            .field("searchable_fields", &self.searchable_fields)
            .field("score_modifier", &self.score_modifier)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

impl SearchCandidate {
    pub fn builder(id: impl Into<String>, kind: CandidateKind, title: impl Into<String>) -> CandidateBuilder {
        CandidateBuilder {
            id: id.into(),
            kind,
            title: title.into(),
            url: None,
            timestamp: None,
            supplemental_text: None,
            searchable_fields: None,
            score_modifier: None,
            action: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CandidateKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn supplemental_text(&self) -> Option<&str> {
        self.supplemental_text.as_deref()
    }

    pub fn searchable_fields(&self) -> &[SearchField] {
        &self.searchable_fields
    }

    pub fn score_modifier(&self) -> Option<f64> {
        self.score_modifier
    }

    pub fn action(&self) -> Option<&Arc<dyn CandidateAction>> {
        self.action.as_ref()
    }

    /// Raw text of a field, if the candidate has one
    pub fn field_text(&self, field: SearchField) -> Option<&str> {
        match field {
            SearchField::Title => Some(self.title.as_str()),
            SearchField::Url => self.url.as_deref(),
            SearchField::SupplementalText => self.supplemental_text.as_deref(),
        }
    }

    /// Normalized text of a field, memoized
    pub fn normalized_field(&self, field: SearchField) -> Option<&NormalizedText> {
        let slot = match field {
            SearchField::Title => &self.normalized[0],
            SearchField::Url => &self.normalized[1],
            SearchField::SupplementalText => &self.normalized[2],
        };
        slot.get_or_init(|| self.field_text(field).map(NormalizedText::new)).as_ref()
    }
}

pub struct CandidateBuilder {
    id: String,
    kind: CandidateKind,
    title: String,
    url: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    supplemental_text: Option<String>,
    searchable_fields: Option<Vec<SearchField>>,
    score_modifier: Option<f64>,
    action: Option<Arc<dyn CandidateAction>>,
}

impl CandidateBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn supplemental_text(mut self, text: impl Into<String>) -> Self {
        self.supplemental_text = Some(text.into());
        self
    }

    /// Override which fields are matched. Defaults to title, plus url when set.
    pub fn searchable_fields(mut self, fields: &[SearchField]) -> Self {
        self.searchable_fields = Some(fields.to_vec());
        self
    }

    pub fn score_modifier(mut self, modifier: f64) -> Self {
        self.score_modifier = Some(modifier);
        self
    }

    pub fn action(mut self, action: Arc<dyn CandidateAction>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn build(self) -> SearchCandidate {
        let mut searchable_fields = self.searchable_fields.unwrap_or_else(|| {
            let mut fields = vec![SearchField::Title];
            if self.url.is_some() {
                fields.push(SearchField::Url);
            }
            fields
        });
        searchable_fields.sort_unstable();
        searchable_fields.dedup();

        SearchCandidate {
            id: self.id,
            kind: self.kind,
            title: self.title,
            url: self.url,
            timestamp: self.timestamp,
            supplemental_text: self.supplemental_text,
            searchable_fields,
            score_modifier: self.score_modifier,
            action: self.action,
            normalized: Default::default(),
        }
    }
}

/// Serialized form of a candidate, as loaded from JSON by hosts and tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub kind: CandidateKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplemental_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable_fields: Option<Vec<SearchField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_modifier: Option<f64>,
}

impl From<CandidateRecord> for SearchCandidate {
    fn from(record: CandidateRecord) -> Self {
        let mut builder = SearchCandidate::builder(record.id, record.kind, record.title);
        if let Some(url) = record.url {
            builder = builder.url(url);
        }
        if let Some(ts) = record.timestamp {
            builder = builder.timestamp(ts);
        }
        if let Some(text) = record.supplemental_text {
            builder = builder.supplemental_text(text);
        }
        if let Some(fields) = record.searchable_fields {
            builder = builder.searchable_fields(&fields);
        }
        if let Some(modifier) = record.score_modifier {
            builder = builder.score_modifier(modifier);
        }
        builder.build()
    }
}

impl From<&SearchCandidate> for CandidateRecord {
    fn from(c: &SearchCandidate) -> Self {
        CandidateRecord {
            id: c.id.clone(),
            kind: c.kind,
            title: c.title.clone(),
            url: c.url.clone(),
            timestamp: c.timestamp,
            supplemental_text: c.supplemental_text.clone(),
            searchable_fields: Some(c.searchable_fields.clone()),
            score_modifier: c.score_modifier,
        }
    }
}
