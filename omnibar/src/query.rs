//! Query parsing and bang resolution.
//!
//! A bang is a `!trigger` token (`!w`, `!gh`) that scopes a query to one site. The
//! registry of known bangs is an immutable table handed to the parser by the host.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::interface::OmniError;
use crate::tokenizer::{normalize, tokenize};

/// Placeholder replaced with the encoded arguments in a bang's search template
pub const TEMPLATE_PLACEHOLDER: &str = "{{{s}}}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BangDefinition {
    /// Always stored lowercase with a leading `!`
    pub trigger: String,
    pub domain: String,
    pub search_template: String,
    pub site_name: String,
    /// Popularity; higher is more popular
    #[serde(default)]
    pub rank: u32,
}

impl BangDefinition {
    /// Expand the search template with `args`, form-urlencoded.
    pub fn search_url(&self, args: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(args.as_bytes()).collect();
        self.search_template.replace(TEMPLATE_PLACEHOLDER, &encoded)
    }
}

/// Lookup table of bangs keyed by trigger
#[derive(Debug, Clone, Default)]
pub struct BangRegistry {
    bangs: HashMap<String, Arc<BangDefinition>>,
}

impl BangRegistry {
    pub fn new(definitions: impl IntoIterator<Item = BangDefinition>) -> Result<Self, OmniError> {
        let mut bangs = HashMap::new();
        for mut def in definitions {
            def.trigger = normalize_trigger(&def.trigger)?;
            if def.domain.trim().is_empty() {
                return Err(OmniError::InvalidBangTable(format!("bang {} has no domain", def.trigger)));
            }
            if bangs.contains_key(&def.trigger) {
                return Err(OmniError::InvalidBangTable(format!("duplicate trigger {}", def.trigger)));
            }
            bangs.insert(def.trigger.clone(), Arc::new(def));
        }
        Ok(Self { bangs })
    }

    /// Load a JSON array of bang definitions
    pub fn from_json(json: &str) -> Result<Self, OmniError> {
        let defs: Vec<BangDefinition> =
            serde_json::from_str(json).map_err(|e| OmniError::InvalidBangTable(e.to_string()))?;
        Self::new(defs)
    }

    /// A small table of widely used bangs
    pub fn builtin() -> Self {
        let defs = BUILTIN_BANGS
            .iter()
            .map(|&(trigger, domain, template, site_name, rank)| BangDefinition {
                trigger: trigger.to_string(),
                domain: domain.to_string(),
                search_template: template.to_string(),
                site_name: site_name.to_string(),
                rank,
            })
            .map(|def| (def.trigger.clone(), Arc::new(def)))
            .collect();
        Self { bangs: defs }
    }

    pub fn get(&self, trigger: &str) -> Option<&Arc<BangDefinition>> {
        self.bangs.get(trigger)
    }

    pub fn len(&self) -> usize {
        self.bangs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bangs.is_empty()
    }

    /// Bangs whose trigger starts with `prefix`, most popular first
    pub fn suggestions(&self, prefix: &str) -> Vec<Arc<BangDefinition>> {
        let mut found: Vec<Arc<BangDefinition>> = self
            .bangs
            .values()
            .filter(|def| def.trigger.starts_with(prefix))
            .cloned()
            .collect();
        found.sort_unstable_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.trigger.cmp(&b.trigger)));
        found
    }
}

/// Triggers must survive tokenization intact to ever be matched.
fn normalize_trigger(raw: &str) -> Result<String, OmniError> {
    let trimmed = raw.trim();
    let with_bang = if trimmed.starts_with('!') {
        trimmed.to_string()
    } else {
        format!("!{trimmed}")
    };
    let tokens = tokenize(&with_bang);
    match tokens.as_slice() {
        [single] if single.chars().count() > 1 && *single == normalize(&with_bang) => Ok(single.clone()),
        _ => Err(OmniError::InvalidBangTable(format!("unusable trigger {raw:?}"))),
    }
}

const BUILTIN_BANGS: &[(&str, &str, &str, &str, u32)] = &[
    ("!w", "wikipedia.org", "https://en.wikipedia.org/w/index.php?search={{{s}}}", "Wikipedia", 900),
    ("!g", "google.com", "https://www.google.com/search?q={{{s}}}", "Google", 1000),
    ("!gh", "github.com", "https://github.com/search?q={{{s}}}", "GitHub", 700),
    ("!yt", "youtube.com", "https://www.youtube.com/results?search_query={{{s}}}", "YouTube", 800),
    ("!so", "stackoverflow.com", "https://stackoverflow.com/search?q={{{s}}}", "Stack Overflow", 500),
    ("!a", "amazon.com", "https://www.amazon.com/s?k={{{s}}}", "Amazon", 850),
    ("!r", "reddit.com", "https://www.reddit.com/search/?q={{{s}}}", "Reddit", 600),
    ("!maps", "maps.google.com", "https://www.google.com/maps/search/{{{s}}}", "Google Maps", 400),
    ("!docs", "docs.rs", "https://docs.rs/releases/search?query={{{s}}}", "Docs.rs", 300),
];

/// A parsed omnibar query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub raw_text: String,
    pub tokens: Vec<String>,
    /// Set when the whole query is a single `!token`
    pub potential_bang_text: Option<String>,
    pub active_bang: Option<Arc<BangDefinition>>,
    /// Tokens without the trigger; `Some` only when a bang is active
    pub bang_argument_tokens: Option<Vec<String>>,
}

impl Query {
    pub fn parse(raw_text: &str, bangs: &BangRegistry) -> Self {
        let raw_text = raw_text.trim().to_string();
        let tokens = tokenize(&raw_text);

        let potential_bang_text = match tokens.as_slice() {
            [only] if only.starts_with('!') && only.chars().count() > 1 => Some(only.clone()),
            _ => None,
        };

        let active = tokens
            .iter()
            .enumerate()
            .find_map(|(i, t)| bangs.get(t).map(|def| (i, Arc::clone(def))));

        let (active_bang, bang_argument_tokens) = match active {
            Some((idx, def)) => {
                let args = tokens
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != idx)
                    .map(|(_, t)| t.clone())
                    .collect();
                (Some(def), Some(args))
            }
            None => (None, None),
        };

        Self {
            raw_text,
            tokens,
            potential_bang_text,
            active_bang,
            bang_argument_tokens,
        }
    }

    /// Tokens every result has to match: the bang arguments when a bang is active,
    /// otherwise all tokens.
    pub fn active_tokens(&self) -> &[String] {
        self.bang_argument_tokens.as_deref().unwrap_or(&self.tokens)
    }

    /// Argument tokens with the active bang's domain in front, for sources that can
    /// restrict themselves to one site. `None` without an active bang.
    pub fn domain_scoped_tokens(&self) -> Option<Vec<String>> {
        let bang = self.active_bang.as_ref()?;
        let mut scoped = vec![bang.domain.to_lowercase()];
        scoped.extend(self.active_tokens().iter().cloned());
        Some(scoped)
    }

    /// Argument text as typed, with the trigger word removed
    pub fn bang_argument_text(&self) -> Option<String> {
        let bang = self.active_bang.as_ref()?;
        let args: Vec<&str> = self
            .raw_text
            .split_whitespace()
            .filter(|word| normalize(word) != bang.trigger)
            .collect();
        Some(args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BangRegistry {
        BangRegistry::builtin()
    }

    #[test]
    fn test_parse_plain_query() {
        let q = Query::parse("  Zillow 17  ", &registry());
        assert_eq!(q.raw_text, "Zillow 17");
        assert_eq!(q.tokens, vec!["zillow", "17"]);
        assert!(q.potential_bang_text.is_none());
        assert!(q.active_bang.is_none());
        assert!(q.bang_argument_tokens.is_none());
        assert_eq!(q.active_tokens(), &["zillow".to_string(), "17".to_string()]);
    }

    #[test]
    fn test_parse_active_bang() {
        let q = Query::parse("rust !w ownership", &registry());
        let bang = q.active_bang.as_ref().unwrap();
        assert_eq!(bang.site_name, "Wikipedia");
        assert_eq!(q.bang_argument_tokens.as_deref().unwrap(), &["rust".to_string(), "ownership".to_string()]);
        assert_eq!(q.bang_argument_text().unwrap(), "rust ownership");
        assert_eq!(
            q.domain_scoped_tokens().unwrap(),
            vec!["wikipedia.org".to_string(), "rust".to_string(), "ownership".to_string()]
        );
    }

    #[test]
    fn test_first_matching_trigger_wins() {
        let q = Query::parse("!gh !w tokio", &registry());
        assert_eq!(q.active_bang.as_ref().unwrap().trigger, "!gh");
        assert_eq!(q.bang_argument_tokens.unwrap(), vec!["!w".to_string(), "tokio".to_string()]);
    }

    #[test]
    fn test_potential_bang_text() {
        let q = Query::parse("!wi", &registry());
        assert_eq!(q.potential_bang_text.as_deref(), Some("!wi"));
        assert!(q.active_bang.is_none());

        // Registered trigger alone is both potential and active
        let q = Query::parse("!w", &registry());
        assert_eq!(q.potential_bang_text.as_deref(), Some("!w"));
        assert!(q.active_bang.is_some());
        assert!(q.active_tokens().is_empty());

        assert!(Query::parse("!", &registry()).potential_bang_text.is_none());
        assert!(Query::parse("!w rust", &registry()).potential_bang_text.is_none());
    }

    #[test]
    fn test_trigger_match_is_case_insensitive() {
        let q = Query::parse("!GH serde", &registry());
        assert_eq!(q.active_bang.unwrap().trigger, "!gh");
    }

    #[test]
    fn test_empty_query() {
        let q = Query::parse("   ", &registry());
        assert!(q.tokens.is_empty());
        assert!(q.active_tokens().is_empty());
    }

    #[test]
    fn test_search_url_encodes_arguments() {
        let reg = registry();
        let bang = reg.get("!w").unwrap();
        assert_eq!(
            bang.search_url("rust & c++"),
            "https://en.wikipedia.org/w/index.php?search=rust+%26+c%2B%2B"
        );
    }

    #[test]
    fn test_registry_from_json_normalizes_triggers() {
        let reg = BangRegistry::from_json(
            r#"[{"trigger": "MDN", "domain": "developer.mozilla.org",
                 "search_template": "https://developer.mozilla.org/search?q={{{s}}}",
                 "site_name": "MDN", "rank": 42}]"#,
        )
        .unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("!mdn").unwrap().rank, 42);
    }

    #[test]
    fn test_registry_rejects_bad_tables() {
        let dup = r#"[
            {"trigger": "!x", "domain": "x.com", "search_template": "", "site_name": "X"},
            {"trigger": "x", "domain": "x.com", "search_template": "", "site_name": "X"}
        ]"#;
        assert!(matches!(BangRegistry::from_json(dup), Err(OmniError::InvalidBangTable(_))));

        let split = r#"[{"trigger": "!a-b", "domain": "ab.com", "search_template": "", "site_name": "AB"}]"#;
        assert!(matches!(BangRegistry::from_json(split), Err(OmniError::InvalidBangTable(_))));

        let no_domain = r#"[{"trigger": "!z", "domain": " ", "search_template": "", "site_name": "Z"}]"#;
        assert!(matches!(BangRegistry::from_json(no_domain), Err(OmniError::InvalidBangTable(_))));
    }

    #[test]
    fn test_suggestions_sorted_by_rank() {
        let reg = registry();
        let triggers: Vec<String> = reg.suggestions("!g").iter().map(|d| d.trigger.clone()).collect();
        assert_eq!(triggers, vec!["!g".to_string(), "!gh".to_string()]);
    }
}
