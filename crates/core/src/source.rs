use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// The declarative source list, loaded once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,
}

impl SourceConfig {
    pub fn from_json(input: &str) -> Result<Self, CoreError> {
        let config: SourceConfig =
            serde_json::from_str(input).map_err(|e| CoreError::SourceConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.source_id.trim().is_empty() {
                return Err(CoreError::SourceConfigValidation(
                    "source_id must not be empty".into(),
                ));
            }
            if !seen.insert(source.source_id.as_str()) {
                return Err(CoreError::SourceConfigValidation(format!(
                    "duplicate source_id '{}'",
                    source.source_id
                )));
            }
            if source.endpoint.trim().is_empty() {
                return Err(CoreError::SourceConfigValidation(format!(
                    "source '{}': endpoint must not be empty",
                    source.source_id
                )));
            }
            if let Pagination::Page { max_pages, .. } = source.pagination {
                if max_pages == 0 {
                    return Err(CoreError::SourceConfigValidation(format!(
                        "source '{}': max_pages must be at least 1",
                        source.source_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Enabled sources in declaration order. Merge order downstream depends on this.
    pub fn enabled(&self) -> impl Iterator<Item = &SourceDefinition> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceDefinition> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }
}

// ---------------------------------------------------------------------------
// Source definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub source_id: String,
    pub kind: SourceKind,
    /// URL for `http_json`, path relative to the pipeline root for `file_json`.
    pub endpoint: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub auth: AuthDescriptor,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub mapping: FieldMapping,
    #[serde(default)]
    pub fallback_official_url: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub primary: bool,
}

impl SourceDefinition {
    /// Page size for `page` pagination: `params[size_param]`, else 100.
    pub fn page_size(&self, size_param: &str) -> usize {
        match self.params.get(size_param) {
            Some(serde_json::Value::Number(n)) => n.as_u64().map(|v| v as usize).unwrap_or(100),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(100),
            _ => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    FileJson,
    HttpJson,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileJson => write!(f, "file_json"),
            Self::HttpJson => write!(f, "http_json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth + pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthDescriptor {
    #[default]
    None,
    /// Secret from the environment injected as a query parameter.
    QueryKey {
        env_key: String,
        #[serde(default = "default_param_name")]
        param_name: String,
    },
}

fn default_param_name() -> String {
    "serviceKey".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Pagination {
    #[default]
    None,
    Page {
        #[serde(default = "default_page_param")]
        page_param: String,
        #[serde(default = "default_size_param")]
        size_param: String,
        #[serde(default = "default_start_page")]
        start_page: u32,
        #[serde(default = "default_max_pages")]
        max_pages: u32,
    },
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_size_param() -> String {
    "perPage".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_max_pages() -> u32 {
    3
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// One or more source field names for a canonical field. First non-empty wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldCandidates {
    One(String),
    Many(Vec<String>),
}

/// Canonical fields that can be mapped from a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Id,
    Title,
    Region,
    TargetGroup,
    Category,
    Eligibility,
    Benefit,
    ApplicationPeriod,
    OfficialUrl,
    SourceOrg,
    UpdatedAt,
}

impl CanonicalField {
    /// Row key used when the mapping does not name this field.
    pub fn default_key(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Region => "region",
            Self::TargetGroup => "target_group",
            Self::Category => "category",
            Self::Eligibility => "eligibility_text",
            Self::Benefit => "benefit_text",
            Self::ApplicationPeriod => "application_period_text",
            Self::OfficialUrl => "official_url",
            Self::SourceOrg => "source_org",
            Self::UpdatedAt => "source_updated_at",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Dotted path to the row list inside the payload. Empty = payload is the list.
    #[serde(default)]
    pub items_path: String,
    #[serde(default)]
    pub id_field: Option<FieldCandidates>,
    #[serde(default)]
    pub title_field: Option<FieldCandidates>,
    #[serde(default)]
    pub region_field: Option<FieldCandidates>,
    #[serde(default)]
    pub target_field: Option<FieldCandidates>,
    #[serde(default)]
    pub category_field: Option<FieldCandidates>,
    #[serde(default)]
    pub eligibility_field: Option<FieldCandidates>,
    #[serde(default)]
    pub benefit_field: Option<FieldCandidates>,
    #[serde(default)]
    pub application_period_field: Option<FieldCandidates>,
    #[serde(default)]
    pub official_url_field: Option<FieldCandidates>,
    #[serde(default)]
    pub source_org_field: Option<FieldCandidates>,
    #[serde(default)]
    pub updated_field: Option<FieldCandidates>,
}

impl FieldMapping {
    fn entry(&self, field: CanonicalField) -> Option<&FieldCandidates> {
        match field {
            CanonicalField::Id => self.id_field.as_ref(),
            CanonicalField::Title => self.title_field.as_ref(),
            CanonicalField::Region => self.region_field.as_ref(),
            CanonicalField::TargetGroup => self.target_field.as_ref(),
            CanonicalField::Category => self.category_field.as_ref(),
            CanonicalField::Eligibility => self.eligibility_field.as_ref(),
            CanonicalField::Benefit => self.benefit_field.as_ref(),
            CanonicalField::ApplicationPeriod => self.application_period_field.as_ref(),
            CanonicalField::OfficialUrl => self.official_url_field.as_ref(),
            CanonicalField::SourceOrg => self.source_org_field.as_ref(),
            CanonicalField::UpdatedAt => self.updated_field.as_ref(),
        }
    }

    /// Ordered candidate row keys for `field`.
    ///
    /// A list keeps its trimmed non-empty entries (possibly none, which means
    /// the field always falls back to its default). A blank or missing string
    /// falls back to the canonical key.
    pub fn candidates(&self, field: CanonicalField) -> Vec<&str> {
        match self.entry(field) {
            Some(FieldCandidates::Many(keys)) => keys
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .collect(),
            Some(FieldCandidates::One(key)) if !key.trim().is_empty() => vec![key.trim()],
            _ => vec![field.default_key()],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
      "sources": [
        {
          "source_id": "kr_policy_fixture",
          "kind": "file_json",
          "endpoint": "data/fixtures/policies.json",
          "mapping": { "items_path": "data.items", "title_field": ["pblancNm", "title"] },
          "enabled": true,
          "primary": false
        },
        {
          "source_id": "kr_policy_bizinfo",
          "kind": "http_json",
          "endpoint": "https://apis.example.kr/bizinfo",
          "params": { "perPage": 50 },
          "auth": { "type": "query_key", "env_key": "DATA_GO_KR_API_KEY" },
          "pagination": { "mode": "page", "max_pages": 5 },
          "enabled": true,
          "primary": true
        },
        {
          "source_id": "disabled_source",
          "kind": "file_json",
          "endpoint": "x.json"
        }
      ]
    }"#;

    #[test]
    fn parse_valid_config() {
        let config = SourceConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.enabled().count(), 2);

        let http = config.get("kr_policy_bizinfo").unwrap();
        assert_eq!(http.kind, SourceKind::HttpJson);
        assert!(http.primary);
        assert_eq!(
            http.auth,
            AuthDescriptor::QueryKey {
                env_key: "DATA_GO_KR_API_KEY".into(),
                param_name: "serviceKey".into(),
            }
        );
        match &http.pagination {
            Pagination::Page { page_param, size_param, start_page, max_pages } => {
                assert_eq!(page_param, "page");
                assert_eq!(size_param, "perPage");
                assert_eq!(*start_page, 1);
                assert_eq!(*max_pages, 5);
            }
            other => panic!("expected page pagination, got {other:?}"),
        }
        assert_eq!(http.page_size("perPage"), 50);

        let disabled = config.get("disabled_source").unwrap();
        assert!(!disabled.enabled);
        assert_eq!(disabled.auth, AuthDescriptor::None);
        assert_eq!(disabled.pagination, Pagination::None);
    }

    #[test]
    fn page_size_defaults_to_100() {
        let config = SourceConfig::from_json(CONFIG).unwrap();
        let fixture = config.get("kr_policy_fixture").unwrap();
        assert_eq!(fixture.page_size("perPage"), 100);
    }

    #[test]
    fn candidates_resolution() {
        let config = SourceConfig::from_json(CONFIG).unwrap();
        let mapping = &config.get("kr_policy_fixture").unwrap().mapping;
        assert_eq!(mapping.candidates(CanonicalField::Title), vec!["pblancNm", "title"]);
        assert_eq!(mapping.candidates(CanonicalField::Region), vec!["region"]);
        assert_eq!(mapping.candidates(CanonicalField::Id), vec!["id"]);

        let blank = FieldMapping {
            region_field: Some(FieldCandidates::One("  ".into())),
            category_field: Some(FieldCandidates::Many(vec![" ".into()])),
            ..Default::default()
        };
        assert_eq!(blank.candidates(CanonicalField::Region), vec!["region"]);
        assert!(blank.candidates(CanonicalField::Category).is_empty());
    }

    #[test]
    fn reject_unknown_kind() {
        let input = r#"{"sources":[{"source_id":"a","kind":"ftp","endpoint":"x"}]}"#;
        let err = SourceConfig::from_json(input).unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn reject_unknown_auth_type() {
        let input = r#"{"sources":[{"source_id":"a","kind":"http_json","endpoint":"https://x","auth":{"type":"oauth"}}]}"#;
        assert!(SourceConfig::from_json(input).is_err());
    }

    #[test]
    fn reject_duplicate_source_id() {
        let input = r#"{"sources":[
            {"source_id":"a","kind":"file_json","endpoint":"x.json"},
            {"source_id":"a","kind":"file_json","endpoint":"y.json"}
        ]}"#;
        let err = SourceConfig::from_json(input).unwrap_err();
        assert!(err.to_string().contains("duplicate source_id 'a'"));
    }
}
