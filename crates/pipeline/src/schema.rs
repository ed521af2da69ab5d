//! Embedded JSON Schemas gating config, canonical data and reports.

use jsonschema::Validator;
use serde_json::Value;

use crate::error::PipelineError;

const SOURCES_SCHEMA: &str = include_str!("../schemas/source_connector.v1.schema.json");
const POLICY_SCHEMA: &str = include_str!("../schemas/policy.v1.schema.json");
const QUALITY_SCHEMA: &str = include_str!("../schemas/quality.v1.schema.json");
const MANIFEST_SCHEMA: &str = include_str!("../schemas/manifest.v1.schema.json");

/// Compiled validators for every document the pipeline reads or writes.
pub struct SchemaSet {
    sources: Validator,
    canonical: Validator,
    quality: Validator,
    manifest: Validator,
}

impl SchemaSet {
    pub fn new() -> Result<Self, PipelineError> {
        Ok(Self {
            sources: compile("source_connector.v1", SOURCES_SCHEMA)?,
            canonical: compile("policy.v1", POLICY_SCHEMA)?,
            quality: compile("quality.v1", QUALITY_SCHEMA)?,
            manifest: compile("manifest.v1", MANIFEST_SCHEMA)?,
        })
    }

    pub fn validate_sources(&self, instance: &Value) -> Vec<String> {
        collect(&self.sources, instance)
    }

    pub fn validate_canonical(&self, instance: &Value) -> Vec<String> {
        collect(&self.canonical, instance)
    }

    pub fn validate_quality(&self, instance: &Value) -> Vec<String> {
        collect(&self.quality, instance)
    }

    pub fn validate_manifest(&self, instance: &Value) -> Vec<String> {
        collect(&self.manifest, instance)
    }
}

fn compile(name: &'static str, text: &str) -> Result<Validator, PipelineError> {
    let schema: Value = serde_json::from_str(text).map_err(|e| PipelineError::SchemaCompile {
        name,
        message: e.to_string(),
    })?;
    jsonschema::validator_for(&schema).map_err(|e| PipelineError::SchemaCompile {
        name,
        message: e.to_string(),
    })
}

/// `"<instance path>: <message>"` per violation.
fn collect(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|e| format!("{}: {e}", e.instance_path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_schemas_compile() {
        assert!(SchemaSet::new().is_ok());
    }

    #[test]
    fn sources_schema() {
        let schemas = SchemaSet::new().unwrap();
        let ok = json!({"sources": [{
            "source_id": "a", "kind": "http_json", "endpoint": "https://x",
            "auth": {"type": "query_key", "env_key": "K"},
            "pagination": {"mode": "page", "max_pages": 2},
            "mapping": {"title_field": ["a", "b"]}
        }]});
        assert!(schemas.validate_sources(&ok).is_empty());

        let bad_kind = json!({"sources": [{"source_id": "a", "kind": "ftp", "endpoint": "x"}]});
        assert_eq!(schemas.validate_sources(&bad_kind).len(), 1);

        let keyless = json!({"sources": [{
            "source_id": "a", "kind": "http_json", "endpoint": "https://x",
            "auth": {"type": "query_key"}
        }]});
        assert!(!schemas.validate_sources(&keyless).is_empty());
    }

    #[test]
    fn canonical_schema_requires_change_type() {
        let schemas = SchemaSet::new().unwrap();
        let record = json!({
            "policy_id": "p1", "title": "T", "region": "전국", "target_group": "일반",
            "category": "기타", "eligibility_text": "-", "benefit_text": "-",
            "application_period_text": "-", "official_url": "https://x", "source_org": "o",
            "source_api": "s", "source_updated_at": "t", "last_checked_at": "t",
            "status": "active"
        });
        let errors = schemas.validate_canonical(&json!([record]));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("/0"), "{errors:?}");

        let mut classified = record.clone();
        classified["change_type"] = json!("created");
        assert!(schemas.validate_canonical(&json!([classified])).is_empty());
    }

    #[test]
    fn check_schema_truncates() {
        let errors: Vec<String> = (0..8).map(|i| format!("e{i}")).collect();
        match PipelineError::check_schema("policy", errors) {
            Err(PipelineError::SchemaInvalid { errors, .. }) => assert_eq!(errors.len(), 5),
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
        assert!(PipelineError::check_schema("policy", Vec::new()).is_ok());
    }
}
