//! Template normalization.
//!
//! Stack templates may be authored in YAML or JSON; the backend and the
//! up-to-date comparison both work on one canonical form: JSON with
//! object keys in sorted order and stable two-space indentation. Two
//! templates that differ only in authoring format or key order
//! normalize to identical strings.

use cirrus_core::domain::DomainError;

/// Normalize a raw template (YAML or JSON) to canonical JSON.
pub fn canonical_json(raw: &str) -> Result<String, DomainError> {
    // YAML is a superset of JSON, so one parse handles both formats.
    let value: serde_yaml::Value = serde_yaml::from_str(raw)
        .map_err(|e| DomainError::Config(format!("template is not valid YAML or JSON: {e}")))?;

    // serde_json maps objects to a sorted BTreeMap, which gives the
    // canonical key order for free.
    let json = serde_json::to_value(&value)
        .map_err(|e| DomainError::Config(format!("template cannot be represented as JSON: {e}")))?;
    serde_json::to_string_pretty(&json)
        .map_err(|e| DomainError::Config(format!("template serialization failed: {e}")))
}

/// The keys of a named top-level section of a canonical template
/// (`"Outputs"`, `"Resources"`, `"Parameters"`). Missing section means
/// no keys.
pub fn section_keys(template_body: &str, section: &str) -> Vec<String> {
    serde_json::from_str::<serde_json::Value>(template_body)
        .ok()
        .and_then(|v| {
            v.get(section)
                .and_then(|s| s.as_object().map(|o| o.keys().cloned().collect()))
        })
        .unwrap_or_default()
}
