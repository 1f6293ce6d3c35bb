//! Style and consistency checks for specifications.
//!
//! [`Specification::check`](super::Specification::check) rejects documents
//! that cannot be used at all. The lint here reports what loads fine but
//! breaks conventions, split into errors (fail the `validate-connectors`
//! run) and warnings.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::{FieldSpec, Specification, TransformRef};
use crate::capabilities::Capability;
use crate::transform::TransformRegistry;

/// Deepest nesting allowed inside one transform object.
pub const MAX_TRANSFORM_DEPTH: usize = 3;

lazy_static! {
    static ref CONNECTOR_NAME: Regex = Regex::new(r"^[a-z_]+$").unwrap();
    static ref SEMVER: Regex = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
    static ref ENDPOINT_NAME: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Lint `spec`. `transforms` is the connector's transform table, used to
/// flag transform names that would silently pass values through.
pub fn lint(spec: &Specification, transforms: &TransformRegistry) -> LintReport {
    let mut report = LintReport::default();

    if !CONNECTOR_NAME.is_match(&spec.name) {
        report.errors.push(format!(
            "connector name '{}' should be lowercase letters and underscores",
            spec.name
        ));
    }
    if !SEMVER.is_match(&spec.version) {
        report.errors.push(format!(
            "version '{}' is not a semantic version (MAJOR.MINOR.PATCH)",
            spec.version
        ));
    }

    let rps = spec.api.rate_limit.requests_per_second;
    if !rps.is_finite() || rps <= 0.0 {
        report.errors.push(format!("rate_limit.requests_per_second must be > 0, got {rps}"));
    }
    if let Some(keyed) = spec.api.rate_limit.with_api_key {
        if !keyed.is_finite() || keyed <= 0.0 {
            report.errors.push(format!("rate_limit.with_api_key must be > 0, got {keyed}"));
        }
    }

    for name in spec.capabilities.keys() {
        if name.parse::<Capability>().is_err() {
            report.warnings.push(format!("unknown capability '{name}'"));
        }
    }

    if spec.api.endpoints.is_empty() {
        report.warnings.push("no endpoints defined".to_string());
    }

    for (name, endpoint) in &spec.api.endpoints {
        if !ENDPOINT_NAME.is_match(name) {
            report.errors.push(format!(
                "endpoint name '{name}' should be lowercase with underscores"
            ));
        }
        for param in endpoint.params.keys() {
            if param.chars().any(|c| c.is_ascii_uppercase()) {
                report.warnings.push(format!("{name}: parameter name '{param}' should be lowercase"));
            }
        }
        if endpoint.pagination.is_some() {
            let placeholders: Vec<&str> =
                endpoint.params.values().flat_map(|p| p.placeholders()).collect();
            if !["page", "offset", "cursor"].iter().any(|p| placeholders.contains(p)) {
                report.warnings.push(format!(
                    "{name}: pagination configured but no {{page}}, {{offset}} or {{cursor}} parameter"
                ));
            }
        }
        lint_mapping(name, &endpoint.response.mapping, transforms, &mut report);
    }

    report
}

fn lint_mapping(
    prefix: &str,
    mapping: &BTreeMap<String, FieldSpec>,
    transforms: &TransformRegistry,
    report: &mut LintReport,
) {
    for (field, spec) in mapping {
        let location = format!("{prefix}.{field}");
        let Some(detail) = spec.detail() else { continue };

        if let Some(transform) = &detail.transform {
            match transform.resolve() {
                Some((name, _)) if !transforms.contains(&name) => {
                    report.warnings.push(format!("{location}: unknown transform '{name}'"));
                }
                Some(_) => {}
                None => report.errors.push(format!(
                    "{location}: transform object has neither `type` nor date keys"
                )),
            }
            if let TransformRef::Object(obj) = transform {
                let depth = depth(&Value::Object(obj.clone()));
                if depth > MAX_TRANSFORM_DEPTH {
                    report.errors.push(format!(
                        "{location}: transform nested {depth} levels deep (max {MAX_TRANSFORM_DEPTH})"
                    ));
                }
            }
        }

        if detail.path.is_none() && detail.transform.is_none() {
            report.warnings.push(format!("{location}: field has neither path nor transform"));
        }

        if let Some(nested) = &detail.mapping {
            if !detail.list {
                report.warnings.push(format!("{location}: nested mapping ignored without `list: true`"));
            }
            if detail.transform.is_some() {
                report.warnings.push(format!(
                    "{location}: both mapping and transform set, transform is ignored"
                ));
            }
            lint_mapping(&location, nested, transforms, report);
        }
    }
}

/// Container nesting below `value`; scalars are depth 0.
fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(yaml: &str) -> Specification {
        Specification::from_yaml_str(yaml).unwrap()
    }

    const CLEAN: &str = r#"
name: europe_pmc
version: 1.0.0
capabilities: { supports_fulltext: true }
api:
  base_url: https://www.ebi.ac.uk/europepmc/webservices/rest/
  endpoints:
    search:
      path: search
      params: { query: "{query}", cursorMark: "{cursor}", format: json }
      pagination: { style: cursor, initial_cursor: "*" }
      response:
        mapping:
          total_results: { path: hitCount, transform: integer }
          authors:
            path: authorList.author
            list: true
            mapping:
              name: fullName
"#;

    #[test]
    fn test_clean_spec_has_no_errors() {
        let report = lint(&spec(CLEAN), &TransformRegistry::new());
        assert!(report.is_ok(), "{:?}", report.errors);
        // cursorMark is camelCase upstream
        assert_eq!(report.warnings.len(), 1, "{:?}", report.warnings);
        assert!(report.warnings[0].contains("cursorMark"));
    }

    #[test]
    fn test_naming_errors() {
        let bad = CLEAN
            .replace("name: europe_pmc", "name: Europe-PMC")
            .replace("version: 1.0.0", "version: \"1.0\"")
            .replace("    search:", "    Search:");
        let report = lint(&spec(&bad), &TransformRegistry::new());
        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    }

    #[test]
    fn test_unknown_transform_is_warning() {
        let with_unknown = CLEAN.replace("transform: integer", "transform: extract_id");
        let report = lint(&spec(&with_unknown), &TransformRegistry::new());
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("unknown transform 'extract_id'")));

        let registry = TransformRegistry::new().with("extract_id", |v, _| Ok(v));
        let report = lint(&spec(&with_unknown), &registry);
        assert!(!report.warnings.iter().any(|w| w.contains("extract_id")));
    }

    #[test]
    fn test_transform_depth() {
        assert_eq!(depth(&json!("x")), 0);
        assert_eq!(depth(&json!({"type": "concat", "fields": [{"path": "a"}]})), 3);

        let deep = CLEAN.replace(
            "transform: integer",
            "transform: { type: concat, fields: [ { path: { nested: [x] } } ] }",
        );
        let report = lint(&spec(&deep), &TransformRegistry::new());
        assert!(report.errors.iter().any(|e| e.contains("nested 5 levels")), "{:?}", report.errors);
    }

    #[test]
    fn test_pagination_without_placeholder_warns() {
        let no_cursor = CLEAN.replace("cursorMark: \"{cursor}\", ", "");
        let report = lint(&spec(&no_cursor), &TransformRegistry::new());
        assert!(report.warnings.iter().any(|w| w.contains("pagination configured")));
    }

    #[test]
    fn test_non_positive_rate_is_error() {
        let zero = CLEAN.replace(
            "  endpoints:",
            "  rate_limit: { requests_per_second: 0 }\n  endpoints:",
        );
        let report = lint(&spec(&zero), &TransformRegistry::new());
        assert!(report.errors.iter().any(|e| e.contains("requests_per_second")));
    }
}
