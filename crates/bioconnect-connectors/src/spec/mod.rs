//! Connector specifications.
//!
//! A specification is the declarative description of one upstream API:
//! where it lives, how fast it may be called, which endpoints exist, how
//! request parameters are built and how responses map onto normalized
//! fields. Specifications are YAML (or JSON) documents:
//!
//! ```yaml
//! name: pubmed
//! version: 1.0.0
//! capabilities:
//!   supports_advanced_search: true
//! api:
//!   base_url: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/
//!   rate_limit: { requests_per_second: 3, with_api_key: 10 }
//!   endpoints:
//!     search:
//!       path: esearch.fcgi
//!       method: GET
//!       params: { db: pubmed, term: "{query}", retmax: "{limit}" }
//!       response:
//!         data_path: esearchresult
//!         mapping:
//!           total_results: { path: count, transform: integer }
//!           document_ids: { path: idlist, list: true }
//! ```

mod unique_keys;
pub mod validate;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::CapabilitySet;
use bioconnect_common::{BioconnectError, ErrorKind, Result};

pub use validate::{lint, LintReport};

/// Endpoint used by `Connector::search`.
pub const SEARCH_ENDPOINT: &str = "search";
/// Endpoint used by `Connector::get_by_id`.
pub const DOCUMENT_ENDPOINT: &str = "get_document";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

// ── Document shape ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub version: String,
    pub capabilities: BTreeMap<String, bool>,
    pub api: ApiSpec,
    #[serde(default)]
    pub error_handling: ErrorHandlingSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub base_url: String,
    #[serde(default)]
    pub rate_limit: RateLimitSpec,
    pub endpoints: BTreeMap<String, EndpointSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSpec {
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    /// Rate granted once an API key has been supplied.
    #[serde(default)]
    pub with_api_key: Option<f64>,
}

fn default_rps() -> f64 { 3.0 }

impl Default for RateLimitSpec {
    fn default() -> Self {
        Self { requests_per_second: default_rps(), with_api_key: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Relative to `api.base_url`; may contain `{placeholders}`.
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    pub response: ResponseSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationSpec>,
}

fn default_method() -> String { "GET".to_string() }

/// A request parameter: a literal, or a string with `{placeholders}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Render against the call's template values. A parameter whose
    /// placeholders are not all bound is omitted (`None`).
    pub fn render(&self, values: &HashMap<String, String>) -> Option<String> {
        match self {
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Integer(i) => Some(i.to_string()),
            ParamValue::Float(f) => Some(f.to_string()),
            ParamValue::Text(t) => render_template(t, values),
        }
    }

    pub fn placeholders(&self) -> Vec<&str> {
        match self {
            ParamValue::Text(t) => placeholders(t),
            _ => vec![],
        }
    }
}

/// Substitute every `{name}` in `template`; `None` if any name is unbound.
pub fn render_template(template: &str, values: &HashMap<String, String>) -> Option<String> {
    let mut missing = false;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        match values.get(&caps[1]) {
            Some(v) => v.clone(),
            None => {
                missing = true;
                String::new()
            }
        }
    });
    if missing {
        None
    } else {
        Some(rendered.into_owned())
    }
}

pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Dot path to the object the mapping applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    pub mapping: BTreeMap<String, FieldSpec>,
}

/// How one output field is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    /// A bare path: the extracted value is used as-is.
    Path(String),
    Detailed(FieldDetail),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDetail {
    /// Omitted for fields computed from the whole record (e.g. `concat`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformRef>,
    /// Enumerate every match at `path` instead of taking the first.
    #[serde(default)]
    pub list: bool,
    /// Per-element sub-mapping for list fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<BTreeMap<String, FieldSpec>>,
}

impl FieldSpec {
    pub fn path(&self) -> Option<&str> {
        match self {
            FieldSpec::Path(p) => Some(p),
            FieldSpec::Detailed(d) => d.path.as_deref(),
        }
    }

    pub fn detail(&self) -> Option<&FieldDetail> {
        match self {
            FieldSpec::Path(_) => None,
            FieldSpec::Detailed(d) => Some(d),
        }
    }
}

/// A transform reference: a bare name, or an object form.
///
/// Object forms are `{type: concat, separator: ", ", fields: [...]}` or the
/// older date shorthand `{year: Year, month: Month, day: Day}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformRef {
    Name(String),
    Object(serde_json::Map<String, Value>),
}

impl TransformRef {
    /// Transform name plus its arguments (`Value::Null` for a bare name).
    pub fn resolve(&self) -> Option<(String, Value)> {
        match self {
            TransformRef::Name(name) => Some((name.clone(), Value::Null)),
            TransformRef::Object(obj) => {
                if let Some(name) = obj.get("type").and_then(Value::as_str) {
                    Some((name.to_string(), Value::Object(obj.clone())))
                } else if ["year", "month", "day"].iter().any(|k| obj.contains_key(*k)) {
                    Some(("date".to_string(), Value::Object(obj.clone())))
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingSpec {
    /// HTTP status (as a string) or `default` → error kind.
    #[serde(default)]
    pub error_mappings: BTreeMap<String, ErrorKind>,
}

impl ErrorHandlingSpec {
    /// Remap a transport failure. Errors without a status, or with a status
    /// that matches neither an entry nor `default`, pass through unchanged.
    pub fn map_error(&self, err: BioconnectError) -> BioconnectError {
        let BioconnectError::Transport { status: Some(status), message } = err else {
            return err;
        };
        match self
            .error_mappings
            .get(&status.to_string())
            .or_else(|| self.error_mappings.get("default"))
        {
            Some(kind) => kind.into_error(Some(status), message),
            None => BioconnectError::Transport { status: Some(status), message },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `{page}` counts from 1.
    #[default]
    Page,
    /// `{offset}` counts accepted items.
    Offset,
    /// `{cursor}` echoes the previous response's `next_cursor` field.
    Cursor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationSpec {
    #[serde(default)]
    pub style: PaginationStyle,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// First cursor value for cursor-style APIs (`*` for Europe PMC/OpenAlex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_cursor: Option<String>,
}

fn default_page_size() -> usize { 100 }
fn default_max_pages() -> u32 { crate::pagination::DEFAULT_MAX_PAGES }

// ── Loading ───────────────────────────────────────────────────────────────────

impl Specification {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let spec: Specification = serde_yaml::from_str(content)
            .map_err(|e| BioconnectError::Specification(e.to_string()))?;
        spec.check()?;
        Ok(spec)
    }

    /// Like [`from_yaml_str`](Self::from_yaml_str), including the rejection
    /// of repeated object keys.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str::<unique_keys::UniqueKeys>(content)
            .map_err(|e| BioconnectError::Specification(e.to_string()))?;
        let spec: Specification = serde_json::from_str(content)
            .map_err(|e| BioconnectError::Specification(e.to_string()))?;
        spec.check()?;
        Ok(spec)
    }

    /// Load a `.json` or `.yaml`/`.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BioconnectError::Specification(format!("cannot read {}: {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Structural checks that make a specification unusable when violated.
    /// Style issues are reported by [`lint`] instead.
    pub fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BioconnectError::Specification("`name` must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(BioconnectError::Specification(format!(
                "{}: `version` must not be empty",
                self.name
            )));
        }
        url::Url::parse(&self.api.base_url).map_err(|e| {
            BioconnectError::Specification(format!(
                "{}: invalid api.base_url {:?}: {e}",
                self.name, self.api.base_url
            ))
        })?;
        for (name, endpoint) in &self.api.endpoints {
            if !endpoint.method.eq_ignore_ascii_case("GET") {
                return Err(BioconnectError::Specification(format!(
                    "{}: endpoint `{name}` uses method {}, only GET is supported",
                    self.name, endpoint.method
                )));
            }
        }
        Ok(())
    }

    pub fn capability_set(&self) -> CapabilitySet {
        CapabilitySet::from_map(&self.capabilities)
    }

    pub fn endpoint(&self, name: &str) -> Result<&EndpointSpec> {
        self.api.endpoints.get(name).ok_or_else(|| {
            BioconnectError::Specification(format!(
                "{}: endpoint `{name}` not configured",
                self.name
            ))
        })
    }

    /// Absolute URL for `endpoint`, with path placeholders bound.
    pub fn endpoint_url(&self, endpoint: &EndpointSpec, values: &HashMap<String, String>) -> Result<String> {
        let encoded: HashMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.clone(), url::form_urlencoded::byte_serialize(v.as_bytes()).collect()))
            .collect();
        let path = render_template(&endpoint.path, &encoded).ok_or_else(|| {
            BioconnectError::Specification(format!(
                "{}: unbound placeholder in endpoint path {:?}",
                self.name, endpoint.path
            ))
        })?;
        Ok(format!(
            "{}/{}",
            self.api.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

impl EndpointSpec {
    /// Query parameters for one call; unbound templates are left out.
    pub fn build_params(&self, values: &HashMap<String, String>) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter_map(|(key, value)| value.render(values).map(|v| (key.clone(), v)))
            .collect()
    }
}
