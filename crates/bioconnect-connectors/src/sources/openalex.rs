//! OpenAlex works API (https://api.openalex.org/works).

use serde_json::Value;
use tracing::debug;

use crate::transform::{TransformContext, TransformRegistry};
use bioconnect_common::{BioconnectError, Result};

pub const NAME: &str = "openalex";
pub const SPEC: &str = include_str!("../../specs/openalex.yaml");

const ID_PREFIX: &str = "https://openalex.org/";
const DOI_PREFIXES: [&str; 3] = ["https://doi.org/", "http://doi.org/", "doi:"];

pub fn transforms() -> TransformRegistry {
    TransformRegistry::new()
        .with("openalex_id", openalex_id)
        .with("strip_doi_prefix", strip_doi_prefix)
        .with("inverted_abstract", inverted_abstract)
}

/// `https://openalex.org/W2741809807` → `W2741809807`. Accepts the URL
/// itself or an object carrying it under `id`.
fn openalex_id(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    let id = match &value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => match obj.get("id").and_then(Value::as_str) {
            Some(s) => s,
            None => return Ok(Value::Null),
        },
        _ => return Ok(Value::Null),
    };
    let short = id.strip_prefix(ID_PREFIX).unwrap_or(id).trim();
    Ok(if short.is_empty() { Value::Null } else { Value::String(short.to_string()) })
}

fn strip_doi_prefix(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    let Value::String(doi) = value else {
        return Ok(value);
    };
    let bare = DOI_PREFIXES
        .iter()
        .find_map(|p| doi.strip_prefix(p))
        .unwrap_or(doi.as_str());
    Ok(Value::String(bare.to_string()))
}

/// Rebuild abstract text from OpenAlex's `{word: [positions]}` index.
fn inverted_abstract(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    let index = match value {
        Value::Object(index) => index,
        Value::Null => return Ok(Value::Null),
        other => {
            return Err(BioconnectError::Transform(format!(
                "inverted_abstract expects an object, got {other}"
            )))
        }
    };

    let mut positioned: Vec<(u64, &str)> = index
        .iter()
        .flat_map(|(word, positions)| {
            positions
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_u64)
                .map(move |pos| (pos, word.as_str()))
        })
        .collect();
    if positioned.is_empty() {
        return Ok(Value::Null);
    }
    positioned.sort_unstable_by_key(|(pos, _)| *pos);
    debug!(words = positioned.len(), "Rebuilt inverted abstract");

    let text: Vec<&str> = positioned.into_iter().map(|(_, w)| w).collect();
    Ok(Value::String(text.join(" ")))
}
