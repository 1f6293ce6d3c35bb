//! Europe PMC REST API.
//! Free, no auth required. Returns JSON.
//!
//! Search: https://www.ebi.ac.uk/europepmc/webservices/rest/search
//! Article: https://www.ebi.ac.uk/europepmc/webservices/rest/article/MED/{pmid}

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::transform::{TransformContext, TransformRegistry};
use bioconnect_common::Result;

pub const NAME: &str = "europe_pmc";
pub const SPEC: &str = include_str!("../../specs/europe_pmc.yaml");

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"</?[A-Za-z][A-Za-z0-9]*[^>]*>").unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
}

pub fn transforms() -> TransformRegistry {
    TransformRegistry::new()
        .with("extract_id", extract_id)
        .with("yes_no", yes_no)
        .with("strip_markup", strip_markup)
}

/// Id of one search hit (`{"id": "12345", "source": "MED", ...}`).
fn extract_id(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    Ok(match value {
        Value::Object(mut obj) => match obj.remove("id") {
            Some(Value::String(s)) if !s.is_empty() => Value::String(s),
            Some(Value::Number(n)) => Value::String(n.to_string()),
            _ => Value::Null,
        },
        Value::String(s) if !s.is_empty() => Value::String(s),
        _ => Value::Null,
    })
}

/// Europe PMC flags are `"Y"`/`"N"` strings.
fn yes_no(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    Ok(match &value {
        Value::Bool(_) => value,
        Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" | "TRUE" => Value::Bool(true),
            "N" | "NO" | "FALSE" => Value::Bool(false),
            _ => {
                warn!(?value, "Unrecognised Y/N flag");
                Value::Null
            }
        },
        _ => Value::Null,
    })
}

/// Abstracts come with inline HTML (`<h4>Background</h4>`, `<i>`).
fn strip_markup(value: Value, _ctx: &TransformContext<'_>) -> Result<Value> {
    let Value::String(s) = value else {
        return Ok(value);
    };
    let plain = MARKUP.replace_all(&s, " ");
    let plain = SPACES.replace_all(plain.trim(), " ");
    Ok(if plain.is_empty() { Value::Null } else { Value::String(plain.into_owned()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ResponseMapper;
    use crate::payload::{Node, Payload};
    use crate::spec::{Specification, DOCUMENT_ENDPOINT, SEARCH_ENDPOINT};
    use serde_json::json;

    fn run(f: fn(Value, &TransformContext<'_>) -> Result<Value>, v: Value) -> Value {
        let n = Value::Null;
        f(v, &TransformContext { node: Node::Json(&n), args: &n }).unwrap()
    }

    #[test]
    fn test_flags_and_markup() {
        assert_eq!(run(yes_no, json!("Y")), json!(true));
        assert_eq!(run(yes_no, json!("n")), json!(false));
        assert_eq!(run(yes_no, json!("maybe")), Value::Null);
        assert_eq!(
            run(strip_markup, json!("<h4>Background</h4>KRAS <i>in vivo</i>.")),
            json!("Background KRAS in vivo .")
        );
        assert_eq!(run(extract_id, json!({"id": "PMC1", "source": "PMC"})), json!("PMC1"));
        assert_eq!(run(extract_id, json!({"pmid": "1"})), Value::Null);
    }

    #[test]
    fn test_search_mapping() {
        let spec = Specification::from_yaml_str(SPEC).unwrap();
        let mapper = ResponseMapper::new(transforms());
        let payload = Payload::Json(json!({
            "hitCount": 3,
            "nextCursorMark": "AoE1",
            "resultList": {"result": [{"id": "111"}, {"id": "222"}, {"title": "no id"}]}
        }));
        let record = mapper.map(&payload, &spec.endpoint(SEARCH_ENDPOINT).unwrap().response);
        assert_eq!(record["total_results"], json!(3));
        assert_eq!(record["document_ids"], json!(["111", "222"]));
        assert_eq!(record["next_cursor"], json!("AoE1"));
    }

    #[test]
    fn test_article_mapping() {
        let spec = Specification::from_yaml_str(SPEC).unwrap();
        let mapper = ResponseMapper::new(transforms());
        let payload = Payload::Json(json!({
            "result": {
                "id": "12345678",
                "pmid": "12345678",
                "title": "KRAS G12D",
                "abstractText": "<h4>Aim</h4>Test.",
                "authorList": {"author": [{"fullName": "Smith J", "authorId": {"type": "ORCID", "value": "0000-0001"}}]},
                "doi": "10.1000/kras",
                "journalInfo": {"journal": {"title": "Nature"}},
                "firstPublicationDate": "2023-01-15",
                "isOpenAccess": "N",
                "citedByCount": 4
            }
        }));
        let record = mapper.map(&payload, &spec.endpoint(DOCUMENT_ENDPOINT).unwrap().response);
        assert_eq!(record["id"], json!("12345678"));
        assert_eq!(record["abstract"], json!("Aim Test."));
        assert_eq!(record["authors"], json!([{"name": "Smith J", "orcid": "0000-0001"}]));
        assert_eq!(record["journal"], json!("Nature"));
        assert_eq!(record["publication_date"], json!("2023-01-15"));
        assert_eq!(record["open_access"], json!(false));
        assert_eq!(record["in_pmc"], Value::Null);
        assert_eq!(record["cited_by_count"], json!(4));
    }
}
