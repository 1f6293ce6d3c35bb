//! PubMed E-utilities.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi (JSON)
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi  (XML)
//!
//! Field mapping lives in `specs/pubmed.yaml`; this module only adds the
//! transforms that need to look at XML structure.

use serde_json::Value;

use crate::payload::Node;
use crate::transform::{TransformContext, TransformRegistry};
use crate::xml::XmlElement;
use bioconnect_common::Result;

pub const NAME: &str = "pubmed";
pub const SPEC: &str = include_str!("../../specs/pubmed.yaml");

pub fn transforms() -> TransformRegistry {
    TransformRegistry::new()
        .with("abstract_sections", abstract_sections)
        .with("author_name", author_name)
        .with("reference_count", reference_count)
}

fn element<'a>(ctx: &TransformContext<'a>) -> Option<&'a XmlElement> {
    match ctx.node {
        Node::Xml(el) => Some(el),
        Node::Json(_) => None,
    }
}

/// Join structured abstracts (`<AbstractText Label="METHODS">`) into one
/// string, one labelled section per paragraph.
fn abstract_sections(value: Value, ctx: &TransformContext<'_>) -> Result<Value> {
    let Some(abstract_el) = element(ctx) else {
        return Ok(value);
    };
    let sections: Vec<String> = abstract_el
        .elements()
        .filter(|e| e.name == "AbstractText")
        .filter_map(|e| {
            let text = e.text()?;
            Some(match e.attribute("Label") {
                Some(label) => format!("{label}: {text}"),
                None => text,
            })
        })
        .collect();
    if sections.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::String(sections.join("\n")))
    }
}

/// `ForeName LastName`, the last name alone, or a `CollectiveName`.
fn author_name(_value: Value, ctx: &TransformContext<'_>) -> Result<Value> {
    let Some(author) = element(ctx) else {
        return Ok(Value::Null);
    };
    let child = |tag: &str| author.elements().find(|e| e.name == tag).and_then(XmlElement::text);

    let name = match (child("ForeName"), child("LastName")) {
        (Some(fore), Some(last)) => Some(format!("{fore} {last}")),
        (None, Some(last)) => Some(last),
        _ => child("CollectiveName"),
    };
    Ok(name.map(Value::String).unwrap_or(Value::Null))
}

fn reference_count(_value: Value, ctx: &TransformContext<'_>) -> Result<Value> {
    Ok(match element(ctx) {
        Some(list) => Value::from(list.elements().filter(|e| e.name == "Reference").count()),
        None => Value::Null,
    })
}
