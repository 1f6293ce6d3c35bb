//! Raw response payloads as handed over by the transport.

use serde_json::Value;

use crate::xml::{self, XmlElement};
use bioconnect_common::Result;

/// A parsed API response: either a JSON document or an XML element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Xml(XmlElement),
}

impl Payload {
    /// Parse a response body, sniffing the format from the content type and
    /// falling back to the first non-blank character.
    pub fn parse(body: &str, content_type: Option<&str>) -> Result<Self> {
        let looks_xml = match content_type {
            Some(ct) if ct.contains("xml") => true,
            Some(ct) if ct.contains("json") => false,
            _ => body.trim_start().starts_with('<'),
        };
        if looks_xml {
            Ok(Payload::Xml(xml::parse(body)?))
        } else {
            Ok(Payload::Json(serde_json::from_str(body)?))
        }
    }

    pub fn root(&self) -> Node<'_> {
        match self {
            Payload::Json(v) => Node::Json(v),
            Payload::Xml(e) => Node::Xml(e),
        }
    }
}

/// A borrowed position inside a payload.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Json(&'a Value),
    Xml(&'a XmlElement),
}

impl<'a> Node<'a> {
    /// The node as a plain value: JSON is cloned as-is, XML collapses to its
    /// text content (`null` when there is none).
    pub fn to_value(&self) -> Value {
        match self {
            Node::Json(v) => (*v).clone(),
            Node::Xml(e) => e.text().map(Value::String).unwrap_or(Value::Null),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Json(Value::Null))
    }
}
