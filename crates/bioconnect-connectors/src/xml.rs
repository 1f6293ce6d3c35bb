//! Minimal owned XML element tree.
//!
//! Connector responses such as PubMed `efetch` are XML. The path resolver
//! needs random access (first descendant, direct child, repeated matches),
//! so the event stream from quick-xml is folded into a small tree once per
//! response.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use bioconnect_common::{BioconnectError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// All descendant elements (excluding `self`), pre-order.
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }

    /// Text content of this element and all its descendants, trimmed.
    /// `None` when the element carries no text at all.
    pub fn text(&self) -> Option<String> {
        let mut buf = String::new();
        collect_text(self, &mut buf);
        let trimmed = buf.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn collect_descendants<'a>(el: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    for child in el.elements() {
        out.push(child);
        collect_descendants(child, out);
    }
}

fn collect_text(el: &XmlElement, buf: &mut String) {
    for child in &el.children {
        match child {
            XmlNode::Text(t) => buf.push_str(t),
            XmlNode::Element(e) => collect_text(e, buf),
        }
    }
}

/// Parse an XML document into its root element.
pub fn parse(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_element(e)?),
            Ok(Event::Empty(ref e)) => {
                let el = start_element(e)?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| BioconnectError::Parse("unbalanced closing tag".into()))?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| BioconnectError::Parse(format!("XML text: {e}")))?;
                push_text(&mut stack, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&mut stack, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BioconnectError::Parse(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(BioconnectError::Parse("unexpected end of document".into()));
    }
    root.ok_or_else(|| BioconnectError::Parse("document has no root element".into()))
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut el = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| BioconnectError::Parse(format!("XML attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| BioconnectError::Parse(format!("XML attribute value: {e}")))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) {
    // Indentation between elements carries no content
    if text.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let root = parse(r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <PMID Version="1">12345678</PMID>
    <ArticleTitle>KRAS <i>G12D</i> in pancreatic cancer</ArticleTitle>
    <Empty/>
  </PubmedArticle>
</PubmedArticleSet>"#).unwrap();

        assert_eq!(root.name, "PubmedArticleSet");
        let article = root.elements().next().unwrap();
        assert_eq!(article.name, "PubmedArticle");

        let names: Vec<&str> = article.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["PMID", "ArticleTitle", "Empty"]);

        let pmid = article.elements().next().unwrap();
        assert_eq!(pmid.attribute("Version"), Some("1"));
        assert_eq!(pmid.text().as_deref(), Some("12345678"));
    }

    #[test]
    fn test_mixed_content_text_keeps_inner_spacing() {
        let root = parse("<t>KRAS <i>G12D</i> in cancer</t>").unwrap();
        assert_eq!(root.text().as_deref(), Some("KRAS G12D in cancer"));
    }

    #[test]
    fn test_empty_element_has_no_text() {
        let root = parse("<a><b/></a>").unwrap();
        assert_eq!(root.text(), None);
        assert_eq!(root.descendants().len(), 1);
    }

    #[test]
    fn test_entities_and_cdata() {
        let root = parse("<a>x &amp; y<![CDATA[ <z> ]]></a>").unwrap();
        assert_eq!(root.text().as_deref(), Some("x & y <z>"));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        assert!(matches!(parse("<a><b></a>"), Err(BioconnectError::Parse(_))));
        assert!(matches!(parse("<a>"), Err(BioconnectError::Parse(_))));
        assert!(matches!(parse(""), Err(BioconnectError::Parse(_))));
    }
}
