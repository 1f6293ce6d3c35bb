//! Path expressions over JSON and XML payloads.
//!
//! JSON paths are dot-separated object keys (`esearchresult.idlist`). XML
//! paths are `/`-separated tag steps addressing direct children
//! (`PubDate/Year`); a leading `.//` searches all descendants for the first
//! step (`.//AuthorList/Author`). An XML step may filter on one attribute:
//! `ArticleId[@IdType='doi']`.
//!
//! Resolution never fails: a missing segment, a non-map intermediate or an
//! unparsable path all resolve to nothing.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::payload::Node;
use crate::xml::XmlElement;

/// Marker for "search anywhere below the current node".
pub const DESCENDANT_PREFIX: &str = ".//";

lazy_static! {
    static ref XML_STEP: Regex =
        Regex::new(r#"^([^\[\]@/]+)(?:\[@([^=\]]+)=['"]([^'"]*)['"]\])?$"#).unwrap();
}

/// Extract the value at `path`; `Value::Null` when nothing matches.
pub fn extract(node: Node<'_>, path: &str) -> Value {
    resolve(node, path).map(|n| n.to_value()).unwrap_or(Value::Null)
}

/// First node matching `path`.
pub fn resolve<'a>(node: Node<'a>, path: &str) -> Option<Node<'a>> {
    match node {
        Node::Json(v) => resolve_json(v, path).map(Node::Json),
        Node::Xml(e) => resolve_xml_all(e, path).into_iter().next().map(Node::Xml),
    }
}

/// All nodes matching `path`, in document order.
///
/// For JSON the path addresses a single value: an array yields its
/// elements, `null`/missing yields nothing and any other value yields
/// itself. For XML every repeated match is returned.
pub fn extract_all<'a>(node: Node<'a>, path: &str) -> Vec<Node<'a>> {
    match node {
        Node::Json(v) => match resolve_json(v, path) {
            None | Some(Value::Null) => vec![],
            Some(Value::Array(items)) => items.iter().map(Node::Json).collect(),
            Some(other) => vec![Node::Json(other)],
        },
        Node::Xml(e) => resolve_xml_all(e, path).into_iter().map(Node::Xml).collect(),
    }
}

fn resolve_json<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

struct XmlStep<'p> {
    tag: &'p str,
    attr: Option<(&'p str, &'p str)>,
}

impl XmlStep<'_> {
    fn matches(&self, el: &XmlElement) -> bool {
        if el.name != self.tag {
            return false;
        }
        match self.attr {
            Some((key, value)) => el.attribute(key) == Some(value),
            None => true,
        }
    }
}

fn parse_steps(path: &str) -> Option<Vec<XmlStep<'_>>> {
    path.split('/')
        .map(|raw| {
            let caps = XML_STEP.captures(raw.trim())?;
            let tag = caps.get(1)?.as_str();
            let attr = match (caps.get(2), caps.get(3)) {
                (Some(k), Some(v)) => Some((k.as_str(), v.as_str())),
                _ => None,
            };
            Some(XmlStep { tag, attr })
        })
        .collect()
}

fn resolve_xml_all<'a>(root: &'a XmlElement, path: &str) -> Vec<&'a XmlElement> {
    if path.is_empty() || path == "." {
        return vec![root];
    }

    let (anywhere, rest) = match path.strip_prefix(DESCENDANT_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, path.strip_prefix("./").unwrap_or(path)),
    };

    let Some(steps) = parse_steps(rest) else {
        debug!(path, "Unparsable XML path");
        return vec![];
    };
    let Some((first, tail)) = steps.split_first() else {
        return vec![];
    };

    let mut current: Vec<&XmlElement> = if anywhere {
        root.descendants().into_iter().filter(|e| first.matches(e)).collect()
    } else {
        root.elements().filter(|e| first.matches(e)).collect()
    };

    for step in tail {
        current = current
            .into_iter()
            .flat_map(|e| e.elements().filter(|c| step.matches(c)))
            .collect();
        if current.is_empty() {
            break;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use serde_json::json;

    fn pubmed() -> Payload {
        Payload::parse(r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>12345678</PMID>
      <Article>
        <ArticleTitle>KRAS G12D in pancreatic cancer</ArticleTitle>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>John</ForeName></Author>
          <Author><LastName>Doe</LastName><ForeName>Jane</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">12345678</ArticleId>
        <ArticleId IdType="doi">10.1000/kras</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#, None).unwrap()
    }

    #[test]
    fn test_json_dot_path() {
        let data = json!({"esearchresult": {"count": "42", "idlist": ["1", "2"]}});
        let root = Node::Json(&data);
        assert_eq!(extract(root, "esearchresult.count"), json!("42"));
        assert_eq!(extract(root, "esearchresult.idlist"), json!(["1", "2"]));
        assert_eq!(extract(root, ""), data);
    }

    #[test]
    fn test_json_missing_segments_are_null_at_any_depth() {
        let data = json!({"a": {"b": {"c": 1}}, "s": "text", "arr": [1, 2]});
        let root = Node::Json(&data);
        for path in ["x", "a.x", "a.b.x", "a.b.c.d", "s.inner", "arr.0", "a..b", ".", "a.b.c.d.e.f.g"] {
            assert_eq!(extract(root, path), Value::Null, "path {path}");
        }
    }

    #[test]
    fn test_json_extract_all_shapes() {
        let data = json!({"results": [{"id": "a"}, {"id": "b"}], "one": {"id": "c"}, "none": null});
        let root = Node::Json(&data);
        assert_eq!(extract_all(root, "results").len(), 2);
        assert_eq!(extract_all(root, "one").len(), 1);
        assert!(extract_all(root, "none").is_empty());
        assert!(extract_all(root, "missing").is_empty());
    }

    #[test]
    fn test_xml_descendant_search() {
        let doc = pubmed();
        assert_eq!(extract(doc.root(), ".//PMID"), json!("12345678"));
        assert_eq!(extract(doc.root(), ".//ArticleTitle"), json!("KRAS G12D in pancreatic cancer"));
        assert_eq!(extract(doc.root(), ".//Author/LastName"), json!("Smith"));
    }

    #[test]
    fn test_xml_direct_child_path() {
        let doc = pubmed();
        assert_eq!(
            extract(doc.root(), "PubmedArticle/MedlineCitation/PMID"),
            json!("12345678")
        );
        // Not a direct child of the root
        assert_eq!(extract(doc.root(), "PMID"), Value::Null);
    }

    #[test]
    fn test_xml_attribute_predicate() {
        let doc = pubmed();
        assert_eq!(
            extract(doc.root(), ".//ArticleIdList/ArticleId[@IdType='doi']"),
            json!("10.1000/kras")
        );
        assert_eq!(extract(doc.root(), ".//ArticleId[@IdType=\"pmc\"]"), Value::Null);
    }

    #[test]
    fn test_xml_extract_all_preserves_order() {
        let doc = pubmed();
        let names: Vec<Value> = extract_all(doc.root(), ".//AuthorList/Author")
            .into_iter()
            .map(|n| extract(n, "LastName"))
            .collect();
        assert_eq!(names, vec![json!("Smith"), json!("Doe")]);
    }

    #[test]
    fn test_xml_bad_paths_never_panic() {
        let doc = pubmed();
        for path in [".//", "[@x='y']", "a[", ".//Missing/Deeper/Still", "//", "./"] {
            assert_eq!(extract(doc.root(), path), Value::Null, "path {path}");
        }
        assert_eq!(extract(doc.root(), "."), doc.root().to_value());
    }
}
