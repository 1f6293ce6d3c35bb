//! Typed view over normalized document records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapper::Record;
use bioconnect_common::{BioconnectError, Result};

/// A normalized literature record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Connector that produced the record.
    pub source: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub authors: Vec<Author>,
    pub doi: Option<String>,
    pub journal: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub url: Option<String>,
    pub open_access: Option<bool>,
    /// Mapped fields without a typed slot.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub affiliation: Option<String>,
    pub orcid: Option<String>,
}

impl Author {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) if !name.trim().is_empty() => Some(Self {
                name: name.trim().to_string(),
                ..Default::default()
            }),
            Value::Object(obj) => {
                let name = obj.get("name").and_then(non_empty_str)?;
                Some(Self {
                    name,
                    affiliation: obj.get("affiliation").and_then(non_empty_str),
                    orcid: obj.get("orcid").and_then(non_empty_str),
                })
            }
            _ => None,
        }
    }
}

impl Document {
    /// Build a document from a `get_by_id` record. `id` is used when the
    /// record carries no `id` field of its own.
    pub fn from_record(source: &str, id: &str, mut record: Record) -> Result<Self> {
        let id = record
            .remove("id")
            .as_ref()
            .and_then(non_empty_str)
            .or_else(|| Some(id.to_string()).filter(|s| !s.is_empty()))
            .ok_or_else(|| BioconnectError::Extraction(format!("{source}: record without id")))?;

        let mut take_str = |key: &str| record.remove(key).as_ref().and_then(non_empty_str);
        let title = take_str("title");
        let abstract_text = take_str("abstract");
        let doi = take_str("doi");
        let journal = take_str("journal");
        let url = take_str("url");
        let publication_date = take_str("publication_date")
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());

        let authors = match record.remove("authors") {
            Some(Value::Array(items)) => items.iter().filter_map(Author::from_value).collect(),
            Some(other) => Author::from_value(&other).into_iter().collect(),
            None => vec![],
        };
        let open_access = record.remove("open_access").and_then(|v| v.as_bool());

        Ok(Self {
            id,
            source: source.to_string(),
            title,
            abstract_text,
            authors,
            doi,
            journal,
            publication_date,
            url,
            open_access,
            extra: record.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        })
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_record() {
        let rec = record(json!({
            "title": "KRAS G12D",
            "abstract": null,
            "authors": [{"name": "John Smith", "affiliation": "MIT"}, {"name": null}, "Jane Doe"],
            "doi": "10.1000/kras",
            "publication_date": "2023-01-15",
            "open_access": true,
            "cited_by_count": 12
        }));
        let doc = Document::from_record("openalex", "W1", rec).unwrap();
        assert_eq!(doc.id, "W1");
        assert_eq!(doc.source, "openalex");
        assert_eq!(doc.abstract_text, None);
        assert_eq!(doc.authors.len(), 2);
        assert_eq!(doc.authors[0].affiliation.as_deref(), Some("MIT"));
        assert_eq!(doc.authors[1].name, "Jane Doe");
        assert_eq!(doc.publication_date, NaiveDate::from_ymd_opt(2023, 1, 15));
        assert_eq!(doc.open_access, Some(true));
        assert_eq!(doc.extra["cited_by_count"], json!(12));
    }

    #[test]
    fn test_record_id_wins_and_bad_date_is_dropped() {
        let rec = record(json!({"id": 12345678, "publication_date": "sometime"}));
        let doc = Document::from_record("pubmed", "ignored", rec).unwrap();
        assert_eq!(doc.id, "12345678");
        assert_eq!(doc.publication_date, None);
    }

    #[test]
    fn test_missing_id_is_error() {
        let err = Document::from_record("pubmed", "", Record::new()).unwrap_err();
        assert!(matches!(err, BioconnectError::Extraction(_)));
    }
}
