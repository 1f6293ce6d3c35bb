//! Response mapping: raw payload + response spec → normalized record.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::path;
use crate::payload::{Node, Payload};
use crate::spec::{FieldDetail, FieldSpec, ResponseSpec, TransformRef};
use crate::transform::{TransformContext, TransformRegistry};
use bioconnect_common::{BioconnectError, Result};

/// A normalized document or search summary, keyed by output field name.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct ResponseMapper {
    transforms: TransformRegistry,
}

impl ResponseMapper {
    pub fn new(transforms: TransformRegistry) -> Self {
        Self { transforms }
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// Map `payload` according to `spec`.
    ///
    /// Never fails: an unreachable `data_path` yields an empty record, and a
    /// field that errors is logged and set to `null` while the remaining
    /// fields are still produced.
    pub fn map(&self, payload: &Payload, spec: &ResponseSpec) -> Record {
        let root = match spec.data_path.as_deref().filter(|p| !p.is_empty()) {
            None => payload.root(),
            Some(data_path) => match payload.root() {
                Node::Json(value) => match path::resolve(Node::Json(value), data_path) {
                    Some(node) => node,
                    None => {
                        warn!(data_path, "Data path not found in response, returning empty record");
                        return Record::new();
                    }
                },
                Node::Xml(_) => {
                    warn!(data_path, "Data path applies to JSON responses only, returning empty record");
                    return Record::new();
                }
            },
        };
        self.map_fields(root, &spec.mapping)
    }

    fn map_fields(&self, node: Node<'_>, mapping: &BTreeMap<String, FieldSpec>) -> Record {
        mapping
            .iter()
            .map(|(name, field)| {
                let value = self.map_field(node, field).unwrap_or_else(|e| {
                    warn!(field = name.as_str(), error = %e, "Field mapping failed, using null");
                    Value::Null
                });
                (name.clone(), value)
            })
            .collect()
    }

    fn map_field(&self, node: Node<'_>, field: &FieldSpec) -> Result<Value> {
        let detail = match field {
            FieldSpec::Path(p) => return Ok(path::extract(node, p)),
            FieldSpec::Detailed(d) => d,
        };

        if detail.list {
            return self.map_list(node, detail);
        }

        match detail.path.as_deref() {
            Some(p) => match path::resolve(node, p) {
                None => Ok(Value::Null),
                Some(found) if found.is_null() => Ok(Value::Null),
                Some(found) => match &detail.transform {
                    Some(t) => self.apply(t, found.to_value(), found),
                    None => Ok(found.to_value()),
                },
            },
            // Computed fields such as `concat` read from the current node
            None => match &detail.transform {
                Some(t) => self.apply(t, Value::Null, node),
                None => {
                    debug!("Field has neither path nor transform");
                    Ok(Value::Null)
                }
            },
        }
    }

    fn map_list(&self, node: Node<'_>, detail: &FieldDetail) -> Result<Value> {
        let p = detail
            .path
            .as_deref()
            .ok_or_else(|| BioconnectError::Extraction("list field requires a path".into()))?;

        let mut items = Vec::new();
        for element in path::extract_all(node, p) {
            let value = if let Some(mapping) = &detail.mapping {
                Value::Object(self.map_fields(element, mapping))
            } else if let Some(t) = &detail.transform {
                self.apply(t, element.to_value(), element)?
            } else {
                element.to_value()
            };
            if !value.is_null() {
                items.push(value);
            }
        }
        Ok(Value::Array(items))
    }

    fn apply(&self, transform: &TransformRef, value: Value, node: Node<'_>) -> Result<Value> {
        let (name, args) = transform.resolve().ok_or_else(|| {
            BioconnectError::Transform(format!("unrecognized transform object: {transform:?}"))
        })?;
        self.transforms
            .apply(&name, value, &TransformContext { node, args: &args })
    }
}
