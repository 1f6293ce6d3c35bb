//! Named value transforms.
//!
//! Built-ins live in a static table populated once at startup. Each
//! connector owns a [`TransformRegistry`] whose override table is consulted
//! first, so a source can add (or shadow) transforms without touching the
//! shared table.

pub mod built_in;

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde_json::Value;
use tracing::warn;

use crate::payload::Node;
use bioconnect_common::Result;

/// Everything a transform may look at besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Node the field resolved to (or the record root for path-less fields);
    /// sub-paths in `args` resolve relative to it.
    pub node: Node<'a>,
    /// Options from the spec's transform object, `Value::Null` for a bare name.
    pub args: &'a Value,
}

pub type TransformFn =
    Arc<dyn for<'a> Fn(Value, &TransformContext<'a>) -> Result<Value> + Send + Sync>;

lazy_static! {
    static ref BUILT_INS: HashMap<&'static str, TransformFn> = {
        let mut m: HashMap<&'static str, TransformFn> = HashMap::new();
        m.insert("integer",    Arc::new(built_in::integer));
        m.insert("date",       Arc::new(built_in::date));
        m.insert("text",       Arc::new(built_in::text));
        m.insert("list_count", Arc::new(built_in::list_count));
        m.insert("concat",     Arc::new(built_in::concat));
        m
    };
}

/// Transform names are matched with `-` and `_` treated alike.
pub fn normalize_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

/// Names of the shared built-in transforms.
pub fn built_in_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUILT_INS.keys().copied().collect();
    names.sort_unstable();
    names
}

#[derive(Clone, Default)]
pub struct TransformRegistry {
    overrides: HashMap<String, TransformFn>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.overrides.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry").field("overrides", &names).finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connector-specific transform. Shadows a built-in of the same name.
    pub fn register<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: for<'a> Fn(Value, &TransformContext<'a>) -> Result<Value> + Send + Sync + 'static,
    {
        self.overrides.insert(normalize_name(name), Arc::new(f));
        self
    }

    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: for<'a> Fn(Value, &TransformContext<'a>) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        let key = normalize_name(name);
        self.overrides
            .get(&key)
            .or_else(|| BUILT_INS.get(key.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Apply the transform called `name`.
    ///
    /// An unknown name is logged and the value passes through untouched.
    /// Errors raised by the transform itself are returned for the caller to
    /// absorb at field level.
    pub fn apply(&self, name: &str, value: Value, ctx: &TransformContext<'_>) -> Result<Value> {
        match self.get(name) {
            Some(f) => f(value, ctx),
            None => {
                warn!(transform = name, "Unknown transform, value left untransformed");
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(node: &Value) -> TransformContext<'_> {
        TransformContext { node: Node::Json(node), args: &Value::Null }
    }

    #[test]
    fn test_built_ins_present() {
        assert_eq!(built_in_names(), vec!["concat", "date", "integer", "list_count", "text"]);
        let registry = TransformRegistry::new();
        assert!(registry.contains("list-count"));
        assert!(registry.contains("integer"));
        assert!(!registry.contains("extract_id"));
    }

    #[test]
    fn test_unknown_transform_passes_value_through() {
        let registry = TransformRegistry::new();
        let root = json!({});
        let out = registry.apply("no_such_transform", json!("raw"), &ctx(&root)).unwrap();
        assert_eq!(out, json!("raw"));
    }

    #[test]
    fn test_override_shadows_built_in_only_locally() {
        let custom = TransformRegistry::new().with("text", |_, _| Ok(json!("custom")));
        let shared = TransformRegistry::new();
        let root = json!({});

        assert_eq!(custom.apply("text", json!(" x "), &ctx(&root)).unwrap(), json!("custom"));
        assert_eq!(shared.apply("text", json!(" x "), &ctx(&root)).unwrap(), json!("x"));
    }

    #[test]
    fn test_registered_names_normalized() {
        let registry = TransformRegistry::new().with("extract-id", |v, _| Ok(v["id"].clone()));
        let root = json!({});
        let out = registry.apply("extract_id", json!({"id": "a"}), &ctx(&root)).unwrap();
        assert_eq!(out, json!("a"));
    }
}
