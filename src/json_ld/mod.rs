//! Just enough JSON-LD

mod context;
pub mod vocab;

use serde_json::{Map, Value};
use tracing::warn;

pub use self::context::Context;
pub use self::vocab::Term;

/// A JSON-LD node object as exchanged with the store.
pub type Document = Map<String, Value>;

/// Validate JSON values with JSON-LD semantics
pub trait JsonLdValue {
    /// The `@id` of a node object or node reference
    fn ld_id(&self) -> Option<&str>;
    /// All `@type` values, whether given as a string or an array
    fn ld_types(&self) -> Vec<&str>;
    /// A node reference carries nothing but `@id` and `@type`
    fn is_node_reference(&self) -> bool;
}

impl JsonLdValue for Value {
    fn ld_id(&self) -> Option<&str> {
        self.get(vocab::ID.as_str()).and_then(Value::as_str)
    }
    fn ld_types(&self) -> Vec<&str> {
        match self.get(vocab::TYPE.as_str()) {
            Some(Value::String(typ)) => vec![typ.as_str()],
            Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
            _ => vec![],
        }
    }
    fn is_node_reference(&self) -> bool {
        match self.as_object() {
            Some(map) => map.keys().all(|key| {
                key == vocab::ID.as_str()
                    || key == vocab::TYPE.as_str()
                    || vocab::SPACE_KEYS.contains(&key.as_str())
            }),
            None => false,
        }
    }
}

/// Undo the JSON-LD quirk of collapsing single-element arrays: always yield a
/// sequence. `@list` containers are unwrapped, `null` yields nothing.
pub fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => vec![],
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) if map.contains_key(vocab::LIST.as_str()) => {
            as_list(&map[vocab::LIST.as_str()])
        }
        other => vec![other],
    }
}

/// Return a copy of `document` whose property keys are expanded against
/// `context`, merged with any `@context` the document carries itself. The
/// `@context` entry is dropped.
pub fn expand_keys(document: &Document, context: &Context) -> Document {
    let mut active = context.clone();
    match Context::try_from(&Value::Object(document.clone())) {
        Ok(local) => active.merge(local),
        Err(error) => warn!(target: "kg", %error, "ignoring the document's own @context"),
    }
    document
        .iter()
        .filter(|(key, _)| key.as_str() != vocab::CONTEXT.as_str())
        .map(|(key, value)| (active.expand(key), value.clone()))
        .collect()
}

/// All `@type` values of a document.
pub fn document_types(document: &Document) -> Vec<&str> {
    document
        .get(vocab::TYPE.as_str())
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .filter_map(Value::as_str)
        .collect()
}

/// The `@id` of a document.
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(vocab::ID.as_str()).and_then(Value::as_str)
}

/// The space a document reports, under either of the known keys.
pub fn document_space(document: &Document) -> Option<&str> {
    vocab::SPACE_KEYS
        .iter()
        .find_map(|key| document.get(*key).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        Context, JsonLdValue, as_list, document_id, document_space, document_types, expand_keys,
    };

    #[test]
    fn singleton_collapse_is_undone() {
        let bare = json!({ "@id": "https://kg.example/1" });
        assert_eq!(as_list(&bare).len(), 1);
        let list = json!([{ "@id": "a" }, { "@id": "b" }]);
        assert_eq!(as_list(&list).len(), 2);
        let container = json!({ "@list": ["x", "y", "z"] });
        assert_eq!(as_list(&container).len(), 3);
        assert!(as_list(&json!(null)).is_empty());
    }

    #[test]
    fn node_reference_detection() {
        assert!(json!({ "@id": "a", "@type": ["T"] }).is_node_reference());
        assert!(!json!({ "@id": "a", "https://x.example/name": "n" }).is_node_reference());
        assert!(!json!("a").is_node_reference());
    }

    #[test]
    fn types_from_string_or_array() {
        assert_eq!(json!({ "@type": "T" }).ld_types(), vec!["T"]);
        assert_eq!(json!({ "@type": ["S", "T"] }).ld_types(), vec!["S", "T"]);
        let document = json!({ "@id": "a", "@type": ["S", "T"] });
        let document = document.as_object().unwrap();
        assert_eq!(document_types(document), vec!["S", "T"]);
        assert_eq!(document_id(document), Some("a"));
    }

    #[test]
    fn keys_are_expanded_and_context_dropped() {
        let context = Context::from_prefixes(&[("vocab", "https://openminds.ebrains.eu/vocab/")]);
        let document = json!({
            "@context": { "schema": "http://schema.org/" },
            "@id": "https://kg.example/1",
            "vocab:fullName": "A model",
            "schema:name": "alias"
        });
        let expanded = expand_keys(document.as_object().unwrap(), &context);
        assert_eq!(
            expanded.get("https://openminds.ebrains.eu/vocab/fullName"),
            Some(&json!("A model"))
        );
        assert_eq!(expanded.get("http://schema.org/name"), Some(&json!("alias")));
        assert!(!expanded.contains_key("@context"));
    }

    #[test]
    fn space_from_either_key() {
        let meta = json!({ "https://core.kg.ebrains.eu/vocab/meta/space": "model" });
        assert_eq!(document_space(meta.as_object().unwrap()), Some("model"));
        let query = json!({ "https://schema.hbp.eu/myQuery/space": "dataset" });
        assert_eq!(document_space(query.as_object().unwrap()), Some("dataset"));
    }
}
