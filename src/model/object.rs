use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{Error, Result};
use crate::json_ld::{Document, JsonLdValue, document_space, expand_keys, vocab};
use crate::registry::Registry;
use crate::transport::Scope;

use super::{FieldDef, NodeRef, NodeType, Value};

/// A typed node of the knowledge graph, held in memory.
#[derive(Debug, Clone)]
pub struct KgObject {
    pub(super) node_type: &'static NodeType,
    pub(crate) id: Option<String>,
    pub(crate) space: Option<String>,
    pub(crate) scope: Option<Scope>,
    pub(crate) allow_update: bool,
    pub(super) values: BTreeMap<&'static str, Value>,
    /// Last known remote state, keys expanded, one entry per wire property
    pub(crate) remote_data: Document,
    /// Last raw document fetched or returned by a create
    pub(crate) raw_remote_data: Option<Document>,
}

/// Field-level differences between two node objects.
#[derive(Debug, Default, PartialEq)]
pub struct ObjectDiff {
    pub node_type: Option<(&'static str, &'static str)>,
    pub id: Option<(Option<String>, Option<String>)>,
    pub fields: BTreeMap<&'static str, (Option<Value>, Option<Value>)>,
}

impl ObjectDiff {
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none() && self.id.is_none() && self.fields.is_empty()
    }
}

impl KgObject {
    pub fn new(node_type: &'static NodeType) -> KgObject {
        KgObject {
            node_type,
            id: None,
            space: None,
            scope: None,
            allow_update: true,
            values: BTreeMap::new(),
            remote_data: Document::new(),
            raw_remote_data: None,
        }
    }

    /// Builder form of [`KgObject::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<KgObject> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Give an unsaved object a caller-chosen identity.
    pub fn with_id(mut self, id: impl Into<String>) -> KgObject {
        self.id = Some(id.into());
        self
    }

    pub fn with_space(mut self, space: impl Into<String>) -> KgObject {
        self.space = Some(space.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> KgObject {
        self.scope = Some(scope);
        self
    }

    /// Set a field after checking the value against the field's declared
    /// types. A single value given to a multi-valued field is stored as a
    /// one-element list; an empty list clears the field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.node_type.require_field(field)?;
        let value = match value.into() {
            Value::List(items) if items.is_empty() => {
                self.values.remove(field.name);
                return Ok(());
            }
            Value::List(items) if !field.multiple && items.len() == 1 => {
                items.into_iter().next().unwrap_or(Value::List(vec![]))
            }
            item @ Value::List(_) => item,
            item if field.multiple => Value::List(vec![item]),
            item => item,
        };
        field.check(&value)?;
        self.values.insert(field.name, value);
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.values.get_mut(field)
    }

    pub fn clear(&mut self, field: &str) -> Result<Option<Value>> {
        let field = self.node_type.require_field(field)?;
        Ok(self.values.remove(field.name))
    }

    pub fn node_type(&self) -> &'static NodeType {
        self.node_type
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Last path segment of the id.
    pub fn uuid(&self) -> Option<&str> {
        self.id
            .as_deref()
            .and_then(|id| id.rsplit('/').next())
            .filter(|uuid| !uuid.is_empty())
    }

    /// The space the store reports for this object, else the one set locally.
    pub fn space(&self) -> Option<&str> {
        self.raw_remote_data
            .as_ref()
            .and_then(document_space)
            .or(self.space.as_deref())
    }

    pub fn set_space(&mut self, space: impl Into<String>) {
        self.space = Some(space.into());
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    pub fn allow_update(&self) -> bool {
        self.allow_update
    }

    /// With updates disallowed, saving an existing object is a no-op.
    pub fn set_allow_update(&mut self, allow: bool) {
        self.allow_update = allow;
    }

    pub fn remote_data(&self) -> &Document {
        &self.remote_data
    }

    pub fn raw_remote_data(&self) -> Option<&Document> {
        self.raw_remote_data.as_ref()
    }

    /// Declared fields paired with their current values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldDef, Option<&Value>)> + '_ {
        self.node_type
            .fields
            .iter()
            .map(|field| (field, self.values.get(field.name)))
    }

    /// Serialize to a JSON-LD document with expanded keys.
    pub fn to_jsonld(&self, include_empty: bool, follow_links: bool) -> Document {
        let mut document = Document::new();
        document.insert(
            vocab::TYPE.as_str().to_string(),
            JsonValue::Array(vec![JsonValue::String(self.node_type.type_uri.to_string())]),
        );
        if let Some(id) = &self.id {
            document.insert(vocab::ID.as_str().to_string(), JsonValue::String(id.clone()));
        }
        let context = self.node_type.json_context();
        for (field, value) in self.fields() {
            let key = context.expand(field.path);
            match value {
                Some(value) => {
                    document.insert(key, field.serialize(value, follow_links));
                }
                None if include_empty => {
                    document.insert(key, JsonValue::Null);
                }
                None => {}
            }
        }
        document
    }

    /// Build an object from a document fetched from the store.
    pub fn from_kg_instance(
        node_type: &'static NodeType,
        document: &Document,
        registry: &Registry,
        scope: Option<Scope>,
    ) -> Result<KgObject> {
        if document.get(vocab::ID.as_str()).is_none() {
            return Err(Error::invalid_document(format!(
                "{} instance without @id",
                node_type.name
            )));
        }
        let mut object = KgObject::from_document(node_type, document, registry, true)?;
        object.scope = scope;
        Ok(object)
    }

    /// Build an object from a document, which may carry compact keys and its
    /// own `@context`. Nested documents become resolved children.
    pub fn from_document(
        node_type: &'static NodeType,
        document: &Document,
        registry: &Registry,
        include_id: bool,
    ) -> Result<KgObject> {
        let expanded = expand_keys(document, &node_type.json_context());
        let mut object = KgObject::new(node_type);
        object.values = deserialize_data(node_type, &expanded, registry, include_id)?;
        if include_id {
            object.id = expanded.ld_id_str().map(str::to_string);
        }
        object.remote_data = object.normalize_snapshot(expanded);
        object.raw_remote_data = Some(document.clone());
        Ok(object)
    }

    /// Fill fields that are empty locally from a remote document, and merge
    /// the document into the remote snapshot. Values set locally are kept.
    pub(crate) fn update_empty_fields(
        &mut self,
        document: &Document,
        registry: &Registry,
    ) -> Result<()> {
        let expanded = expand_keys(document, &self.node_type.json_context());
        let remote = deserialize_data(self.node_type, &expanded, registry, true)?;
        for (name, value) in remote {
            self.values.entry(name).or_insert(value);
        }
        let snapshot = self.normalize_snapshot(expanded);
        self.remote_data.extend(snapshot);
        Ok(())
    }

    /// Put a remote document in the same shape [`KgObject::to_jsonld`]
    /// produces, so that diffing compares like with like: declared fields
    /// are re-serialized without following links, other keys are kept.
    fn normalize_snapshot(&self, expanded: Document) -> Document {
        let context = self.node_type.json_context();
        let by_key: BTreeMap<String, &FieldDef> = self
            .node_type
            .fields
            .iter()
            .map(|field| (context.expand(field.path), field))
            .collect();
        expanded
            .into_iter()
            .map(|(key, raw)| {
                let value = match by_key.get(&key) {
                    Some(field) => normalize_wire_value(field, raw),
                    None => raw,
                };
                (key, value)
            })
            .collect()
    }

    /// The wire properties whose local value differs from the remote
    /// snapshot. Keys are expanded IRIs; `@` keys are never reported.
    pub fn modified_data(&self) -> Document {
        self.to_jsonld(true, false)
            .into_iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .filter(|(key, current)| {
                let remote = self.remote_data.get(key).unwrap_or(&JsonValue::Null);
                !same_wire_value(current, remote)
            })
            .collect()
    }

    pub fn diff(&self, other: &KgObject) -> ObjectDiff {
        let mut diff = ObjectDiff::default();
        if self.node_type != other.node_type {
            diff.node_type = Some((self.node_type.name, other.node_type.name));
            return diff;
        }
        if self.id != other.id {
            diff.id = Some((self.id.clone(), other.id.clone()));
        }
        for field in self.node_type.fields {
            let (mine, theirs) = (self.get(field.name), other.get(field.name));
            if mine != theirs {
                diff.fields
                    .insert(field.name, (mine.cloned(), theirs.cloned()));
            }
        }
        diff
    }

    /// Every linked node, in field order.
    pub fn children(&self) -> Vec<&NodeRef> {
        self.fields()
            .filter(|(field, _)| field.is_link())
            .filter_map(|(_, value)| value)
            .flat_map(Value::items)
            .filter_map(Value::as_node)
            .collect()
    }

    /// The first link field holding a node without an id.
    pub(crate) fn dangling_link(&self) -> Option<&'static str> {
        self.fields()
            .filter(|(field, _)| field.is_link())
            .find(|(_, value)| {
                value.is_some_and(|value| {
                    value
                        .items()
                        .into_iter()
                        .filter_map(Value::as_node)
                        .any(|node| node.id().is_none())
                })
            })
            .map(|(field, _)| field.name)
    }

    /// Render as a two-column table of id, space and every field.
    pub fn show(&self, max_width: Option<usize>) -> String {
        let mut rows: Vec<(&str, String)> = vec![
            ("id", self.id().unwrap_or("None").to_string()),
            ("space", self.space().unwrap_or("None").to_string()),
        ];
        rows.extend(self.fields().map(|(field, value)| {
            let text = value.map_or_else(|| "None".to_string(), Value::to_string);
            (field.name, text)
        }));
        let key_width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        let value_width = max_width.map(|width| width.saturating_sub(key_width + 2).max(8));
        rows.into_iter()
            .map(|(key, value)| {
                let value = match value_width {
                    Some(width) if value.chars().count() > width => {
                        let kept: String = value.chars().take(width - 4).collect();
                        format!("{kept} ...")
                    }
                    _ => value,
                };
                format!("{key:<key_width$}  {value}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn deserialize_data(
    node_type: &'static NodeType,
    expanded: &Document,
    registry: &Registry,
    include_id: bool,
) -> Result<BTreeMap<&'static str, Value>> {
    let context = node_type.json_context();
    let mut values = BTreeMap::new();
    for field in node_type.fields {
        let Some(raw) = expanded.get(&context.expand(field.path)) else {
            continue;
        };
        if let Some(value) = field.deserialize(raw, registry, include_id)? {
            values.insert(field.name, value);
        }
    }
    debug!(
        target: "kg",
        node_type = node_type.name,
        fields = ?values.keys().collect::<Vec<_>>(),
        "deserialized"
    );
    Ok(values)
}

/// Links reduce to bare references, multi-valued fields become arrays and a
/// one-element array on a single-valued field is unwrapped.
fn normalize_wire_value(field: &FieldDef, raw: JsonValue) -> JsonValue {
    let reduce = |item: JsonValue| {
        if !field.is_link() {
            return item;
        }
        let id = match &item {
            JsonValue::String(id) => Some(id.clone()),
            other => other.ld_id().map(str::to_string),
        };
        match id {
            Some(id) => serde_json::json!({ "@id": id }),
            None => item,
        }
    };
    match raw {
        JsonValue::Null => JsonValue::Null,
        JsonValue::Array(items) if items.is_empty() => JsonValue::Null,
        JsonValue::Array(mut items) if !field.multiple && items.len() == 1 => {
            reduce(items.remove(0))
        }
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(reduce).collect()),
        item if field.multiple => JsonValue::Array(vec![reduce(item)]),
        item => reduce(item),
    }
}

/// Wire equality that treats an empty array as absent.
fn same_wire_value(a: &JsonValue, b: &JsonValue) -> bool {
    let empty = |v: &JsonValue| v.is_null() || v.as_array().is_some_and(Vec::is_empty);
    (empty(a) && empty(b)) || a == b
}

trait DocumentId {
    fn ld_id_str(&self) -> Option<&str>;
}

impl DocumentId for Document {
    fn ld_id_str(&self) -> Option<&str> {
        self.get(vocab::ID.as_str()).and_then(JsonValue::as_str)
    }
}

impl DocumentId for JsonValue {
    fn ld_id_str(&self) -> Option<&str> {
        self.ld_id()
    }
}

impl PartialEq for KgObject {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type && self.id == other.id && self.values == other.values
    }
}

impl fmt::Display for KgObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.show(None))
    }
}
