//! Field-level query filters and their normalization into query parameters

mod plus_sign;

use std::collections::BTreeMap;

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{FieldDef, KgObject, KgProxy, NodeRef, NodeType, Value};

/// Normalized filters, keyed by field name: each value is a string, number
/// or boolean, or a list of them.
pub type NormalizedFilter = BTreeMap<String, JsonValue>;

/// Fields whose filter values are passed through unchecked.
const UNCHECKED_FIELDS: [&str; 1] = ["hash"];

/// One filter item: a field value, or the UUID of an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    Value(Value),
    Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
struct FilterValue {
    items: Vec<FilterItem>,
    many: bool,
}

/// Raw filters as given by a caller, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: BTreeMap<String, FilterValue>,
}

impl Filters {
    pub fn new() -> Filters {
        Filters::default()
    }

    /// Filter on a value; a [`Value::List`] matches any of its items.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Filters {
        let value = match value.into() {
            Value::List(items) => FilterValue {
                items: items.into_iter().map(FilterItem::Value).collect(),
                many: true,
            },
            item => FilterValue {
                items: vec![FilterItem::Value(item)],
                many: false,
            },
        };
        self.entries.insert(field.to_string(), value);
        self
    }

    pub fn with_uuid(mut self, field: &str, uuid: Uuid) -> Filters {
        self.entries.insert(
            field.to_string(),
            FilterValue {
                items: vec![FilterItem::Uuid(uuid)],
                many: false,
            },
        );
        self
    }

    pub fn with_items(mut self, field: &str, items: Vec<FilterItem>) -> Filters {
        self.entries
            .insert(field.to_string(), FilterValue { items, many: true });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl From<Value> for FilterItem {
    fn from(value: Value) -> Self {
        FilterItem::Value(value)
    }
}

impl From<Uuid> for FilterItem {
    fn from(uuid: Uuid) -> Self {
        FilterItem::Uuid(uuid)
    }
}

impl From<KgObject> for FilterItem {
    fn from(object: KgObject) -> Self {
        FilterItem::Value(object.into())
    }
}

impl From<KgProxy> for FilterItem {
    fn from(proxy: KgProxy) -> Self {
        FilterItem::Value(proxy.into())
    }
}

impl From<&str> for FilterItem {
    fn from(value: &str) -> Self {
        FilterItem::Value(value.into())
    }
}

/// Check raw filters against the node type's fields and turn them into
/// query parameters. Linked objects and proxies become URIs, UUIDs become
/// instance URIs under `instance_prefix`. A single value stays a scalar, a
/// list stays a list of the same length.
pub fn normalize_filter(
    node_type: &NodeType,
    filters: &Filters,
    instance_prefix: &str,
) -> Result<NormalizedFilter> {
    let mut normalized = NormalizedFilter::new();
    for (name, value) in &filters.entries {
        let field = node_type.require_field(name)?;
        if value.items.is_empty() {
            return Err(Error::value(format!("empty filter for {name}")));
        }
        if let Some(invalid) = value.items.iter().find(|item| !is_valid(field, item)) {
            let passthrough = UNCHECKED_FIELDS.contains(&field.name) || is_http_string(value);
            if !passthrough {
                return Err(Error::Type {
                    field: field.name.to_string(),
                    expected: field.expected(),
                    found: item_label(invalid),
                });
            }
        }
        let items = value
            .items
            .iter()
            .map(|item| filter_item(field, item, instance_prefix))
            .collect::<Result<Vec<_>>>()?;
        let output = if value.many {
            JsonValue::Array(items)
        } else {
            items.into_iter().next().unwrap_or(JsonValue::Null)
        };
        normalized.insert(name.clone(), output);
    }
    Ok(normalized)
}

fn is_valid(field: &FieldDef, item: &FilterItem) -> bool {
    match item {
        FilterItem::Uuid(_) => true,
        FilterItem::Value(Value::Iri(_)) => true,
        FilterItem::Value(value) => field.accepts(value),
    }
}

/// A single `http` string, taken to be an `@id`.
fn is_http_string(value: &FilterValue) -> bool {
    matches!(
        (value.many, value.items.as_slice()),
        (false, [FilterItem::Value(Value::Str(s))]) if s.starts_with("http")
    )
}

fn item_label(item: &FilterItem) -> String {
    match item {
        FilterItem::Uuid(_) => "UUID".to_string(),
        FilterItem::Value(value) => value.type_label(),
    }
}

fn filter_item(field: &FieldDef, item: &FilterItem, instance_prefix: &str) -> Result<JsonValue> {
    let value = match item {
        FilterItem::Uuid(uuid) => return Ok(JsonValue::String(format!("{instance_prefix}{uuid}"))),
        FilterItem::Value(value) => value,
    };
    Ok(match value {
        Value::Iri(iri) => JsonValue::String(iri.clone()),
        Value::Str(s) => JsonValue::String(plus_sign::truncate(s)?.to_string()),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Bool(b) => json!(b),
        Value::Date(date) => JsonValue::String(date.to_string()),
        Value::DateTime(timestamp) => JsonValue::String(timestamp.to_string()),
        Value::Node(node) => JsonValue::String(node_id(field, node)?.to_string()),
        Value::Distribution(distribution) => JsonValue::String(distribution.location.clone()),
        Value::List(_) => {
            return Err(Error::value(format!(
                "nested lists cannot be used to filter {}",
                field.name
            )));
        }
    })
}

fn node_id<'a>(field: &FieldDef, node: &'a NodeRef) -> Result<&'a str> {
    node.id().ok_or_else(|| {
        Error::value(format!(
            "cannot filter {} on an object that has not been saved",
            field.name
        ))
    })
}
