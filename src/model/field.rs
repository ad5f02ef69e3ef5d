use jiff::Timestamp;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use serde_json::{Number, Value as JsonValue, json};
use tracing::warn;

use crate::error::{Error, Result};
use crate::json_ld::{JsonLdValue, as_list};
use crate::registry::Registry;

use super::{Distribution, KgObject, KgProxy, NodeRef, Value};

/// Scalar value types a field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    Iri,
}

/// What a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Links to nodes of any of the named types (registry names)
    Link(&'static [&'static str]),
    Distribution,
}

/// Declaration of one attribute of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Unique within a type
    pub name: &'static str,
    pub types: FieldType,
    /// Wire property, compact (`vocab:fullName`) or absolute
    pub path: &'static str,
    pub multiple: bool,
    pub required: bool,
    /// Linked nodes are owned by the parent and saved along with it
    pub intrinsic: bool,
    pub doc: &'static str,
}

impl FieldDef {
    pub const fn scalar(name: &'static str, ty: ScalarType, path: &'static str) -> FieldDef {
        FieldDef {
            name,
            types: FieldType::Scalar(ty),
            path,
            multiple: false,
            required: false,
            intrinsic: true,
            doc: "",
        }
    }

    pub const fn link(
        name: &'static str,
        targets: &'static [&'static str],
        path: &'static str,
    ) -> FieldDef {
        FieldDef {
            name,
            types: FieldType::Link(targets),
            path,
            multiple: false,
            required: false,
            intrinsic: true,
            doc: "",
        }
    }

    pub const fn distribution(name: &'static str, path: &'static str) -> FieldDef {
        FieldDef {
            name,
            types: FieldType::Distribution,
            path,
            multiple: false,
            required: false,
            intrinsic: true,
            doc: "",
        }
    }

    pub const fn multiple(mut self) -> FieldDef {
        self.multiple = true;
        self
    }

    pub const fn required(mut self) -> FieldDef {
        self.required = true;
        self
    }

    /// Links that merely reference their target; the target is never saved
    /// as part of saving this node.
    pub const fn reference(mut self) -> FieldDef {
        self.intrinsic = false;
        self
    }

    pub const fn doc(mut self, doc: &'static str) -> FieldDef {
        self.doc = doc;
        self
    }

    pub fn is_link(&self) -> bool {
        matches!(self.types, FieldType::Link(_))
    }

    /// Registry names of link targets; empty for non-link fields.
    pub fn targets(&self) -> &'static [&'static str] {
        match self.types {
            FieldType::Link(targets) => targets,
            _ => &[],
        }
    }

    pub fn expected(&self) -> String {
        let single = match self.types {
            FieldType::Scalar(scalar) => scalar.label().to_string(),
            FieldType::Link(targets) => targets.join(" | "),
            FieldType::Distribution => "Distribution".to_string(),
        };
        if self.multiple {
            format!("{single} (or a list of them)")
        } else {
            single
        }
    }

    /// Whether a single item is a member of this field's declared types.
    pub fn accepts(&self, item: &Value) -> bool {
        match (self.types, item) {
            (FieldType::Scalar(scalar), item) => scalar.accepts(item),
            (FieldType::Link(targets), Value::Node(node)) => node
                .type_names()
                .iter()
                .any(|name| targets.contains(name)),
            (FieldType::Distribution, Value::Distribution(_)) => true,
            _ => false,
        }
    }

    /// Enforce the field invariant on a complete value.
    pub fn check(&self, value: &Value) -> Result<()> {
        let mismatch = |found: &Value| Error::Type {
            field: self.name.to_string(),
            expected: self.expected(),
            found: found.type_label(),
        };
        match value {
            Value::List(_) if !self.multiple => Err(mismatch(value)),
            Value::List(items) => match items.iter().find(|item| !self.accepts(item)) {
                Some(item) => Err(mismatch(item)),
                None => Ok(()),
            },
            item if self.accepts(item) => Ok(()),
            item => Err(mismatch(item)),
        }
    }

    /// Convert a value to its JSON-LD form. Multi-valued fields always produce
    /// an array. Links produce `{"@id": ...}` references unless `follow_links`
    /// is set and the linked node is held in memory.
    pub fn serialize(&self, value: &Value, follow_links: bool) -> JsonValue {
        match value {
            Value::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| serialize_item(item, follow_links))
                    .collect(),
            ),
            item if self.multiple => JsonValue::Array(vec![serialize_item(item, follow_links)]),
            item => serialize_item(item, follow_links),
        }
    }

    /// Inverse of [`FieldDef::serialize`]. `null` and empty arrays give
    /// `None`. Link items become proxies, or resolved objects when the item is
    /// a nested document produced by following links.
    pub fn deserialize(
        &self,
        raw: &JsonValue,
        registry: &Registry,
        include_id: bool,
    ) -> Result<Option<Value>> {
        let items = as_list(raw);
        if items.is_empty() {
            return Ok(None);
        }
        let mut values = items
            .into_iter()
            .map(|item| self.deserialize_item(item, registry, include_id))
            .collect::<Result<Vec<_>>>()?;
        if self.multiple {
            return Ok(Some(Value::List(values)));
        }
        if values.len() > 1 {
            warn!(
                target: "kg",
                field = self.name,
                count = values.len(),
                "single-valued field received several values, keeping the first"
            );
        }
        Ok(Some(values.swap_remove(0)))
    }

    fn deserialize_item(
        &self,
        item: &JsonValue,
        registry: &Registry,
        include_id: bool,
    ) -> Result<Value> {
        match self.types {
            FieldType::Scalar(scalar) => scalar.parse(self.name, item),
            FieldType::Distribution => Ok(Value::Distribution(Distribution::from_jsonld(item)?)),
            FieldType::Link(_) => self.deserialize_link(item, registry, include_id),
        }
    }

    fn deserialize_link(
        &self,
        item: &JsonValue,
        registry: &Registry,
        include_id: bool,
    ) -> Result<Value> {
        let uri = match item {
            JsonValue::String(uri) => uri.as_str(),
            JsonValue::Object(_) => item.ld_id().ok_or_else(|| {
                Error::invalid_document(format!("{}: linked node without @id", self.name))
            })?,
            other => {
                return Err(Error::invalid_document(format!(
                    "{}: expected a node reference, found {other}",
                    self.name
                )));
            }
        };
        let declared = registry.targets(self)?;
        let stated = registry
            .lookup_types(&item.ld_types())
            .into_iter()
            .find(|ty| declared.contains(ty));

        if let Some(document) = item.as_object().filter(|_| !item.is_node_reference()) {
            let node_type = match (stated, declared.as_slice()) {
                (Some(ty), _) => ty,
                (None, [only]) => *only,
                (None, _) => {
                    return Err(Error::invalid_document(format!(
                        "{}: cannot tell which of {} the linked node is",
                        self.name,
                        self.targets().join(", ")
                    )));
                }
            };
            let object = KgObject::from_document(node_type, document, registry, include_id)?;
            return Ok(Value::Node(NodeRef::Resolved(Box::new(object))));
        }

        let proxy = match stated {
            Some(ty) => KgProxy::new(ty, uri),
            None => KgProxy::polymorphic(declared, uri),
        };
        Ok(Value::Node(NodeRef::Unresolved(proxy)))
    }
}

fn serialize_item(item: &Value, follow_links: bool) -> JsonValue {
    match item {
        Value::Str(s) | Value::Iri(s) => JsonValue::String(s.clone()),
        Value::Int(i) => json!(i),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Date(date) => JsonValue::String(date.to_string()),
        Value::DateTime(timestamp) => JsonValue::String(timestamp.to_string()),
        Value::Node(NodeRef::Resolved(object)) if follow_links => {
            JsonValue::Object(object.to_jsonld(false, true))
        }
        Value::Node(node) => json!({ "@id": node.id() }),
        Value::Distribution(distribution) => distribution.to_jsonld(),
        Value::List(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| serialize_item(item, follow_links))
                .collect(),
        ),
    }
}

impl ScalarType {
    pub fn label(&self) -> &'static str {
        match self {
            ScalarType::Str => "str",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Bool => "bool",
            ScalarType::Date => "date",
            ScalarType::DateTime => "datetime",
            ScalarType::Iri => "IRI",
        }
    }

    fn accepts(&self, item: &Value) -> bool {
        matches!(
            (self, item),
            (ScalarType::Str, Value::Str(_))
                | (ScalarType::Int, Value::Int(_))
                | (ScalarType::Float, Value::Float(_) | Value::Int(_))
                | (ScalarType::Bool, Value::Bool(_))
                | (ScalarType::Date, Value::Date(_))
                | (ScalarType::DateTime, Value::DateTime(_))
                | (ScalarType::Iri, Value::Iri(_))
        )
    }

    fn parse(&self, field: &str, item: &JsonValue) -> Result<Value> {
        let parsed = match (self, item) {
            (ScalarType::Str, JsonValue::String(s)) => Some(Value::Str(s.clone())),
            (ScalarType::Int, JsonValue::Number(n)) => n.as_i64().map(Value::Int),
            (ScalarType::Float, JsonValue::Number(n)) => n.as_f64().map(Value::Float),
            (ScalarType::Bool, JsonValue::Bool(b)) => Some(Value::Bool(*b)),
            (ScalarType::Date, JsonValue::String(s)) => parse_date(s).map(Value::Date),
            (ScalarType::DateTime, JsonValue::String(s)) => {
                parse_timestamp(s).map(Value::DateTime)
            }
            (ScalarType::Iri, JsonValue::String(s)) => Some(Value::Iri(s.clone())),
            (ScalarType::Iri, JsonValue::Object(_)) => item.ld_id().map(Value::iri),
            _ => None,
        };
        parsed.ok_or_else(|| {
            Error::invalid_document(format!(
                "{field}: expected {}, found {item}",
                self.label()
            ))
        })
    }
}

fn parse_date(s: &str) -> Option<Date> {
    // the store sometimes hands back dates with a time component
    s.parse::<Date>()
        .ok()
        .or_else(|| s.get(..10).and_then(|prefix| prefix.parse::<Date>().ok()))
}

fn parse_timestamp(s: &str) -> Option<Timestamp> {
    if let Ok(timestamp) = s.parse::<Timestamp>() {
        return Some(timestamp);
    }
    // naive date-times are taken as UTC
    s.parse::<DateTime>()
        .ok()
        .and_then(|civil| civil.to_zoned(TimeZone::UTC).ok())
        .map(|zoned| zoned.timestamp())
}
