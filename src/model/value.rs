use std::fmt;

use jiff::Timestamp;
use jiff::civil::Date;

use super::{Distribution, KgObject, KgProxy};

/// A field value held by a node object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(Date),
    DateTime(Timestamp),
    Iri(String),
    Node(NodeRef),
    Distribution(Distribution),
    /// Values of a multi-valued field, in order
    List(Vec<Value>),
}

/// A link to another node: either held in memory, or known only by URI.
#[derive(Debug, Clone)]
pub enum NodeRef {
    Resolved(Box<KgObject>),
    Unresolved(KgProxy),
}

impl Value {
    pub fn iri(iri: impl Into<String>) -> Value {
        Value::Iri(iri.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Iri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The single value, or each element of a list.
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Value::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    pub(crate) fn items_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Value::List(items) => items.iter_mut().collect(),
            other => vec![other],
        }
    }

    /// Human readable name of the value's type, used in error messages.
    pub fn type_label(&self) -> String {
        match self {
            Value::Str(_) => "str".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Date(_) => "date".to_string(),
            Value::DateTime(_) => "datetime".to_string(),
            Value::Iri(_) => "IRI".to_string(),
            Value::Node(node) => node.type_names().join(" | "),
            Value::Distribution(_) => "Distribution".to_string(),
            Value::List(_) => "list".to_string(),
        }
    }
}

impl NodeRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            NodeRef::Resolved(object) => object.id(),
            NodeRef::Unresolved(proxy) => Some(proxy.id()),
        }
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        match self {
            NodeRef::Resolved(object) => vec![object.node_type().name],
            NodeRef::Unresolved(proxy) => proxy.type_names(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, NodeRef::Resolved(_))
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeRef::Resolved(a), NodeRef::Resolved(b)) => a == b,
            _ => match (self.id(), other.id()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) | Value::Iri(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(date) => write!(f, "{date}"),
            Value::DateTime(timestamp) => write!(f, "{timestamp}"),
            Value::Node(node) => write!(f, "{node}"),
            Value::Distribution(distribution) => f.write_str(&distribution.location),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Resolved(object) => write!(
                f,
                "{}(id={})",
                object.node_type().short_name(),
                object.id().unwrap_or("None")
            ),
            NodeRef::Unresolved(proxy) => write!(
                f,
                "KgProxy({}, {})",
                proxy.type_names().join(" | "),
                proxy.id()
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::DateTime(value)
    }
}

impl From<NodeRef> for Value {
    fn from(value: NodeRef) -> Self {
        Value::Node(value)
    }
}

impl From<KgObject> for Value {
    fn from(value: KgObject) -> Self {
        Value::Node(NodeRef::Resolved(Box::new(value)))
    }
}

impl From<KgProxy> for Value {
    fn from(value: KgProxy) -> Self {
        Value::Node(NodeRef::Unresolved(value))
    }
}

impl From<Distribution> for Value {
    fn from(value: Distribution) -> Self {
        Value::Distribution(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}
