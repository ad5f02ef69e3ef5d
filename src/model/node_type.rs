use std::fmt;

use crate::error::{Error, Result};
use crate::json_ld::Context;

use super::FieldDef;

/// How a node type decides whether an in-memory object already exists
/// remotely when it has no id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceQuery {
    /// Never look for an existing instance; every unsaved object is created.
    /// For types whose instances are intentionally not deduplicated.
    Disabled,
    /// Fields whose values together identify an instance.
    Fields(&'static [&'static str]),
}

impl ExistenceQuery {
    /// Assumes `name` is unique within a type, which many types override.
    pub const DEFAULT: ExistenceQuery = ExistenceQuery::Fields(&["name"]);
}

impl Default for ExistenceQuery {
    fn default() -> Self {
        ExistenceQuery::DEFAULT
    }
}

/// Static descriptor of a node type: the declared field list plus the
/// metadata needed to map instances to and from the store.
pub struct NodeType {
    /// Registry key, e.g. `openminds.core.Person`
    pub name: &'static str,
    /// `@type` IRI of instances
    pub type_uri: &'static str,
    /// Space new instances go to when neither the caller nor the object says
    pub default_space: &'static str,
    /// Prefixes used by compact field paths
    pub context: &'static [(&'static str, &'static str)],
    pub fields: &'static [FieldDef],
    pub existence: ExistenceQuery,
}

impl NodeType {
    /// The last component of the registry name, e.g. `Person`.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit('.').next().unwrap_or(self.name)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().find(|field| field.name == name)
    }

    pub fn require_field(&self, name: &str) -> Result<&'static FieldDef> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            type_name: self.name.to_string(),
            field: name.to_string(),
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn json_context(&self) -> Context {
        Context::from_prefixes(self.context)
    }

    /// Absolute IRI of a field's wire property.
    pub fn expanded_path(&self, field: &FieldDef) -> String {
        self.json_context().expand(field.path)
    }

    /// Field descriptors named by the existence configuration, in order.
    /// An empty field list disables matching like [`ExistenceQuery::Disabled`].
    pub(crate) fn existence_fields(&self) -> Result<Option<Vec<&'static FieldDef>>> {
        let names = match self.existence {
            ExistenceQuery::Fields(names) if !names.is_empty() => names,
            _ => return Ok(None),
        };
        let fields = names
            .iter()
            .map(|name| self.require_field(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(fields))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
