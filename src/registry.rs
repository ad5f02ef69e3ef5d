//! Name and type-IRI lookup of node type descriptors

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{FieldDef, NodeType};

/// Node types known to a session, keyed by registry name and by `@type` IRI.
/// Populated once at startup, read thereafter.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    by_name: BTreeMap<&'static str, &'static NodeType>,
    by_type: BTreeMap<&'static str, &'static NodeType>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Add a node type. Registering the same descriptor twice is harmless; a
    /// different descriptor under an already used name or IRI is an error.
    pub fn register(&mut self, node_type: &'static NodeType) -> Result<()> {
        for (key, existing) in [
            (node_type.name, self.by_name.get(node_type.name)),
            (node_type.type_uri, self.by_type.get(node_type.type_uri)),
        ] {
            match existing {
                Some(existing) if !std::ptr::eq(*existing, node_type) => {
                    return Err(Error::config(format!(
                        "'{key}' is already registered to {}",
                        existing.name
                    )));
                }
                _ => {}
            }
        }
        debug!(target: "kg", name = node_type.name, "registering node type");
        self.by_name.insert(node_type.name, node_type);
        self.by_type.insert(node_type.type_uri, node_type);
        Ok(())
    }

    pub fn register_all(&mut self, node_types: &[&'static NodeType]) -> Result<()> {
        node_types.iter().try_for_each(|ty| self.register(ty))
    }

    pub fn lookup(&self, name: &str) -> Result<&'static NodeType> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn lookup_type(&self, type_uri: &str) -> Result<&'static NodeType> {
        self.by_type
            .get(type_uri)
            .copied()
            .ok_or_else(|| Error::UnknownType(type_uri.to_string()))
    }

    /// Registered types among the given `@type` IRIs, in the given order.
    pub fn lookup_types(&self, type_uris: &[&str]) -> Vec<&'static NodeType> {
        type_uris
            .iter()
            .filter_map(|uri| self.by_type.get(uri).copied())
            .collect()
    }

    /// Descriptors of a link field's target types.
    pub fn targets(&self, field: &FieldDef) -> Result<Vec<&'static NodeType>> {
        field
            .targets()
            .iter()
            .map(|name| self.lookup(name))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &'static NodeType> + '_ {
        self.by_name.values().copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
