//! Query definitions generated from node type declarations
//!
//! A definition lists, for each declared field, the wire property to return
//! (`propertyName`) and where to find it (`path`). Filtered fields carry a
//! `filter` naming the request parameter that holds the value. Link fields
//! have a nested `structure`, which includes the target's own fields when
//! links are followed.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Value as JsonValue, json};

use crate::error::Result;
use crate::json_ld::vocab::{META_SPACE, QUERY_NS, QUERY_SPACE, QUERY_VOCAB};
use crate::model::{FieldDef, FieldType, NodeType, ScalarType};
use crate::registry::Registry;

/// Prefix of every generated query label.
pub const LABEL_PREFIX: &str = "kgn";

/// Label used for the caller's personal space, whose real name varies.
pub const MY_SPACE: &str = "myspace";

/// How deep a query resolves links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Links are returned as references
    Simple,
    /// Links are resolved to this depth
    Resolved(u8),
}

impl QueryShape {
    pub fn from_depth(follow_links: u8) -> QueryShape {
        match follow_links {
            0 => QueryShape::Simple,
            depth => QueryShape::Resolved(depth),
        }
    }

    pub fn depth(&self) -> u8 {
        match self {
            QueryShape::Simple => 0,
            QueryShape::Resolved(depth) => *depth,
        }
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryShape::Simple => f.write_str("simple"),
            QueryShape::Resolved(depth) => write!(f, "resolved-{depth}"),
        }
    }
}

/// Everything a generated definition depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey<'a> {
    pub node_type: &'static NodeType,
    pub shape: QueryShape,
    pub space: Option<&'a str>,
    /// Sorted and deduplicated
    pub filter_keys: Vec<&'a str>,
}

impl<'a> QueryKey<'a> {
    pub fn new(
        node_type: &'static NodeType,
        shape: QueryShape,
        space: Option<&'a str>,
        filter_keys: &[&'a str],
    ) -> QueryKey<'a> {
        let filter_keys: BTreeSet<&'a str> = filter_keys.iter().copied().collect();
        QueryKey {
            node_type,
            shape,
            space,
            filter_keys: filter_keys.into_iter().collect(),
        }
    }

    /// Name under which the definition is stored, e.g.
    /// `kgn-Person-simple-common-filters-family_name-given_name`.
    pub fn label(&self) -> String {
        let space = match self.space {
            Some(space) if space.contains("private") => MY_SPACE,
            Some(space) => space,
            None => "all",
        };
        let mut label = format!(
            "{LABEL_PREFIX}-{}-{}-{space}",
            self.node_type.short_name(),
            self.shape
        );
        if !self.filter_keys.is_empty() {
            label.push_str("-filters-");
            label.push_str(&self.filter_keys.join("-"));
        }
        label
    }
}

/// Build the definition for `key`. `space` is the real space name to
/// restrict results to, with any alias already resolved.
pub fn generate_query(key: &QueryKey<'_>, space: Option<&str>, registry: &Registry) -> Result<JsonValue> {
    let node_type = key.node_type;
    let mut structure = vec![
        json!({
            "propertyName": "@id",
            "path": "@id",
            "filter": { "op": "EQUALS", "parameter": "id" }
        }),
        space_element(space),
        json!({ "propertyName": "@type", "path": "@type" }),
    ];
    structure.extend(field_elements(
        node_type,
        &key.filter_keys,
        key.shape.depth(),
        registry,
    )?);
    Ok(json!({
        "@context": {
            "@vocab": QUERY_VOCAB,
            "query": QUERY_NS,
            "propertyName": { "@id": "propertyName", "@type": "@id" },
            "path": { "@id": "path", "@type": "@id" }
        },
        "meta": {
            "type": node_type.type_uri,
            "name": key.label(),
            "description": format!("Generated for {} by kgweave", node_type.name)
        },
        "structure": structure
    }))
}

fn space_element(space: Option<&str>) -> JsonValue {
    let mut element = json!({ "propertyName": QUERY_SPACE, "path": META_SPACE });
    if let Some(space) = space {
        element["filter"] = json!({ "op": "EQUALS", "value": space });
    }
    element
}

fn field_elements(
    node_type: &NodeType,
    filter_keys: &[&str],
    depth: u8,
    registry: &Registry,
) -> Result<Vec<JsonValue>> {
    node_type
        .fields
        .iter()
        .map(|field| {
            let filtered = filter_keys.contains(&field.name);
            field_element(node_type, field, filtered, depth, registry)
        })
        .collect()
}

fn field_element(
    node_type: &NodeType,
    field: &FieldDef,
    filtered: bool,
    depth: u8,
    registry: &Registry,
) -> Result<JsonValue> {
    let path = node_type.expanded_path(field);
    let mut element = json!({ "propertyName": path, "path": path });
    match field.types {
        FieldType::Link(_) => {
            element["structure"] = JsonValue::Array(link_structure(field, filtered, depth, registry)?);
        }
        FieldType::Scalar(scalar) if filtered => {
            let op = match scalar {
                ScalarType::Str => "CONTAINS",
                _ => "EQUALS",
            };
            element["filter"] = json!({ "op": op, "parameter": field.name });
        }
        _ => {}
    }
    if filtered {
        element["required"] = json!(true);
    }
    if field.multiple {
        element["ensureOrder"] = json!(true);
    }
    Ok(element)
}

fn link_structure(
    field: &FieldDef,
    filtered: bool,
    depth: u8,
    registry: &Registry,
) -> Result<Vec<JsonValue>> {
    let mut id = json!({ "propertyName": "@id", "path": "@id" });
    if filtered {
        id["filter"] = json!({ "op": "EQUALS", "parameter": field.name });
    }
    let mut structure = vec![
        id,
        json!({ "propertyName": "@type", "path": "@type" }),
        space_element(None),
    ];
    if depth > 0 {
        let mut seen = BTreeSet::new();
        for target in registry.targets(field)? {
            for element in field_elements(target, &[], depth - 1, registry)? {
                let name = element["propertyName"].as_str().unwrap_or_default().to_string();
                if seen.insert(name) {
                    structure.push(element);
                }
            }
        }
    }
    Ok(structure)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use crate::model::testing::{DATASET, PERSON, registry};

    use super::{QueryKey, QueryShape, generate_query};

    fn element<'a>(structure: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
        structure
            .as_array()
            .and_then(|elements| elements.iter().find(|e| e["propertyName"] == json!(name)))
            .unwrap_or(&serde_json::Value::Null)
    }

    #[test]
    fn labels_are_stable() {
        let key = QueryKey::new(
            &PERSON,
            QueryShape::Simple,
            Some("common"),
            &["given_name", "family_name"],
        );
        assert_eq!(
            key.label(),
            "kgn-Person-simple-common-filters-family_name-given_name"
        );
        let private = QueryKey::new(&DATASET, QueryShape::Resolved(1), Some("private-1234"), &[]);
        assert_eq!(private.label(), "kgn-Dataset-resolved-1-myspace");
        let any = QueryKey::new(&DATASET, QueryShape::from_depth(0), None, &[]);
        assert_eq!(any.label(), "kgn-Dataset-simple-all");
    }

    #[test]
    fn filters_become_parameters() -> Result<()> {
        let registry = registry();
        let key = QueryKey::new(&DATASET, QueryShape::Simple, None, &["name", "release_date", "authors"]);
        let query = generate_query(&key, Some("dataset"), &registry)?;
        let structure = &query["structure"];
        assert_eq!(query["meta"]["type"], json!("https://schema.example/Dataset"));

        let name = element(structure, "https://openminds.ebrains.eu/vocab/fullName");
        assert_eq!(name["filter"], json!({ "op": "CONTAINS", "parameter": "name" }));
        assert_eq!(name["required"], json!(true));

        let date = element(structure, "https://openminds.ebrains.eu/vocab/releaseDate");
        assert_eq!(date["filter"]["op"], json!("EQUALS"));

        let authors = element(structure, "https://openminds.ebrains.eu/vocab/author");
        let id = element(&authors["structure"], "@id");
        assert_eq!(id["filter"], json!({ "op": "EQUALS", "parameter": "authors" }));

        let space = element(structure, "https://schema.hbp.eu/myQuery/space");
        assert_eq!(space["filter"]["value"], json!("dataset"));
        Ok(())
    }

    #[test]
    fn resolved_queries_nest_target_fields() -> Result<()> {
        let registry = registry();
        let simple = generate_query(&QueryKey::new(&DATASET, QueryShape::Simple, None, &[]), None, &registry)?;
        let resolved = generate_query(&QueryKey::new(&DATASET, QueryShape::Resolved(1), None, &[]), None, &registry)?;
        let given_name = "https://openminds.ebrains.eu/vocab/givenName";

        let shallow = element(&simple["structure"], "https://openminds.ebrains.eu/vocab/author");
        assert!(element(&shallow["structure"], given_name).is_null());

        let deep = element(&resolved["structure"], "https://openminds.ebrains.eu/vocab/author");
        assert!(!element(&deep["structure"], given_name).is_null());

        // polymorphic targets share fullName; it appears once
        let custodians = element(&resolved["structure"], "https://openminds.ebrains.eu/vocab/custodian");
        let full_names = custodians["structure"]
            .as_array()
            .map(|elements| {
                elements
                    .iter()
                    .filter(|e| e["propertyName"] == json!("https://openminds.ebrains.eu/vocab/fullName"))
                    .count()
            })
            .unwrap_or(0);
        assert_eq!(full_names, 1);
        Ok(())
    }
}
