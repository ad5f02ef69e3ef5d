use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value as JsonValue, json};
use tracing::debug;
use uuid::Uuid;

use crate::config::DEFAULT_INSTANCE_PREFIX;
use crate::error::{Error, Result};
use crate::json_ld::vocab::{self, META_SPACE};
use crate::json_ld::{Document, JsonLdValue, as_list};
use crate::model::NodeType;

use super::{QueryRequest, ResultPage, Scope, Transport};

/// Number of calls made, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub fetches: usize,
    /// Fetches that allowed a cached answer
    pub cacheable_fetches: usize,
    pub queries: usize,
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
}

#[derive(Debug, Clone)]
struct Stored {
    document: Document,
    space: String,
    released: bool,
    /// Visible to queries and listings
    indexed: bool,
}

impl Stored {
    fn id(&self) -> &str {
        self.document
            .get(vocab::ID.as_str())
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }

    fn has_type(&self, type_uri: &str) -> bool {
        self.document
            .get(vocab::TYPE.as_str())
            .is_some_and(|types| as_list(types).iter().any(|ty| ty.as_str() == Some(type_uri)))
    }

    /// The document as the store hands it out, with its space.
    fn published(&self) -> Document {
        let mut document = self.document.clone();
        document.insert(META_SPACE.to_string(), JsonValue::String(self.space.clone()));
        document
    }
}

/// An in-process store.
///
/// Query definitions are evaluated directly against stored documents. New
/// instances can be kept out of the query index until [`MemoryTransport::sync_index`],
/// which is how the store behaves shortly after a write.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    instance_prefix: String,
    instances: Vec<Stored>,
    queries: BTreeMap<String, JsonValue>,
    denied_spaces: BTreeSet<String>,
    private_space: Option<String>,
    index_lag: bool,
    calls: CallCounts,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        MemoryTransport::new()
    }
}

impl MemoryTransport {
    pub fn new() -> MemoryTransport {
        MemoryTransport {
            instance_prefix: DEFAULT_INSTANCE_PREFIX.to_string(),
            instances: Vec::new(),
            queries: BTreeMap::new(),
            denied_spaces: BTreeSet::new(),
            private_space: None,
            index_lag: false,
            calls: CallCounts::default(),
        }
    }

    pub fn with_instance_prefix(mut self, prefix: impl Into<String>) -> MemoryTransport {
        self.instance_prefix = prefix.into();
        self
    }

    pub fn with_private_space(mut self, space: impl Into<String>) -> MemoryTransport {
        self.private_space = Some(space.into());
        self
    }

    /// Keep newly created instances out of queries until the index is synced.
    pub fn with_index_lag(mut self) -> MemoryTransport {
        self.index_lag = true;
        self
    }

    /// Refuse writes to `space` with an authorization error.
    pub fn deny_writes_to(&mut self, space: impl Into<String>) {
        self.denied_spaces.insert(space.into());
    }

    pub fn sync_index(&mut self) {
        for stored in &mut self.instances {
            stored.indexed = true;
        }
    }

    /// Make the current revision of an instance visible at the released scope.
    pub fn release(&mut self, uri: &str) -> bool {
        match self.find_mut(uri) {
            Some(stored) => {
                stored.released = true;
                true
            }
            None => false,
        }
    }

    /// Store an instance directly, bypassing access checks and call counts.
    /// `properties` are expanded wire properties. Returns the new URI.
    pub fn seed(&mut self, node_type: &NodeType, space: &str, properties: JsonValue) -> String {
        let id = format!("{}{}", self.instance_prefix, Uuid::new_v4());
        let mut document = match properties {
            JsonValue::Object(map) => map,
            _ => Document::new(),
        };
        document.insert(vocab::ID.as_str().to_string(), JsonValue::String(id.clone()));
        document.insert(vocab::TYPE.as_str().to_string(), json!([node_type.type_uri]));
        self.instances.push(Stored {
            document,
            space: space.to_string(),
            released: false,
            indexed: true,
        });
        id
    }

    /// The stored document at `uri`, regardless of scope.
    pub fn document(&self, uri: &str) -> Option<&Document> {
        self.find(uri).map(|stored| &stored.document)
    }

    pub fn space_of(&self, uri: &str) -> Option<&str> {
        self.find(uri).map(|stored| stored.space.as_str())
    }

    pub fn stored_query(&self, label: &str) -> Option<&JsonValue> {
        self.queries.get(label)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    fn find(&self, uri: &str) -> Option<&Stored> {
        self.instances.iter().find(|stored| stored.id() == uri)
    }

    fn find_mut(&mut self, uri: &str) -> Option<&mut Stored> {
        self.instances.iter_mut().find(|stored| stored.id() == uri)
    }

    fn check_write(&self, space: &str) -> Result<()> {
        if self.denied_spaces.contains(space) {
            return Err(Error::Authorization(format!(
                "no write access to space '{space}'"
            )));
        }
        Ok(())
    }

    /// Look up an instance for a write, checking its space is writable.
    fn writable(&mut self, uuid: &str) -> Result<&mut Stored> {
        let uri = self.uri_from_uuid(uuid);
        let space = match self.find(&uri) {
            Some(stored) => stored.space.clone(),
            None => {
                return Err(Error::Remote {
                    status: 404,
                    body: format!("instance {uuid} not found"),
                });
            }
        };
        self.check_write(&space)?;
        self.find_mut(&uri).ok_or_else(|| Error::Remote {
            status: 404,
            body: format!("instance {uuid} not found"),
        })
    }

    fn evaluate(
        &self,
        structure: &[JsonValue],
        stored: &Stored,
        request: &QueryRequest<'_>,
    ) -> Option<Document> {
        let mut output = Document::new();
        for element in structure {
            let property = element["propertyName"].as_str().unwrap_or_default();
            let path = element["path"].as_str().unwrap_or_default();
            let raw: Vec<JsonValue> = match path {
                "@id" => vec![JsonValue::String(stored.id().to_string())],
                "@type" => stored
                    .document
                    .get(vocab::TYPE.as_str())
                    .map(as_list)
                    .unwrap_or_default()
                    .into_iter()
                    .cloned()
                    .collect(),
                META_SPACE => vec![JsonValue::String(stored.space.clone())],
                other => stored
                    .document
                    .get(other)
                    .map(as_list)
                    .unwrap_or_default()
                    .into_iter()
                    .cloned()
                    .collect(),
            };

            let values: Vec<JsonValue> = match element["structure"].as_array() {
                Some(nested) => raw
                    .iter()
                    .filter_map(|item| self.evaluate_link(nested, item, request))
                    .collect(),
                None => raw,
            };

            if let Some(filter) = element.get("filter") {
                let expected = match filter.get("value") {
                    Some(value) => Some(value),
                    None => filter["parameter"]
                        .as_str()
                        .and_then(|name| request.filters.and_then(|filters| filters.get(name))),
                };
                if let Some(expected) = expected {
                    let op = filter["op"].as_str().unwrap_or("EQUALS");
                    if !values.iter().any(|actual| matches(op, actual, expected)) {
                        return None;
                    }
                }
            }
            let required = element["required"].as_bool().unwrap_or(false);
            match values.len() {
                0 if required => return None,
                0 => {}
                1 => {
                    output.insert(property.to_string(), values.into_iter().next()?);
                }
                _ => {
                    output.insert(property.to_string(), JsonValue::Array(values));
                }
            }
        }
        Some(output)
    }

    fn evaluate_link(
        &self,
        nested: &[JsonValue],
        item: &JsonValue,
        request: &QueryRequest<'_>,
    ) -> Option<JsonValue> {
        let uri = match item {
            JsonValue::String(uri) => uri.as_str(),
            other => other.ld_id()?,
        };
        let target = match self.find(uri) {
            Some(stored) => stored.clone(),
            None => Stored {
                document: [(vocab::ID.as_str().to_string(), json!(uri))]
                    .into_iter()
                    .collect(),
                space: String::new(),
                released: false,
                indexed: false,
            },
        };
        self.evaluate(nested, &target, request).map(JsonValue::Object)
    }

    fn visible<'a>(
        &'a self,
        scope: Scope,
        type_uri: &'a str,
        space: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Stored> + 'a {
        self.instances.iter().filter(move |stored| {
            stored.indexed
                && scope.sees(stored.released)
                && stored.has_type(type_uri)
                && space.is_none_or(|space| stored.space == space)
        })
    }
}

fn matches(op: &str, actual: &JsonValue, expected: &JsonValue) -> bool {
    if let JsonValue::Array(options) = expected {
        return options.iter().any(|option| matches(op, actual, option));
    }
    let text = |value: &JsonValue| match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Object(_) => value.ld_id().unwrap_or_default().to_string(),
        other => other.to_string(),
    };
    let (actual, expected) = (text(actual), text(expected));
    match op {
        "CONTAINS" => actual.to_lowercase().contains(&expected.to_lowercase()),
        _ => actual == expected,
    }
}

impl Transport for MemoryTransport {
    fn instance_prefix(&self) -> &str {
        &self.instance_prefix
    }

    fn instance_from_full_uri(
        &mut self,
        uri: &str,
        use_cache: bool,
        scope: Scope,
        _require_full_data: bool,
    ) -> Result<Option<Document>> {
        self.calls.fetches += 1;
        if use_cache {
            self.calls.cacheable_fetches += 1;
        }
        Ok(self
            .find(uri)
            .filter(|stored| scope.sees(stored.released))
            .map(Stored::published))
    }

    fn query(&mut self, request: &QueryRequest<'_>) -> Result<ResultPage> {
        self.calls.queries += 1;
        let type_uri = request.definition["meta"]["type"]
            .as_str()
            .ok_or_else(|| Error::value("query definition without meta.type"))?;
        let structure = request.definition["structure"]
            .as_array()
            .ok_or_else(|| Error::value("query definition without structure"))?;
        let wanted = request
            .instance_id
            .map(|uuid| self.uri_from_uuid(uuid));

        let matched: Vec<Document> = self
            .visible(request.scope, type_uri, request.space)
            .filter(|stored| wanted.as_deref().is_none_or(|uri| stored.id() == uri))
            .filter_map(|stored| self.evaluate(structure, stored, request))
            .collect();
        debug!(target: "kg::query", type_uri, total = matched.len(), "memory query");
        Ok(ResultPage {
            total: matched.len(),
            data: matched
                .into_iter()
                .skip(request.from_index)
                .take(request.size)
                .collect(),
        })
    }

    fn list(
        &mut self,
        type_uri: &str,
        space: Option<&str>,
        from_index: usize,
        size: usize,
        scope: Scope,
    ) -> Result<ResultPage> {
        self.calls.lists += 1;
        let matched: Vec<Document> = self
            .visible(scope, type_uri, space)
            .map(Stored::published)
            .collect();
        Ok(ResultPage {
            total: matched.len(),
            data: matched.into_iter().skip(from_index).take(size).collect(),
        })
    }

    fn create_new_instance(
        &mut self,
        document: &Document,
        space: &str,
        instance_id: Option<&str>,
    ) -> Result<Document> {
        self.calls.creates += 1;
        self.check_write(space)?;
        let uuid = instance_id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let id = self.uri_from_uuid(&uuid);
        if self.find(&id).is_some() {
            return Err(Error::ResourceExists(id));
        }
        let mut document: Document = document
            .iter()
            .filter(|(key, value)| !value.is_null() && key.as_str() != vocab::CONTEXT.as_str())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        document.insert(vocab::ID.as_str().to_string(), JsonValue::String(id));
        let stored = Stored {
            document,
            space: space.to_string(),
            released: false,
            indexed: !self.index_lag,
        };
        let published = stored.published();
        self.instances.push(stored);
        Ok(published)
    }

    fn update_instance(&mut self, uuid: &str, partial: &Document) -> Result<()> {
        self.calls.updates += 1;
        let stored = self.writable(uuid)?;
        for (key, value) in partial {
            if value.is_null() {
                stored.document.remove(key);
            } else {
                stored.document.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn replace_instance(&mut self, uuid: &str, document: &Document) -> Result<()> {
        self.calls.replaces += 1;
        let stored = self.writable(uuid)?;
        let id = stored.id().to_string();
        stored.document = document
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        stored
            .document
            .insert(vocab::ID.as_str().to_string(), JsonValue::String(id));
        Ok(())
    }

    fn delete_instance(&mut self, uuid: &str, ignore_not_found: bool) -> Result<()> {
        self.calls.deletes += 1;
        let found = match self.writable(uuid) {
            Ok(_) => true,
            Err(Error::Remote { status: 404, .. }) if ignore_not_found => false,
            Err(error) => return Err(error),
        };
        if found {
            let uri = self.uri_from_uuid(uuid);
            self.instances.retain(|stored| stored.id() != uri);
        }
        Ok(())
    }

    fn store_query(&mut self, label: &str, definition: &JsonValue, space: &str) -> Result<()> {
        self.check_write(space)?;
        self.queries.insert(label.to_string(), definition.clone());
        Ok(())
    }

    fn retrieve_query(&mut self, label: &str) -> Result<Option<JsonValue>> {
        Ok(self.queries.get(label).cloned())
    }

    fn private_space(&mut self) -> Result<Option<String>> {
        Ok(self.private_space.clone())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use crate::error::Error;
    use crate::filter::NormalizedFilter;
    use crate::model::testing::{DATASET, PERSON, registry};
    use crate::query::{QueryKey, QueryShape, generate_query};
    use crate::transport::{QueryRequest, Scope, Transport};

    use super::MemoryTransport;

    const GIVEN: &str = "https://openminds.ebrains.eu/vocab/givenName";

    fn request<'a>(
        definition: &'a serde_json::Value,
        filters: Option<&'a NormalizedFilter>,
    ) -> QueryRequest<'a> {
        QueryRequest {
            filters,
            definition,
            space: None,
            instance_id: None,
            from_index: 0,
            size: 100,
            scope: Scope::Any,
        }
    }

    #[test]
    fn contains_filter_matches_case_insensitively() -> Result<()> {
        let registry = registry();
        let mut transport = MemoryTransport::new();
        transport.seed(&PERSON, "common", json!({ GIVEN: "Ada" }));
        transport.seed(&PERSON, "common", json!({ GIVEN: "Grace" }));

        let key = QueryKey::new(&PERSON, QueryShape::Simple, None, &["given_name"]);
        let definition = generate_query(&key, None, &registry)?;
        let filters: NormalizedFilter = [("given_name".to_string(), json!("ad"))].into_iter().collect();
        let page = transport.query(&request(&definition, Some(&filters)))?;
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0][GIVEN], json!("Ada"));
        assert_eq!(page.data[0]["https://schema.hbp.eu/myQuery/space"], json!("common"));
        Ok(())
    }

    #[test]
    fn released_scope_hides_unreleased() -> Result<()> {
        let registry = registry();
        let mut transport = MemoryTransport::new();
        let uri = transport.seed(&PERSON, "common", json!({ GIVEN: "Ada" }));
        let definition = generate_query(&QueryKey::new(&PERSON, QueryShape::Simple, None, &[]), None, &registry)?;
        let mut released = request(&definition, None);
        released.scope = Scope::Released;
        assert_eq!(transport.query(&released)?.total, 0);
        assert!(transport.instance_from_full_uri(&uri, true, Scope::Released, true)?.is_none());
        transport.release(&uri);
        assert_eq!(transport.query(&released)?.total, 1);
        Ok(())
    }

    #[test]
    fn index_lag_hides_new_instances_from_queries() -> Result<()> {
        let registry = registry();
        let mut transport = MemoryTransport::new().with_index_lag();
        let document = [
            ("@type".to_string(), json!(["https://schema.example/Person"])),
            (GIVEN.to_string(), json!("Ada")),
        ]
        .into_iter()
        .collect();
        let created = transport.create_new_instance(&document, "common", None)?;
        let uri = created["@id"].as_str().unwrap_or_default().to_string();
        let definition = generate_query(&QueryKey::new(&PERSON, QueryShape::Simple, None, &[]), None, &registry)?;

        assert!(transport.instance_from_full_uri(&uri, true, Scope::Any, true)?.is_some());
        assert_eq!(transport.query(&request(&definition, None))?.total, 0);
        transport.sync_index();
        assert_eq!(transport.query(&request(&definition, None))?.total, 1);
        Ok(())
    }

    #[test]
    fn links_are_resolved_by_nested_structures() -> Result<()> {
        let registry = registry();
        let mut transport = MemoryTransport::new();
        let ada = transport.seed(&PERSON, "common", json!({ GIVEN: "Ada" }));
        transport.seed(
            &DATASET,
            "dataset",
            json!({ "https://openminds.ebrains.eu/vocab/author": [{ "@id": ada }] }),
        );
        let key = QueryKey::new(&DATASET, QueryShape::Resolved(1), None, &["authors"]);
        let definition = generate_query(&key, None, &registry)?;
        let filters: NormalizedFilter = [("authors".to_string(), json!(ada))].into_iter().collect();
        let page = transport.query(&request(&definition, Some(&filters)))?;
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0]["https://openminds.ebrains.eu/vocab/author"][GIVEN], json!("Ada"));

        let other: NormalizedFilter =
            [("authors".to_string(), json!("https://kg.ebrains.eu/api/instances/nobody"))]
                .into_iter()
                .collect();
        assert_eq!(transport.query(&request(&definition, Some(&other)))?.total, 0);
        Ok(())
    }

    #[test]
    fn writes_are_checked() -> Result<()> {
        let mut transport = MemoryTransport::new();
        transport.deny_writes_to("controlled");
        let document = [("@type".to_string(), json!(["https://schema.example/License"]))]
            .into_iter()
            .collect();
        assert!(matches!(
            transport.create_new_instance(&document, "controlled", None),
            Err(Error::Authorization(_))
        ));
        transport.create_new_instance(&document, "common", Some("fixed"))?;
        assert!(matches!(
            transport.create_new_instance(&document, "common", Some("fixed")),
            Err(Error::ResourceExists(_))
        ));
        transport.delete_instance("missing", true)?;
        assert!(transport.delete_instance("missing", false).is_err());
        Ok(())
    }
}
