//! A connection to the store together with the state a client accumulates
//! while working with it: the registry of node types, the object and
//! existence caches, and the optional activity log.
//!
//! Class-level operations (fetch by id, list, count, lookups by name or
//! alias) live here; instance operations are methods on [`KgObject`].

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity::{ActivityLog, EntryKind};
use crate::cache::{ObjectCache, SaveCache};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{Filters, NormalizedFilter, normalize_filter};
use crate::json_ld::{Document, document_types};
use crate::model::{KgObject, NodeType, Value};
use crate::query::{MY_SPACE, QueryKey, QueryShape, generate_query};
use crate::registry::Registry;
use crate::transport::{QueryRequest, ResultPage, Scope, Transport};

/// How single instances are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub scope: Scope,
    /// Allow the transport and the object cache to answer
    pub use_cache: bool,
    /// Depth to which links are resolved by the query
    pub follow_links: u8,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            scope: Scope::Released,
            use_cache: true,
            follow_links: 0,
        }
    }
}

impl FetchOptions {
    pub fn with_scope(mut self, scope: Scope) -> FetchOptions {
        self.scope = scope;
        self
    }

    pub fn with_follow_links(mut self, depth: u8) -> FetchOptions {
        self.follow_links = depth;
        self
    }

    pub fn without_cache(mut self) -> FetchOptions {
        self.use_cache = false;
        self
    }
}

/// Which store API a listing goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Api {
    /// Query when there are filters, core listing otherwise
    #[default]
    Auto,
    Query,
    /// Plain listing by type; no filters, no link following
    Core,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub size: usize,
    pub from_index: usize,
    pub api: Api,
    pub scope: Scope,
    pub space: Option<String>,
    pub follow_links: u8,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            size: 100,
            from_index: 0,
            api: Api::Auto,
            scope: Scope::Released,
            space: None,
            follow_links: 0,
        }
    }
}

impl ListOptions {
    pub fn with_size(mut self, size: usize) -> ListOptions {
        self.size = size;
        self
    }

    pub fn with_from_index(mut self, from_index: usize) -> ListOptions {
        self.from_index = from_index;
        self
    }

    pub fn with_api(mut self, api: Api) -> ListOptions {
        self.api = api;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> ListOptions {
        self.scope = scope;
        self
    }

    pub fn in_space(mut self, space: impl Into<String>) -> ListOptions {
        self.space = Some(space.into());
        self
    }

    pub fn with_follow_links(mut self, depth: u8) -> ListOptions {
        self.follow_links = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Equals,
    Contains,
}

/// Options of [`Session::by_name`] and [`Session::from_alias`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupOptions {
    pub match_mode: MatchMode,
    pub space: Option<String>,
    pub scope: Scope,
    pub follow_links: u8,
}

impl LookupOptions {
    pub fn contains(mut self) -> LookupOptions {
        self.match_mode = MatchMode::Contains;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> LookupOptions {
        self.scope = scope;
        self
    }

    pub fn in_space(mut self, space: impl Into<String>) -> LookupOptions {
        self.space = Some(space.into());
        self
    }

    fn list_options(&self, size: usize) -> ListOptions {
        ListOptions {
            size,
            api: Api::Query,
            scope: self.scope,
            space: self.space.clone(),
            follow_links: self.follow_links,
            ..ListOptions::default()
        }
    }
}

pub struct Session<T: Transport> {
    transport: T,
    registry: Registry,
    config: Config,
    objects: ObjectCache,
    saved: SaveCache,
    activity: Option<ActivityLog>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, registry: Registry, config: Config) -> Session<T> {
        Session {
            transport,
            registry,
            config,
            objects: ObjectCache::default(),
            saved: SaveCache::default(),
            activity: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectCache {
        &mut self.objects
    }

    pub fn save_cache(&self) -> &SaveCache {
        &self.saved
    }

    pub(crate) fn save_cache_mut(&mut self) -> &mut SaveCache {
        &mut self.saved
    }

    pub fn clear_caches(&mut self) {
        self.objects.clear();
        self.saved.clear();
    }

    /// Start recording what `save` does. Has no effect when already on.
    pub fn enable_activity_log(&mut self) {
        self.activity.get_or_insert_with(ActivityLog::new);
    }

    pub fn activity_log(&self) -> Option<&ActivityLog> {
        self.activity.as_ref()
    }

    pub fn take_activity_log(&mut self) -> Option<ActivityLog> {
        self.activity.take()
    }

    pub(crate) fn record(
        &mut self,
        object: &KgObject,
        kind: EntryKind,
        delta: Option<Document>,
        space: Option<&str>,
    ) {
        if let Some(log) = &mut self.activity {
            log.record(object, kind, delta, space);
        }
    }

    pub fn instance_prefix(&self) -> &str {
        self.transport.instance_prefix()
    }

    pub fn normalize_filter(&self, node_type: &NodeType, filters: &Filters) -> Result<NormalizedFilter> {
        normalize_filter(node_type, filters, self.transport.instance_prefix())
    }

    /// The real name of `space`, resolving the `myspace` alias.
    pub fn resolve_space(&mut self, space: &str) -> Result<String> {
        if space != MY_SPACE {
            return Ok(space.to_string());
        }
        if let Some(private) = &self.config.kg.private_space {
            return Ok(private.clone());
        }
        self.transport
            .private_space()?
            .ok_or_else(|| Error::config("the store reports no private space for 'myspace'"))
    }

    /// The query definition for a type, filter set, space and depth: the
    /// stored one when stored queries are enabled and one exists, else a
    /// generated one, which is then stored.
    pub fn query_definition(
        &mut self,
        node_type: &'static NodeType,
        space: Option<&str>,
        filter_keys: &[&str],
        follow_links: u8,
    ) -> Result<JsonValue> {
        let key = QueryKey::new(node_type, QueryShape::from_depth(follow_links), space, filter_keys);
        let label = key.label();
        let stored = self.config.kg.use_stored_queries;
        if stored {
            if let Some(definition) = self.transport.retrieve_query(&label)? {
                debug!(target: "kg::query", %label, "using stored query");
                return Ok(definition);
            }
        }
        let real_space = space.map(|space| self.resolve_space(space)).transpose()?;
        let definition = generate_query(&key, real_space.as_deref(), &self.registry)?;
        if stored {
            let target = real_space.as_deref().unwrap_or(node_type.default_space);
            self.transport.store_query(&label, &definition, target)?;
            info!(target: "kg::query", %label, space = target, "stored query");
        }
        Ok(definition)
    }

    fn query_page(
        &mut self,
        node_type: &'static NodeType,
        filters: &Filters,
        options: &ListOptions,
    ) -> Result<ResultPage> {
        let normalized = self.normalize_filter(node_type, filters)?;
        let keys: Vec<&str> = normalized.keys().map(String::as_str).collect();
        let space = options.space.as_deref();
        let definition = self.query_definition(node_type, space, &keys, options.follow_links)?;
        let real_space = space.map(|space| self.resolve_space(space)).transpose()?;
        self.transport.query(&QueryRequest {
            filters: (!normalized.is_empty()).then_some(&normalized),
            definition: &definition,
            space: real_space.as_deref(),
            instance_id: None,
            from_index: options.from_index,
            size: options.size,
            scope: options.scope,
        })
    }

    fn core_page(
        &mut self,
        node_type: &'static NodeType,
        filters: &Filters,
        options: &ListOptions,
    ) -> Result<ResultPage> {
        if !filters.is_empty() {
            return Err(Error::value("filters cannot be used with the core api"));
        }
        if options.follow_links > 0 {
            return Err(Error::value("links cannot be followed with the core api"));
        }
        let real_space = options
            .space
            .as_deref()
            .map(|space| self.resolve_space(space))
            .transpose()?;
        self.transport.list(
            node_type.type_uri,
            real_space.as_deref(),
            options.from_index,
            options.size,
            options.scope,
        )
    }

    fn page(
        &mut self,
        node_type: &'static NodeType,
        filters: &Filters,
        options: &ListOptions,
    ) -> Result<ResultPage> {
        match options.api {
            Api::Query => self.query_page(node_type, filters, options),
            Api::Core => self.core_page(node_type, filters, options),
            Api::Auto if filters.is_empty() && options.follow_links == 0 => {
                self.core_page(node_type, filters, options)
            }
            Api::Auto => self.query_page(node_type, filters, options),
        }
    }

    /// One page of instances of a type, optionally filtered.
    pub fn list(
        &mut self,
        node_type: &'static NodeType,
        filters: &Filters,
        options: &ListOptions,
    ) -> Result<Vec<KgObject>> {
        let page = self.page(node_type, filters, options)?;
        debug!(
            target: "kg::query",
            node_type = node_type.name,
            returned = page.data.len(),
            total = page.total,
            "listed"
        );
        page.data
            .iter()
            .map(|document| {
                KgObject::from_kg_instance(node_type, document, &self.registry, Some(options.scope))
            })
            .collect()
    }

    /// Total number of instances matching, regardless of page size.
    pub fn count(
        &mut self,
        node_type: &'static NodeType,
        filters: &Filters,
        options: &ListOptions,
    ) -> Result<usize> {
        let options = ListOptions {
            size: 1,
            from_index: 0,
            ..options.clone()
        };
        Ok(self.page(node_type, filters, &options)?.total)
    }

    /// The instance at `uri`, or `None` if the store has none at that scope.
    pub fn from_uri(
        &mut self,
        node_type: &'static NodeType,
        uri: &str,
        options: &FetchOptions,
    ) -> Result<Option<KgObject>> {
        debug!(target: "kg", node_type = node_type.name, uri, follow_links = options.follow_links, "fetching");
        let document = if options.follow_links > 0 {
            let definition = self.query_definition(node_type, None, &[], options.follow_links)?;
            let uuid = self.transport.uuid_from_uri(uri)?;
            self.transport
                .query(&QueryRequest {
                    filters: None,
                    definition: &definition,
                    space: None,
                    instance_id: Some(&uuid),
                    from_index: 0,
                    size: 1,
                    scope: options.scope,
                })?
                .data
                .into_iter()
                .next()
        } else {
            self.transport
                .instance_from_full_uri(uri, options.use_cache, options.scope, true)?
        };
        document
            .map(|document| {
                KgObject::from_kg_instance(node_type, &document, &self.registry, Some(options.scope))
            })
            .transpose()
    }

    pub fn from_uuid(
        &mut self,
        node_type: &'static NodeType,
        uuid: &str,
        options: &FetchOptions,
    ) -> Result<Option<KgObject>> {
        let uri = self.uri_for_uuid(uuid)?;
        self.from_uri(node_type, &uri, options)
    }

    /// Fetch by URI or UUID. Without a node type, the type is chosen from
    /// the document's `@type` among registered types.
    pub fn from_id(
        &mut self,
        node_type: Option<&'static NodeType>,
        id: &str,
        options: &FetchOptions,
    ) -> Result<Option<KgObject>> {
        let uri = if id.starts_with("http") {
            id.to_string()
        } else {
            self.uri_for_uuid(id)?
        };
        if let Some(node_type) = node_type {
            return self.from_uri(node_type, &uri, options);
        }
        if options.follow_links > 0 {
            return Err(Error::value("following links needs a node type"));
        }
        let Some(document) =
            self.transport
                .instance_from_full_uri(&uri, options.use_cache, options.scope, true)?
        else {
            return Ok(None);
        };
        let node_type = self.type_of(&document)?;
        KgObject::from_kg_instance(node_type, &document, &self.registry, Some(options.scope)).map(Some)
    }

    fn uri_for_uuid(&self, uuid: &str) -> Result<String> {
        if uuid.is_empty() {
            return Err(Error::value("empty UUID"));
        }
        Uuid::parse_str(uuid).map_err(|error| Error::value(format!("{error} - '{uuid}'")))?;
        Ok(self.transport.uri_from_uuid(uuid))
    }

    fn type_of(&self, document: &Document) -> Result<&'static NodeType> {
        let types = document_types(document);
        self.registry
            .lookup_types(&types)
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnknownType(types.join(", ")))
    }

    /// Which of `candidates` the instance at `uri` is.
    pub fn identify(
        &mut self,
        uri: &str,
        candidates: &[&'static NodeType],
        options: &FetchOptions,
    ) -> Result<&'static NodeType> {
        let document = self
            .transport
            .instance_from_full_uri(uri, options.use_cache, options.scope, false)?
            .ok_or_else(|| Error::ResolutionFailure(uri.to_string()))?;
        let types = document_types(&document);
        candidates
            .iter()
            .find(|candidate| types.contains(&candidate.type_uri))
            .copied()
            .ok_or_else(|| {
                Error::ResolutionFailure(format!(
                    "{uri} has type {} which is not one of the link's targets",
                    types.join(", ")
                ))
            })
    }

    /// Delete the instance at `uri` and evict it from the object cache.
    pub fn delete_uri(&mut self, uri: &str, ignore_not_found: bool) -> Result<()> {
        let uuid = self.transport.uuid_from_uri(uri)?;
        self.transport.delete_instance(&uuid, ignore_not_found)?;
        self.objects.remove(uri);
        info!(target: "kg", uri, "deleted");
        Ok(())
    }

    /// All instances whose `name` matches. With [`MatchMode::Equals`] the
    /// remote substring matches are narrowed to exact ones.
    pub fn by_name_all(
        &mut self,
        node_type: &'static NodeType,
        name: &str,
        options: &LookupOptions,
    ) -> Result<Vec<KgObject>> {
        node_type.require_field("name")?;
        let filters = Filters::new().with("name", name);
        let mut objects = self.list(node_type, &filters, &options.list_options(100))?;
        if options.match_mode == MatchMode::Equals {
            objects.retain(|object| object.get("name").and_then(Value::as_str) == Some(name));
        }
        Ok(objects)
    }

    /// The first instance whose `name` matches.
    pub fn by_name(
        &mut self,
        node_type: &'static NodeType,
        name: &str,
        options: &LookupOptions,
    ) -> Result<Option<KgObject>> {
        let mut objects = self.by_name_all(node_type, name, options)?;
        if objects.len() > 1 {
            warn!(
                target: "kg::query",
                node_type = node_type.name,
                name,
                count = objects.len(),
                "several instances share this name, returning the first; use by_name_all to get all of them"
            );
        }
        Ok((!objects.is_empty()).then(|| objects.swap_remove(0)))
    }

    /// The instance with this alias. A lone candidate is returned as is;
    /// among several, an exact match is preferred.
    pub fn from_alias(
        &mut self,
        node_type: &'static NodeType,
        alias: &str,
        options: &LookupOptions,
    ) -> Result<Option<KgObject>> {
        node_type.require_field("alias")?;
        let filters = Filters::new().with("alias", alias);
        let mut candidates = self.list(node_type, &filters, &options.list_options(20))?;
        if candidates.len() > 1 {
            match candidates
                .iter()
                .position(|candidate| candidate.get("alias").and_then(Value::as_str) == Some(alias))
            {
                Some(exact) => return Ok(Some(candidates.swap_remove(exact))),
                None => warn!(
                    target: "kg::query",
                    node_type = node_type.name,
                    alias,
                    count = candidates.len(),
                    "no exact alias match, returning the first candidate"
                ),
            }
        }
        Ok((!candidates.is_empty()).then(|| candidates.swap_remove(0)))
    }

    /// Generate and store the unfiltered simple and resolved queries of a
    /// type. A refusal from the store is logged, not returned.
    pub fn store_queries(&mut self, node_type: &'static NodeType, space: Option<&str>) -> Result<()> {
        let real_space = space.map(|space| self.resolve_space(space)).transpose()?;
        let target = real_space.as_deref().unwrap_or(node_type.default_space);
        for shape in [QueryShape::Simple, QueryShape::Resolved(1)] {
            let key = QueryKey::new(node_type, shape, space, &[]);
            let label = key.label();
            let definition = generate_query(&key, real_space.as_deref(), &self.registry)?;
            match self.transport.store_query(&label, &definition, target) {
                Ok(()) => info!(target: "kg::query", %label, space = target, "stored query"),
                Err(Error::Authorization(reason)) => {
                    warn!(target: "kg::query", %label, %reason, "not allowed to store query")
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// The single instance of `parent_type` whose `field` links to `child`,
    /// searched in the child's space and scope.
    pub fn find_parent(
        &mut self,
        parent_type: &'static NodeType,
        field: &str,
        child: &KgObject,
    ) -> Result<KgObject> {
        let link = parent_type.require_field(field)?;
        if !link.is_link() {
            return Err(Error::config(format!(
                "{}.{field} is not a link field",
                parent_type.name
            )));
        }
        let child_id = child
            .id()
            .ok_or_else(|| Error::value("cannot look up the parent of an unsaved object"))?;
        let options = ListOptions {
            api: Api::Query,
            scope: child.scope().unwrap_or_default(),
            space: child.space().map(str::to_string),
            ..ListOptions::default()
        };
        let filters = Filters::new().with(field, child.clone());
        let mut parents = self.list(parent_type, &filters, &options)?;
        match parents.len() {
            1 => Ok(parents.swap_remove(0)),
            0 => Err(Error::ResolutionFailure(format!(
                "no {} links to {child_id} through {field}",
                parent_type.name
            ))),
            n => Err(Error::ResolutionFailure(format!(
                "{n} instances of {} link to {child_id} through {field}",
                parent_type.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use crate::config::Config;
    use crate::error::Error;
    use crate::filter::Filters;
    use crate::model::testing::{
        DATASET, LICENSE, ORGANIZATION, PERSON, VOCAB, session, session_with,
    };
    use crate::model::{KgObject, NodeRef, Value};
    use crate::transport::{MemoryTransport, Scope, Transport};

    use super::{Api, FetchOptions, ListOptions, LookupOptions};

    fn key(term: &str) -> String {
        format!("{VOCAB}{term}")
    }

    fn any() -> ListOptions {
        ListOptions::default().with_scope(Scope::Any)
    }

    #[test]
    fn list_uses_core_without_filters() -> Result<()> {
        let mut session = session();
        for name in ["EBRAINS", "CNRS", "Human Brain Project"] {
            session
                .transport_mut()
                .seed(&ORGANIZATION, "common", json!({ key("fullName"): name }));
        }
        let all = session.list(&ORGANIZATION, &Filters::new(), &any())?;
        assert_eq!(all.len(), 3);
        assert_eq!(session.transport().calls().lists, 1);

        let filtered = session.list(&ORGANIZATION, &Filters::new().with("name", "brain"), &any())?;
        assert_eq!(filtered.len(), 2);
        assert_eq!(session.transport().calls().queries, 1);

        let page = session.list(&ORGANIZATION, &Filters::new(), &any().with_size(2).with_from_index(2))?;
        assert_eq!(page.len(), 1);
        assert_eq!(session.count(&ORGANIZATION, &Filters::new(), &any())?, 3);
        Ok(())
    }

    #[test]
    fn released_scope_is_the_default() -> Result<()> {
        let mut session = session();
        let uri = session
            .transport_mut()
            .seed(&ORGANIZATION, "common", json!({ key("fullName"): "EBRAINS" }));
        assert!(session.list(&ORGANIZATION, &Filters::new(), &ListOptions::default())?.is_empty());
        session.transport_mut().release(&uri);
        let listed = session.list(&ORGANIZATION, &Filters::new(), &ListOptions::default())?;
        assert_eq!(listed[0].scope(), Some(Scope::Released));
        Ok(())
    }

    #[test]
    fn core_api_rejects_filters() {
        let mut session = session();
        let options = any().with_api(Api::Core);
        let filtered = session.list(&ORGANIZATION, &Filters::new().with("name", "x"), &options);
        assert!(matches!(filtered, Err(Error::Value(_))));
        let deep = session.list(&ORGANIZATION, &Filters::new(), &options.with_follow_links(1));
        assert!(matches!(deep, Err(Error::Value(_))));
    }

    #[test]
    fn unknown_filter_fields_are_rejected() {
        let mut session = session();
        let result = session.list(&ORGANIZATION, &Filters::new().with("colour", "blue"), &any());
        assert!(matches!(result, Err(Error::UnknownField { .. })));
    }

    #[test]
    fn fetch_by_uuid_and_uri() -> Result<()> {
        let mut session = session();
        let uri = session
            .transport_mut()
            .seed(&LICENSE, "controlled", json!({ key("fullName"): "CC BY 4.0" }));
        let uuid = session.transport().uuid_from_uri(&uri)?;
        let options = FetchOptions::default().with_scope(Scope::InProgress);

        let license = session.from_uuid(&LICENSE, &uuid, &options)?;
        assert_eq!(license.as_ref().and_then(|l| l.id()), Some(uri.as_str()));
        assert_eq!(license.as_ref().and_then(|l| l.space()), Some("controlled"));

        // not released yet
        assert!(session.from_uri(&LICENSE, &uri, &FetchOptions::default())?.is_none());

        assert!(matches!(
            session.from_uuid(&LICENSE, "", &options),
            Err(Error::Value(_))
        ));
        assert!(matches!(
            session.from_uuid(&LICENSE, "not-a-uuid", &options),
            Err(Error::Value(_))
        ));
        Ok(())
    }

    #[test]
    fn generic_fetch_picks_the_registered_type() -> Result<()> {
        let mut session = session();
        let uri = session
            .transport_mut()
            .seed(&PERSON, "common", json!({ key("givenName"): "Ada" }));
        let options = FetchOptions::default().with_scope(Scope::Any);
        let person = session.from_id(None, &uri, &options)?;
        assert_eq!(person.map(|p| p.node_type().name), Some("test.Person"));
        assert!(session.from_id(None, &uri, &options.with_follow_links(1)).is_err());
        Ok(())
    }

    #[test]
    fn follow_links_resolves_children_in_one_query() -> Result<()> {
        let mut session = session();
        let org = session
            .transport_mut()
            .seed(&ORGANIZATION, "common", json!({ key("fullName"): "EBRAINS" }));
        let person = session.transport_mut().seed(
            &PERSON,
            "common",
            json!({ key("givenName"): "Ada", key("affiliation"): { "@id": org } }),
        );
        let options = FetchOptions::default()
            .with_scope(Scope::Any)
            .with_follow_links(1);
        let fetched = session
            .from_uri(&PERSON, &person, &options)?
            .ok_or_else(|| anyhow::anyhow!("person not found"))?;
        match fetched.get("affiliation") {
            Some(Value::Node(NodeRef::Resolved(affiliation))) => {
                assert_eq!(affiliation.get("name"), Some(&Value::from("EBRAINS")));
            }
            other => panic!("expected a resolved affiliation, got {other:?}"),
        }
        assert_eq!(session.transport().calls().fetches, 0);
        Ok(())
    }

    #[test]
    fn lookup_by_name_is_exact_unless_asked() -> Result<()> {
        let mut session = session();
        for name in ["Brain Atlas", "Brain Atlas v2"] {
            session
                .transport_mut()
                .seed(&DATASET, "dataset", json!({ key("fullName"): name }));
        }
        let options = LookupOptions::default().with_scope(Scope::Any);
        let exact = session.by_name_all(&DATASET, "Brain Atlas", &options)?;
        assert_eq!(exact.len(), 1);
        let loose = session.by_name_all(&DATASET, "Brain Atlas", &options.clone().contains())?;
        assert_eq!(loose.len(), 2);
        assert!(session.by_name(&DATASET, "Atlas", &options)?.is_none());
        assert!(session.by_name(&DATASET, "Atlas", &options.contains())?.is_some());
        Ok(())
    }

    #[test]
    fn lookup_by_alias() -> Result<()> {
        let mut session = session();
        for (name, alias) in [("Creative Commons Attribution", "CC BY"), ("CC BY-SA", "CC BY-SA")] {
            session.transport_mut().seed(
                &LICENSE,
                "controlled",
                json!({ key("fullName"): name, key("shortName"): alias }),
            );
        }
        let options = LookupOptions::default().with_scope(Scope::Any);
        let license = session.from_alias(&LICENSE, "CC BY", &options)?;
        assert_eq!(
            license.and_then(|l| l.get("name").cloned()),
            Some(Value::from("Creative Commons Attribution"))
        );
        assert!(session.from_alias(&LICENSE, "GPL", &options)?.is_none());
        assert!(matches!(
            session.from_alias(&PERSON, "Ada", &options),
            Err(Error::UnknownField { .. })
        ));
        Ok(())
    }

    #[test]
    fn stored_queries_are_reused() -> Result<()> {
        let mut config = Config::default();
        config.kg.use_stored_queries = true;
        let mut session = session_with(MemoryTransport::new(), config);
        session.list(&ORGANIZATION, &Filters::new().with("name", "x"), &any())?;
        let label = "kgn-Organization-simple-all-filters-name";
        assert!(session.transport().stored_query(label).is_some());

        session.store_queries(&PERSON, Some("common"))?;
        assert!(session.transport().stored_query("kgn-Person-simple-common").is_some());
        assert!(session.transport().stored_query("kgn-Person-resolved-1-common").is_some());
        Ok(())
    }

    #[test]
    fn refused_query_storage_is_only_logged() -> Result<()> {
        let mut session = session();
        session.transport_mut().deny_writes_to("controlled");
        session.store_queries(&LICENSE, None)?;
        assert!(session.transport().stored_query("kgn-License-simple-all").is_none());
        Ok(())
    }

    #[test]
    fn myspace_resolves_to_the_private_space() -> Result<()> {
        let mut session = session_with(
            MemoryTransport::new().with_private_space("private-42"),
            Config::default(),
        );
        assert_eq!(session.resolve_space("myspace")?, "private-42");
        assert_eq!(session.resolve_space("common")?, "common");

        let mut config = Config::default();
        config.kg.private_space = Some("private-7".to_string());
        let mut configured = session_with(MemoryTransport::new(), config);
        assert_eq!(configured.resolve_space("myspace")?, "private-7");

        let mut without = session_with(MemoryTransport::new(), Config::default());
        assert!(matches!(
            without.resolve_space("myspace"),
            Err(Error::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn find_parent_needs_exactly_one() -> Result<()> {
        let mut session = session();
        let person = session
            .transport_mut()
            .seed(&PERSON, "common", json!({ key("givenName"): "Ada" }));
        let ada = KgObject::new(&PERSON).with_id(person.clone()).with_scope(Scope::Any);

        assert!(matches!(
            session.find_parent(&DATASET, "authors", &ada),
            Err(Error::ResolutionFailure(_))
        ));

        session.transport_mut().seed(
            &DATASET,
            "dataset",
            json!({ key("fullName"): "First", key("author"): [{ "@id": person }] }),
        );
        let parent = session.find_parent(&DATASET, "authors", &ada)?;
        assert_eq!(parent.get("name"), Some(&Value::from("First")));

        session.transport_mut().seed(
            &DATASET,
            "dataset",
            json!({ key("fullName"): "Second", key("author"): [{ "@id": person }] }),
        );
        assert!(matches!(
            session.find_parent(&DATASET, "authors", &ada),
            Err(Error::ResolutionFailure(_))
        ));
        assert!(matches!(
            session.find_parent(&DATASET, "name", &ada),
            Err(Error::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn delete_evicts_from_the_cache() -> Result<()> {
        let mut session = session();
        let uri = session
            .transport_mut()
            .seed(&ORGANIZATION, "common", json!({ key("fullName"): "EBRAINS" }));
        let options = FetchOptions::default().with_scope(Scope::Any);
        if let Some(org) = session.from_uri(&ORGANIZATION, &uri, &options)? {
            session.objects_mut().insert(org);
        }
        assert!(session.cache().contains(&uri));
        session.delete_uri(&uri, false)?;
        assert!(!session.cache().contains(&uri));
        assert!(session.transport().document(&uri).is_none());
        assert!(matches!(
            session.delete_uri(&uri, false),
            Err(Error::Remote { status: 404, .. })
        ));
        session.delete_uri(&uri, true)?;
        Ok(())
    }
}
