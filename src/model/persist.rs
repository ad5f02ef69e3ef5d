//! Instance operations against the store: existence checks, saving,
//! deleting and link resolution.
//!
//! `save` writes children before their parent so that every link the
//! parent sends points at a stored instance. Whether an object is created,
//! updated or left alone depends on [`KgObject::exists`], which matches
//! unsaved objects against the store on the fields their type declares
//! as identifying.

use tracing::{debug, error, info, warn};

use crate::activity::EntryKind;
use crate::cache::CacheKey;
use crate::error::{Error, Result};
use crate::filter::{Filters, NormalizedFilter};
use crate::json_ld::{Document, document_id};
use crate::session::{FetchOptions, Session};
use crate::transport::{QueryRequest, Scope, Transport};

use super::{KgObject, NodeRef, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Space to create the object in; defaults to where it already lives,
    /// then to its type's default space
    pub space: Option<String>,
    /// Save linked objects held in memory first
    pub recursive: bool,
    /// Overwrite the remote document instead of patching it
    pub replace: bool,
    /// Log refused writes instead of failing
    pub ignore_auth_errors: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            space: None,
            recursive: true,
            replace: false,
            ignore_auth_errors: false,
        }
    }
}

impl SaveOptions {
    pub fn in_space(mut self, space: impl Into<String>) -> SaveOptions {
        self.space = Some(space.into());
        self
    }

    pub fn non_recursive(mut self) -> SaveOptions {
        self.recursive = false;
        self
    }

    pub fn replacing(mut self) -> SaveOptions {
        self.replace = true;
        self
    }

    pub fn tolerant(mut self) -> SaveOptions {
        self.ignore_auth_errors = true;
        self
    }
}

/// Candidates fetched per existence query page.
const EXISTENCE_PAGE_SIZE: usize = 20;

enum Placement {
    /// Already stored in a protected space; linked as is
    Skip,
    Save(Option<String>),
}

impl KgObject {
    /// Whether the store holds this object. An object with an id is looked
    /// up directly; otherwise its identifying fields are queried, and a
    /// match assigns the id. Remote values fill fields that are empty
    /// locally.
    pub fn exists<T: Transport>(&mut self, session: &mut Session<T>) -> Result<bool> {
        if let Some(id) = self.id.clone() {
            let scope = self.scope.unwrap_or(Scope::Any);
            let Some(document) = session
                .transport_mut()
                .instance_from_full_uri(&id, false, scope, false)?
            else {
                return Ok(false);
            };
            if self.raw_remote_data.is_none() {
                self.raw_remote_data = Some(document.clone());
            }
            self.update_empty_fields(&document, session.registry())?;
            return Ok(true);
        }

        let Some(filter) = self.existence_filter(session)? else {
            return Ok(false);
        };
        let key = CacheKey::from_filter(&filter);
        if let Some(id) = session.save_cache().get(self.node_type, &key).map(str::to_string) {
            debug!(target: "kg::save", node_type = self.node_type.name, %id, "existence cache hit");
            if let Some(cached) = session.cache().get(&id) {
                self.remote_data = cached.remote_data.clone();
                if self.raw_remote_data.is_none() {
                    self.raw_remote_data = cached.raw_remote_data.clone();
                }
            }
            self.id = Some(id);
            return Ok(true);
        }

        let Some(document) = self.find_identical(session, &filter)? else {
            return Ok(false);
        };
        let id = document_id(&document)
            .ok_or_else(|| Error::invalid_document("query result without @id"))?
            .to_string();
        debug!(target: "kg::save", node_type = self.node_type.name, %id, "found by existence query");
        session
            .save_cache_mut()
            .insert(self.node_type, key, id.clone());
        self.id = Some(id);
        if self.raw_remote_data.is_none() {
            self.raw_remote_data = Some(document.clone());
        }
        self.update_empty_fields(&document, session.registry())?;
        Ok(true)
    }

    /// The first stored instance whose identifying fields equal `filter`.
    /// String filters match substrings in the store, so candidates are
    /// compared here after normalization.
    fn find_identical<T: Transport>(
        &self,
        session: &mut Session<T>,
        filter: &NormalizedFilter,
    ) -> Result<Option<Document>> {
        let keys: Vec<&str> = filter.keys().map(String::as_str).collect();
        let definition = session.query_definition(self.node_type, None, &keys, 0)?;
        let mut from_index = 0;
        loop {
            let page = session.transport_mut().query(&QueryRequest {
                filters: Some(filter),
                definition: &definition,
                space: None,
                instance_id: None,
                from_index,
                size: EXISTENCE_PAGE_SIZE,
                scope: Scope::Any,
            })?;
            let fetched = page.data.len();
            for document in page.data {
                let candidate =
                    KgObject::from_kg_instance(self.node_type, &document, session.registry(), None)?;
                let identical = match candidate.existence_filter(session) {
                    Ok(Some(found)) => filter.iter().all(|(name, value)| found.get(name) == Some(value)),
                    // a value the filter rules reject cannot equal one they accepted
                    Ok(None) | Err(_) => false,
                };
                if identical {
                    return Ok(Some(document));
                }
                debug!(
                    target: "kg::save",
                    node_type = self.node_type.name,
                    id = candidate.id().unwrap_or_default(),
                    "partial match, not the same instance"
                );
            }
            from_index += fetched;
            if fetched == 0 || from_index >= page.total {
                return Ok(None);
            }
        }
    }

    /// The normalized filter on the identifying fields that hold values, or
    /// `None` when the type disables matching or none of them is set.
    fn existence_filter<T: Transport>(&self, session: &Session<T>) -> Result<Option<NormalizedFilter>> {
        let Some(fields) = self.node_type.existence_fields()? else {
            return Ok(None);
        };
        let filters = fields
            .iter()
            .filter_map(|field| self.get(field.name).map(|value| (field.name, value)))
            .fold(Filters::new(), |filters, (name, value)| filters.with(name, value.clone()));
        if filters.is_empty() {
            return Ok(None);
        }
        session.normalize_filter(self.node_type, &filters).map(Some)
    }

    /// Create the object, or update it if the store already holds it.
    pub fn save<T: Transport>(&mut self, session: &mut Session<T>, options: &SaveOptions) -> Result<()> {
        if options.recursive {
            self.save_children(session, options)?;
        }
        let space = options
            .space
            .as_deref()
            .or(self.space())
            .unwrap_or(self.node_type.default_space)
            .to_string();
        let space = session.resolve_space(&space)?;

        if let Some(field) = self.dangling_link() {
            let failure = Error::value(format!(
                "{}.{field} links to an object that has not been saved",
                self.node_type.name
            ));
            if !options.ignore_auth_errors {
                return Err(failure);
            }
            error!(target: "kg::save", node_type = self.node_type.name, %failure, "not saving");
        } else if self.exists(session)? {
            self.update_existing(session, options, &space)?;
        } else {
            self.create(session, options, &space)?;
        }

        if self.id.is_some() {
            session.objects_mut().insert(self.clone());
        } else {
            warn!(
                target: "kg::save",
                node_type = self.node_type.name,
                "object was not saved and has no id; see the errors above"
            );
        }
        Ok(())
    }

    fn save_children<T: Transport>(&mut self, session: &mut Session<T>, options: &SaveOptions) -> Result<()> {
        let parent_space = self.space().map(str::to_string);
        let node_type = self.node_type;
        for field in node_type.fields.iter().filter(|field| field.intrinsic && field.is_link()) {
            let Some(value) = self.values.get_mut(field.name) else {
                continue;
            };
            for item in value.items_mut() {
                let Value::Node(NodeRef::Resolved(child)) = item else {
                    continue;
                };
                let space = match child_placement(child, session, options, parent_space.as_deref())? {
                    Placement::Skip => {
                        debug!(target: "kg::save", child = child.node_type.name, "child is in a protected space, not saving");
                        continue;
                    }
                    Placement::Save(space) => space,
                };
                let child_options = SaveOptions {
                    space,
                    recursive: true,
                    replace: false,
                    ignore_auth_errors: options.ignore_auth_errors,
                };
                child.save(session, &child_options)?;
            }
        }
        Ok(())
    }

    fn update_existing<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        options: &SaveOptions,
        space: &str,
    ) -> Result<()> {
        let uuid = self
            .uuid()
            .map(str::to_string)
            .ok_or_else(|| Error::value("existing object without a usable id"))?;
        if !self.allow_update {
            info!(target: "kg::save", node_type = self.node_type.name, %uuid, "updates not allowed, skipping");
            session.record(self, EntryKind::NoOp, None, Some(space));
            return Ok(());
        }
        let local = self.to_jsonld(false, false);

        if options.replace {
            info!(target: "kg::save", node_type = self.node_type.name, %uuid, "replacing");
            match session.transport_mut().replace_instance(&uuid, &local) {
                Ok(()) => {
                    session.record(self, EntryKind::Replacement, Some(local.clone()), Some(space));
                    self.remote_data = local;
                }
                Err(Error::Authorization(reason)) if options.ignore_auth_errors => {
                    error!(target: "kg::save", %uuid, %reason, "replacement refused");
                }
                Err(failure) => return Err(failure),
            }
            return Ok(());
        }

        let mut modified = self.modified_data();
        let locked: Vec<String> = modified
            .keys()
            .filter(|key| session.config().save.is_locked(key))
            .cloned()
            .collect();
        for property in locked {
            warn!(target: "kg::save", %property, "property is managed by the store, not updating it");
            modified.remove(&property);
        }
        if modified.is_empty() {
            info!(target: "kg::save", node_type = self.node_type.name, %uuid, "unchanged");
            session.record(self, EntryKind::NoOp, None, Some(space));
            return Ok(());
        }

        info!(
            target: "kg::save",
            node_type = self.node_type.name,
            %uuid,
            properties = ?modified.keys().collect::<Vec<_>>(),
            "updating"
        );
        match session.transport_mut().update_instance(&uuid, &modified) {
            Ok(()) => {
                session.record(self, EntryKind::Update, Some(modified), Some(space));
                self.remote_data = local;
            }
            Err(Error::Authorization(reason)) if options.ignore_auth_errors => {
                error!(target: "kg::save", %uuid, %reason, "update refused");
            }
            Err(failure) => return Err(failure),
        }
        Ok(())
    }

    fn create<T: Transport>(&mut self, session: &mut Session<T>, options: &SaveOptions, space: &str) -> Result<()> {
        let local = self.to_jsonld(false, false);
        let instance_id = self.uuid().map(str::to_string);
        info!(target: "kg::save", node_type = self.node_type.name, space, "creating");
        match session
            .transport_mut()
            .create_new_instance(&local, space, instance_id.as_deref())
        {
            Ok(created) => {
                let id = document_id(&created)
                    .ok_or_else(|| Error::invalid_document("created instance without @id"))?
                    .to_string();
                self.id = Some(id.clone());
                self.space = Some(space.to_string());
                self.raw_remote_data = Some(created.clone());
                self.remote_data = local;
                if let Some(filter) = self.existence_filter(session)? {
                    session
                        .save_cache_mut()
                        .insert(self.node_type, CacheKey::from_filter(&filter), id);
                }
                session.record(self, EntryKind::Create, Some(created), Some(space));
            }
            Err(failure) if options.ignore_auth_errors && failure.is_tolerable() => {
                error!(target: "kg::save", node_type = self.node_type.name, space, %failure, "create refused");
                session.record(self, EntryKind::CreateError, Some(local), Some(space));
            }
            Err(failure) => return Err(failure),
        }
        Ok(())
    }

    /// Delete the object from the store.
    pub fn delete<T: Transport>(&self, session: &mut Session<T>, ignore_not_found: bool) -> Result<()> {
        let id = self
            .id()
            .ok_or_else(|| Error::value("cannot delete an object that has not been saved"))?;
        session.delete_uri(id, ignore_not_found)
    }

    /// Replace proxies by the objects they stand for, down to `depth`
    /// levels of links.
    pub fn resolve_links<T: Transport>(&mut self, session: &mut Session<T>, depth: u8) -> Result<()> {
        if depth == 0 {
            return Ok(());
        }
        let options = FetchOptions::default().with_scope(self.scope.unwrap_or_default());
        let node_type = self.node_type;
        for field in node_type.fields.iter().filter(|field| field.is_link()) {
            let Some(value) = self.values.get_mut(field.name) else {
                continue;
            };
            for item in value.items_mut() {
                let Value::Node(node) = item else {
                    continue;
                };
                if let NodeRef::Unresolved(proxy) = node {
                    let object = proxy.resolve_with(session, &options)?;
                    *node = NodeRef::Resolved(Box::new(object));
                }
                if let NodeRef::Resolved(child) = node {
                    child.resolve_links(session, depth - 1)?;
                }
            }
        }
        Ok(())
    }

    /// Every linked node, and with `follow_links` the nodes those link to,
    /// resolving proxies on the way.
    pub fn all_children<T: Transport>(&mut self, session: &mut Session<T>, follow_links: u8) -> Result<Vec<NodeRef>> {
        if follow_links > 0 {
            self.resolve_links(session, follow_links)?;
        }
        let mut all = Vec::new();
        for child in self.children() {
            all.push(child.clone());
            if follow_links > 0 {
                if let NodeRef::Resolved(object) = child {
                    all.extend(object.children().into_iter().cloned());
                }
            }
        }
        Ok(all)
    }
}

/// Where a child held in memory gets saved: where it already lives, else in
/// the parent's space, else in the requested space. A child found in its
/// type's protected default space is linked without saving; protected
/// spaces are never written to.
fn child_placement<T: Transport>(
    child: &mut KgObject,
    session: &mut Session<T>,
    options: &SaveOptions,
    parent_space: Option<&str>,
) -> Result<Placement> {
    let default_space = child.node_type.default_space;
    let known = child.space().map(str::to_string);
    let target = match known {
        Some(space) => Some(space),
        None if session.config().save.is_protected(default_space)
            && child.exists(session)?
            && child.space() == Some(default_space) =>
        {
            return Ok(Placement::Skip);
        }
        None if options.space.is_none() => parent_space.map(str::to_string),
        None => options.space.clone(),
    };
    let effective = target.as_deref().unwrap_or(default_space);
    if !session.config().save.is_protected(effective) {
        return Ok(Placement::Save(target));
    }
    let effective = effective.to_string();
    if child.exists(session)? && child.space() == Some(effective.as_str()) {
        return Ok(Placement::Skip);
    }
    Err(Error::config(format!(
        "{} must already exist in protected space '{effective}', it cannot be created there",
        child.node_type.name
    )))
}
