use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::session::{FetchOptions, Session};
use crate::transport::Transport;

use super::{KgObject, NodeRef, NodeType};

/// Placeholder for a linked node known only by its URI.
///
/// A proxy produced from a polymorphic link whose wire item did not state a
/// type carries every candidate type; resolution then picks the type the
/// fetched document declares.
#[derive(Clone, PartialEq, Eq)]
pub struct KgProxy {
    types: Vec<&'static NodeType>,
    id: String,
}

impl KgProxy {
    pub fn new(node_type: &'static NodeType, id: impl Into<String>) -> KgProxy {
        KgProxy {
            types: vec![node_type],
            id: id.into(),
        }
    }

    pub fn polymorphic(types: Vec<&'static NodeType>, id: impl Into<String>) -> KgProxy {
        KgProxy {
            types,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn types(&self) -> &[&'static NodeType] {
        &self.types
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.types.iter().map(|ty| ty.name).collect()
    }

    /// Fetch the full node at the released scope.
    pub fn resolve<T: Transport>(&self, session: &mut Session<T>) -> Result<KgObject> {
        self.resolve_with(session, &FetchOptions::default())
    }

    /// Fetch the full node, from the session's object cache when possible.
    /// The fetched object is cached.
    pub fn resolve_with<T: Transport>(
        &self,
        session: &mut Session<T>,
        options: &FetchOptions,
    ) -> Result<KgObject> {
        if options.use_cache {
            if let Some(object) = session.cache().get(&self.id) {
                debug!(target: "kg", id = %self.id, "proxy resolved from object cache");
                return Ok(object.clone());
            }
        }
        let node_type = match self.types.as_slice() {
            [only] => *only,
            candidates => session.identify(&self.id, candidates, options)?,
        };
        let object = session
            .from_uri(node_type, &self.id, options)?
            .ok_or_else(|| {
                Error::ResolutionFailure(format!(
                    "{} ({})",
                    self.id,
                    self.type_names().join(" | ")
                ))
            })?;
        session.objects_mut().insert(object.clone());
        Ok(object)
    }

    pub fn delete<T: Transport>(
        &self,
        session: &mut Session<T>,
        ignore_not_found: bool,
    ) -> Result<()> {
        session.delete_uri(&self.id, ignore_not_found)
    }
}

impl fmt::Debug for KgProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KgProxy({}, {:?})", self.type_names().join(" | "), self.id)
    }
}

impl NodeRef {
    /// The linked object, fetched if it is not held in memory.
    pub fn resolve<T: Transport>(&self, session: &mut Session<T>) -> Result<KgObject> {
        match self {
            NodeRef::Resolved(object) => Ok(object.as_ref().clone()),
            NodeRef::Unresolved(proxy) => proxy.resolve(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use crate::error::Error;
    use crate::model::testing::{ORGANIZATION, PERSON, session};
    use crate::model::{KgObject, KgProxy, NodeRef, Value};
    use crate::transport::Scope;

    #[test]
    fn resolve_fetches_and_caches() -> Result<()> {
        let mut session = session();
        let uri = session.transport_mut().seed(
            &PERSON,
            "common",
            json!({ "https://openminds.ebrains.eu/vocab/givenName": "Ada" }),
        );
        session.transport_mut().release(&uri);

        let proxy = KgProxy::new(&PERSON, uri.clone());
        let person = proxy.resolve(&mut session)?;
        assert_eq!(person.get("given_name"), Some(&Value::from("Ada")));
        assert_eq!(person.scope(), Some(Scope::Released));
        assert!(session.cache().get(&uri).is_some());

        let fetches = session.transport().calls().fetches;
        proxy.resolve(&mut session)?;
        assert_eq!(session.transport().calls().fetches, fetches);
        Ok(())
    }

    #[test]
    fn polymorphic_proxy_uses_document_type() -> Result<()> {
        let mut session = session();
        let uri = session.transport_mut().seed(
            &ORGANIZATION,
            "common",
            json!({ "https://openminds.ebrains.eu/vocab/fullName": "EBRAINS" }),
        );
        session.transport_mut().release(&uri);

        let proxy = KgProxy::polymorphic(vec![&PERSON, &ORGANIZATION], uri);
        let object = proxy.resolve(&mut session)?;
        assert_eq!(object.node_type(), &ORGANIZATION);
        Ok(())
    }

    #[test]
    fn missing_target_is_a_resolution_failure() {
        let mut session = session();
        let proxy = KgProxy::new(&PERSON, "https://kg.ebrains.eu/api/instances/missing");
        assert!(matches!(
            proxy.resolve(&mut session),
            Err(Error::ResolutionFailure(_))
        ));
    }

    #[test]
    fn resolved_refs_resolve_to_themselves() -> Result<()> {
        let mut session = session();
        let person = KgObject::new(&PERSON).with("given_name", "Ada")?;
        let node = NodeRef::Resolved(Box::new(person.clone()));
        assert_eq!(node.resolve(&mut session)?, person);
        Ok(())
    }
}
