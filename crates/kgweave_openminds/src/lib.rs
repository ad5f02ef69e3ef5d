//! openMINDS node types for kgweave
//!
//! A representative subset of the openMINDS schemas: the people and
//! organizations behind research products, software and models with their
//! versions, validation tests, files, and the controlled terms they use.

mod computation;
mod controlled_terms;
mod core_types;

use kgweave::{Error, KgObject, NodeType, Registry, Result, Session, Transport};

pub use crate::computation::{ENVIRONMENT, VALIDATION_TEST, VALIDATION_TEST_VERSION};
pub use crate::controlled_terms::GENETIC_STRAIN_TYPE;
pub use crate::core_types::{
    CONTENT_TYPE, FILE, FILE_REPOSITORY, LICENSE, MODEL, MODEL_VERSION, ORGANIZATION, PERSON,
    SOFTWARE, SOFTWARE_VERSION,
};

pub(crate) const CONTEXT: &[(&str, &str)] = &[("vocab", "https://openminds.ebrains.eu/vocab/")];

pub static NODE_TYPES: &[&NodeType] = &[
    &PERSON,
    &ORGANIZATION,
    &LICENSE,
    &CONTENT_TYPE,
    &FILE_REPOSITORY,
    &FILE,
    &SOFTWARE,
    &SOFTWARE_VERSION,
    &MODEL,
    &MODEL_VERSION,
    &ENVIRONMENT,
    &VALIDATION_TEST,
    &VALIDATION_TEST_VERSION,
    &GENETIC_STRAIN_TYPE,
];

/// Version types and the product type that lists them under `versions`.
static VERSION_PARENTS: &[(&str, &NodeType)] = &[
    ("openminds.core.SoftwareVersion", &SOFTWARE),
    ("openminds.core.ModelVersion", &MODEL),
    ("openminds.computation.ValidationTestVersion", &VALIDATION_TEST),
];

pub fn register_all(registry: &mut Registry) -> Result<()> {
    registry.register_all(NODE_TYPES)
}

pub fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    register_all(&mut registry)?;
    Ok(registry)
}

/// The product a version belongs to, e.g. the `Software` of a
/// `SoftwareVersion`.
pub fn version_of<T: Transport>(session: &mut Session<T>, version: &KgObject) -> Result<KgObject> {
    let name = version.node_type().name;
    let parent = VERSION_PARENTS
        .iter()
        .find(|(version_type, _)| *version_type == name)
        .map(|(_, parent)| *parent)
        .ok_or_else(|| Error::Configuration(format!("{name} is not a version type")))?;
    session.find_parent(parent, "versions", version)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use kgweave::{
        Config, Error, ExistenceQuery, FetchOptions, KgObject, MemoryTransport, SaveOptions,
        Scope, Session, Value,
    };

    use super::{
        LICENSE, NODE_TYPES, PERSON, SOFTWARE, SOFTWARE_VERSION, registry, version_of,
    };

    fn vocab(term: &str) -> String {
        format!("https://openminds.ebrains.eu/vocab/{term}")
    }

    fn session() -> Result<Session<MemoryTransport>> {
        Ok(Session::new(MemoryTransport::new(), registry()?, Config::default()))
    }

    #[test]
    fn every_link_target_is_registered() -> Result<()> {
        let registry = registry()?;
        assert_eq!(registry.len(), NODE_TYPES.len());
        for node_type in NODE_TYPES {
            for field in node_type.fields.iter().filter(|field| field.is_link()) {
                assert!(
                    !registry.targets(field)?.is_empty(),
                    "{}.{}",
                    node_type.name,
                    field.name
                );
            }
            if let ExistenceQuery::Fields(names) = node_type.existence {
                for name in names {
                    node_type.require_field(name)?;
                }
            }
        }
        Ok(())
    }

    #[test]
    fn versions_find_their_product() -> Result<()> {
        let mut session = session()?;
        let version_uri = session.transport_mut().seed(
            &SOFTWARE_VERSION,
            "software",
            json!({ vocab("shortName"): "NEST v3.6", vocab("versionIdentifier"): "3.6" }),
        );
        session.transport_mut().seed(
            &SOFTWARE,
            "software",
            json!({
                vocab("fullName"): "NEST simulator",
                vocab("shortName"): "NEST",
                vocab("hasVersion"): [{ "@id": version_uri }]
            }),
        );
        let options = FetchOptions::default().with_scope(Scope::Any);
        let version = session
            .from_uri(&SOFTWARE_VERSION, &version_uri, &options)?
            .ok_or_else(|| anyhow::anyhow!("version not found"))?;
        let software = version_of(&mut session, &version)?;
        assert_eq!(software.get("alias"), Some(&Value::from("NEST")));

        let person = KgObject::new(&PERSON).with("given_name", "Ada")?;
        assert!(matches!(
            version_of(&mut session, &person),
            Err(Error::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn licenses_are_linked_not_created() -> Result<()> {
        let mut session = session()?;
        let license_uri = session.transport_mut().seed(
            &LICENSE,
            "controlled",
            json!({ vocab("fullName"): "Creative Commons Attribution 4.0", vocab("shortName"): "CC-BY-4.0" }),
        );
        let license = KgObject::new(&LICENSE)
            .with("name", "Creative Commons Attribution 4.0")?
            .with("alias", "CC-BY-4.0")?;
        let mut version = KgObject::new(&SOFTWARE_VERSION)
            .with("alias", "NEST v3.7")?
            .with("version_identifier", "3.7")?
            .with("licenses", vec![license])?;
        version.save(&mut session, &SaveOptions::default())?;

        assert_eq!(session.transport().calls().creates, 1);
        let stored = version
            .id()
            .and_then(|id| session.transport().document(id))
            .cloned()
            .unwrap_or_default();
        assert_eq!(stored[&vocab("license")], json!([{ "@id": license_uri }]));
        assert_eq!(session.transport().space_of(version.id().unwrap_or_default()), Some("software"));
        Ok(())
    }
}
