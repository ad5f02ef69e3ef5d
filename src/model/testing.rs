//! Node types and helpers shared by unit tests

use crate::config::Config;
use crate::registry::Registry;
use crate::session::Session;
use crate::transport::MemoryTransport;

use super::{ExistenceQuery, FieldDef, NodeType, ScalarType};

const CONTEXT: &[(&str, &str)] = &[
    ("vocab", "https://openminds.ebrains.eu/vocab/"),
    ("schema", "http://schema.org/"),
];

pub(crate) const VOCAB: &str = "https://openminds.ebrains.eu/vocab/";

pub(crate) static PERSON: NodeType = NodeType {
    name: "test.Person",
    type_uri: "https://schema.example/Person",
    default_space: "common",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("given_name", ScalarType::Str, "vocab:givenName").required(),
        FieldDef::scalar("family_name", ScalarType::Str, "vocab:familyName"),
        FieldDef::link("affiliation", &["test.Organization"], "vocab:affiliation"),
    ],
    existence: ExistenceQuery::Fields(&["given_name", "family_name"]),
};

pub(crate) static ORGANIZATION: NodeType = NodeType {
    name: "test.Organization",
    type_uri: "https://schema.example/Organization",
    default_space: "common",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName"),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub(crate) static LICENSE: NodeType = NodeType {
    name: "test.License",
    type_uri: "https://schema.example/License",
    default_space: "controlled",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName"),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub(crate) static DATASET: NodeType = NodeType {
    name: "test.Dataset",
    type_uri: "https://schema.example/Dataset",
    default_space: "dataset",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName"),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
        FieldDef::scalar("keywords", ScalarType::Str, "vocab:keyword").multiple(),
        FieldDef::link("authors", &["test.Person"], "vocab:author").multiple(),
        FieldDef::link(
            "custodians",
            &["test.Person", "test.Organization"],
            "vocab:custodian",
        )
        .multiple(),
        FieldDef::link("license", &["test.License"], "vocab:license"),
        FieldDef::link("versions", &["test.DatasetVersion"], "vocab:hasVersion")
            .multiple()
            .reference(),
        FieldDef::scalar("release_date", ScalarType::Date, "vocab:releaseDate"),
        FieldDef::scalar("homepage", ScalarType::Iri, "vocab:homepage"),
        FieldDef::scalar("storage_size", ScalarType::Int, "vocab:storageSize"),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub(crate) static DATASET_VERSION: NodeType = NodeType {
    name: "test.DatasetVersion",
    type_uri: "https://schema.example/DatasetVersion",
    default_space: "dataset",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName"),
        FieldDef::scalar("version_identifier", ScalarType::Str, "vocab:versionIdentifier")
            .required(),
        FieldDef::distribution("download", "vocab:download"),
        FieldDef::scalar("created", ScalarType::DateTime, "schema:dateCreated"),
        FieldDef::scalar("score", ScalarType::Float, "vocab:score"),
        FieldDef::scalar("public", ScalarType::Bool, "vocab:public"),
    ],
    existence: ExistenceQuery::Fields(&["name", "version_identifier"]),
};

/// Never deduplicated
pub(crate) static NOTE: NodeType = NodeType {
    name: "test.Note",
    type_uri: "https://schema.example/Note",
    default_space: "common",
    context: CONTEXT,
    fields: &[FieldDef::scalar("text", ScalarType::Str, "vocab:text")],
    existence: ExistenceQuery::Disabled,
};

/// Declares no identifying fields at all.
pub(crate) static MEMO: NodeType = NodeType {
    name: "test.Memo",
    type_uri: "https://schema.example/Memo",
    default_space: "common",
    context: CONTEXT,
    fields: &[FieldDef::scalar("text", ScalarType::Str, "vocab:text")],
    existence: ExistenceQuery::Fields(&[]),
};

pub(crate) fn registry() -> Registry {
    let mut registry = Registry::new();
    for node_type in [
        &PERSON,
        &ORGANIZATION,
        &LICENSE,
        &DATASET,
        &DATASET_VERSION,
        &NOTE,
        &MEMO,
    ] {
        if let Err(error) = registry.register(node_type) {
            panic!("test registry: {error}");
        }
    }
    registry
}

pub(crate) fn session() -> Session<MemoryTransport> {
    session_with(MemoryTransport::new(), Config::default())
}

pub(crate) fn session_with(transport: MemoryTransport, config: Config) -> Session<MemoryTransport> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    Session::new(transport, registry(), config)
}
