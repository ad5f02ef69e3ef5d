use kgweave::{ExistenceQuery, FieldDef, NodeType, ScalarType};

use crate::CONTEXT;

const AGENTS: &[&str] = &["openminds.core.Organization", "openminds.core.Person"];

pub static ENVIRONMENT: NodeType = NodeType {
    name: "openminds.computation.Environment",
    type_uri: "https://openminds.ebrains.eu/computation/Environment",
    default_space: "computation",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:name").required(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
        FieldDef::link("softwares", &["openminds.core.SoftwareVersion"], "vocab:software").multiple(),
    ],
    existence: ExistenceQuery::Disabled,
};

pub static VALIDATION_TEST: NodeType = NodeType {
    name: "openminds.computation.ValidationTest",
    type_uri: "https://openminds.ebrains.eu/computation/ValidationTest",
    default_space: "computation",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName").required(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description").required(),
        FieldDef::link("developers", AGENTS, "vocab:developer").multiple().required(),
        FieldDef::link("custodians", AGENTS, "vocab:custodian").multiple(),
        FieldDef::link(
            "versions",
            &["openminds.computation.ValidationTestVersion"],
            "vocab:hasVersion",
        )
        .multiple()
        .required(),
        FieldDef::scalar("homepage", ScalarType::Iri, "vocab:homepage"),
    ],
    existence: ExistenceQuery::Fields(&["alias"]),
};

pub static VALIDATION_TEST_VERSION: NodeType = NodeType {
    name: "openminds.computation.ValidationTestVersion",
    type_uri: "https://openminds.ebrains.eu/computation/ValidationTestVersion",
    default_space: "computation",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName"),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName").required(),
        FieldDef::scalar("version_identifier", ScalarType::Str, "vocab:versionIdentifier").required(),
        FieldDef::scalar("version_innovation", ScalarType::Str, "vocab:versionInnovation").required(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
        FieldDef::scalar("entry_point", ScalarType::Str, "vocab:entryPoint"),
        FieldDef::scalar("release_date", ScalarType::Date, "vocab:releaseDate").required(),
        FieldDef::link("developers", AGENTS, "vocab:developer").multiple(),
        FieldDef::link("licenses", &["openminds.core.License"], "vocab:license").multiple(),
        FieldDef::link("format", &["openminds.core.ContentType"], "vocab:format").required(),
        FieldDef::link(
            "reference_data",
            &["openminds.core.File", "openminds.core.FileRepository"],
            "vocab:referenceData",
        )
        .multiple(),
        FieldDef::link("repository", &["openminds.core.FileRepository"], "vocab:repository"),
        FieldDef::link(
            "is_new_version_of",
            &["openminds.computation.ValidationTestVersion"],
            "vocab:isNewVersionOf",
        ),
    ],
    existence: ExistenceQuery::Fields(&["alias", "version_identifier"]),
};
