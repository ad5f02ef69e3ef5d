//! openMINDS core: actors, products and data

use kgweave::{ExistenceQuery, FieldDef, NodeType, ScalarType};

use crate::CONTEXT;

const AGENTS: &[&str] = &["openminds.core.Organization", "openminds.core.Person"];

pub static PERSON: NodeType = NodeType {
    name: "openminds.core.Person",
    type_uri: "https://openminds.ebrains.eu/core/Person",
    default_space: "common",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("given_name", ScalarType::Str, "vocab:givenName")
            .required()
            .doc("Name given to a person, including all potential middle names, but excluding the family name."),
        FieldDef::scalar("family_name", ScalarType::Str, "vocab:familyName")
            .doc("Name of the family a person belongs to."),
        FieldDef::link("affiliations", &["openminds.core.Organization"], "vocab:affiliation").multiple(),
    ],
    // namesakes are common; people are never matched by name
    existence: ExistenceQuery::Disabled,
};

pub static ORGANIZATION: NodeType = NodeType {
    name: "openminds.core.Organization",
    type_uri: "https://openminds.ebrains.eu/core/Organization",
    default_space: "common",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName"),
        FieldDef::scalar("homepage", ScalarType::Iri, "vocab:homepage"),
        FieldDef::link("has_parents", &["openminds.core.Organization"], "vocab:hasParent").multiple(),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub static LICENSE: NodeType = NodeType {
    name: "openminds.core.License",
    type_uri: "https://openminds.ebrains.eu/core/License",
    default_space: "controlled",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName").required(),
        FieldDef::scalar("legal_code", ScalarType::Iri, "vocab:legalCode"),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub static CONTENT_TYPE: NodeType = NodeType {
    name: "openminds.core.ContentType",
    type_uri: "https://openminds.ebrains.eu/core/ContentType",
    default_space: "controlled",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:name")
            .required()
            .doc("Media type, e.g. application/json"),
        FieldDef::scalar("file_extensions", ScalarType::Str, "vocab:fileExtension").multiple(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub static FILE_REPOSITORY: NodeType = NodeType {
    name: "openminds.core.FileRepository",
    type_uri: "https://openminds.ebrains.eu/core/FileRepository",
    default_space: "dataset",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:name").required(),
        FieldDef::scalar("iri", ScalarType::Iri, "vocab:IRI").required(),
        FieldDef::link("format", &["openminds.core.ContentType"], "vocab:format"),
        FieldDef::link("hosted_by", &["openminds.core.Organization"], "vocab:hostedBy"),
        FieldDef::scalar("storage_size", ScalarType::Int, "vocab:storageSize")
            .doc("Total size in bytes, computed by the store"),
    ],
    existence: ExistenceQuery::Fields(&["iri"]),
};

pub static FILE: NodeType = NodeType {
    name: "openminds.core.File",
    type_uri: "https://openminds.ebrains.eu/core/File",
    default_space: "dataset",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:name").required(),
        FieldDef::scalar("iri", ScalarType::Iri, "vocab:IRI").required(),
        FieldDef::link("is_part_of", &["openminds.core.FileRepository"], "vocab:isPartOf"),
        FieldDef::link("format", &["openminds.core.ContentType"], "vocab:format"),
        FieldDef::scalar("storage_size", ScalarType::Int, "vocab:storageSize"),
    ],
    existence: ExistenceQuery::Fields(&["iri"]),
};

pub static SOFTWARE: NodeType = NodeType {
    name: "openminds.core.Software",
    type_uri: "https://openminds.ebrains.eu/core/Software",
    default_space: "software",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName")
            .required()
            .doc("Whole, non-abbreviated name of the software."),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName")
            .required()
            .doc("Shortened or fully abbreviated name of the software."),
        FieldDef::link("custodians", AGENTS, "vocab:custodian").multiple(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description").required(),
        FieldDef::link("developers", AGENTS, "vocab:developer").multiple().required(),
        FieldDef::link("versions", &["openminds.core.SoftwareVersion"], "vocab:hasVersion")
            .multiple()
            .required(),
        FieldDef::scalar("homepage", ScalarType::Iri, "vocab:homepage"),
        FieldDef::scalar("how_to_cite", ScalarType::Str, "vocab:howToCite"),
    ],
    existence: ExistenceQuery::Fields(&["alias"]),
};

pub static SOFTWARE_VERSION: NodeType = NodeType {
    name: "openminds.core.SoftwareVersion",
    type_uri: "https://openminds.ebrains.eu/core/SoftwareVersion",
    default_space: "software",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName"),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName").required(),
        FieldDef::scalar("version_identifier", ScalarType::Str, "vocab:versionIdentifier").required(),
        FieldDef::scalar("version_innovation", ScalarType::Str, "vocab:versionInnovation").required(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
        FieldDef::scalar("release_date", ScalarType::Date, "vocab:releaseDate").required(),
        FieldDef::link("developers", AGENTS, "vocab:developer").multiple(),
        FieldDef::link("licenses", &["openminds.core.License"], "vocab:license")
            .multiple()
            .required(),
        FieldDef::link("input_formats", &["openminds.core.ContentType"], "vocab:inputFormat").multiple(),
        FieldDef::link("output_formats", &["openminds.core.ContentType"], "vocab:outputFormat").multiple(),
        FieldDef::link("is_new_version_of", &["openminds.core.SoftwareVersion"], "vocab:isNewVersionOf"),
        FieldDef::link("repository", &["openminds.core.FileRepository"], "vocab:repository"),
        FieldDef::scalar("requirements", ScalarType::Str, "vocab:requirement").multiple(),
        FieldDef::scalar("homepage", ScalarType::Iri, "vocab:homepage"),
    ],
    existence: ExistenceQuery::Fields(&["alias", "version_identifier"]),
};

pub static MODEL: NodeType = NodeType {
    name: "openminds.core.Model",
    type_uri: "https://openminds.ebrains.eu/core/Model",
    default_space: "model",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName").required(),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName").required(),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description").required(),
        FieldDef::link("developers", AGENTS, "vocab:developer").multiple().required(),
        FieldDef::link("custodians", AGENTS, "vocab:custodian").multiple(),
        FieldDef::link("versions", &["openminds.core.ModelVersion"], "vocab:hasVersion")
            .multiple()
            .required(),
        FieldDef::scalar("homepage", ScalarType::Iri, "vocab:homepage"),
        FieldDef::scalar("how_to_cite", ScalarType::Str, "vocab:howToCite"),
    ],
    existence: ExistenceQuery::DEFAULT,
};

pub static MODEL_VERSION: NodeType = NodeType {
    name: "openminds.core.ModelVersion",
    type_uri: "https://openminds.ebrains.eu/core/ModelVersion",
    default_space: "model",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:fullName"),
        FieldDef::scalar("alias", ScalarType::Str, "vocab:shortName").required(),
        FieldDef::scalar("version_identifier", ScalarType::Str, "vocab:versionIdentifier").required(),
        FieldDef::scalar("version_innovation", ScalarType::Str, "vocab:versionInnovation"),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
        FieldDef::scalar("release_date", ScalarType::Date, "vocab:releaseDate"),
        FieldDef::link("developers", AGENTS, "vocab:developer").multiple(),
        FieldDef::link("licenses", &["openminds.core.License"], "vocab:license").multiple(),
        FieldDef::link("formats", &["openminds.core.ContentType"], "vocab:format").multiple(),
        FieldDef::link("repository", &["openminds.core.FileRepository"], "vocab:repository"),
        FieldDef::link("is_new_version_of", &["openminds.core.ModelVersion"], "vocab:isNewVersionOf"),
    ],
    existence: ExistenceQuery::Fields(&["alias", "version_identifier"]),
};
