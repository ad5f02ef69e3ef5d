use kgweave::{ExistenceQuery, FieldDef, NodeType, ScalarType};

use crate::CONTEXT;

/// Terms are curated centrally and live in the protected `controlled` space.
pub static GENETIC_STRAIN_TYPE: NodeType = NodeType {
    name: "openminds.controlledterms.GeneticStrainType",
    type_uri: "https://openminds.ebrains.eu/controlledTerms/GeneticStrainType",
    default_space: "controlled",
    context: CONTEXT,
    fields: &[
        FieldDef::scalar("name", ScalarType::Str, "vocab:name").required(),
        FieldDef::scalar("definition", ScalarType::Str, "vocab:definition"),
        FieldDef::scalar("description", ScalarType::Str, "vocab:description"),
        FieldDef::scalar("interlex_identifier", ScalarType::Iri, "vocab:interlexIdentifier"),
        FieldDef::scalar("knowledge_space_link", ScalarType::Iri, "vocab:knowledgeSpaceLink"),
        FieldDef::scalar(
            "preferred_ontology_identifier",
            ScalarType::Iri,
            "vocab:preferredOntologyIdentifier",
        ),
        FieldDef::scalar("synonyms", ScalarType::Str, "vocab:synonym").multiple(),
    ],
    existence: ExistenceQuery::DEFAULT,
};
