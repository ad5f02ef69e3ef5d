use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    Iri(Cow<'static, str>),
    Keyword(Cow<'static, str>),
}

impl Term {
    pub fn new_keyword(keyword: &str) -> Term {
        Term::Keyword(Cow::Owned(keyword.to_owned()))
    }

    pub const fn const_keyword(keyword: &'static str) -> Term {
        Term::Keyword(Cow::Borrowed(keyword))
    }

    pub fn new_iri(iri: &str) -> Term {
        Term::Iri(Cow::Owned(iri.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Keyword(keyword) => keyword,
        }
    }

    /// Append a suffix to an IRI term. Keywords cannot be used as prefixes, so
    /// joining onto one yields `None`.
    pub fn join(&self, term: &str) -> Option<Term> {
        match self {
            Term::Iri(iri) => Some(Term::Iri(Cow::Owned(format!("{}{}", iri, term)))),
            Term::Keyword(_) => None,
        }
    }
}

pub const CONTEXT: Term = Term::const_keyword("@context");
pub const ID: Term = Term::const_keyword("@id");
pub const TYPE: Term = Term::const_keyword("@type");
pub const LIST: Term = Term::const_keyword("@list");

/// Space annotation written by the KG core API on instance documents.
pub const META_SPACE: &str = "https://core.kg.ebrains.eu/vocab/meta/space";
/// Space annotation as it comes back from generated queries.
pub const QUERY_SPACE: &str = "https://schema.hbp.eu/myQuery/space";
/// Vocabulary of query definition documents.
pub const QUERY_VOCAB: &str = "https://core.kg.ebrains.eu/vocab/query/";
/// Namespace for query result property names.
pub const QUERY_NS: &str = "https://schema.hbp.eu/myQuery/";
/// Managed by the store itself; clients may not write it.
pub const STORAGE_SIZE: &str = "https://openminds.ebrains.eu/vocab/storageSize";

/// Both keys under which a document may report its space.
pub const SPACE_KEYS: [&str; 2] = [QUERY_SPACE, META_SPACE];
