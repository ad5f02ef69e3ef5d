//! The remote store as seen by the object layer

mod http;
mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::filter::NormalizedFilter;
use crate::json_ld::Document;

pub use self::http::HttpTransport;
pub use self::memory::{CallCounts, MemoryTransport};

/// Which revisions of instances a read sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scope {
    /// Published revisions only
    #[default]
    #[serde(rename = "released")]
    Released,
    /// Latest revisions, released or not
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "any")]
    Any,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Released => "released",
            Scope::InProgress => "in progress",
            Scope::Any => "any",
        }
    }

    /// Whether an instance with the given release state is visible.
    pub fn sees(&self, released: bool) -> bool {
        released || !matches!(self, Scope::Released)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Scope> {
        match s {
            "released" => Ok(Scope::Released),
            "in progress" | "in_progress" => Ok(Scope::InProgress),
            "any" => Ok(Scope::Any),
            other => Err(Error::value(format!(
                "scope must be 'released', 'in progress' or 'any', not '{other}'"
            ))),
        }
    }
}

/// A filtered query against the store.
#[derive(Debug, Clone)]
pub struct QueryRequest<'a> {
    pub filters: Option<&'a NormalizedFilter>,
    pub definition: &'a JsonValue,
    pub space: Option<&'a str>,
    /// Restrict results to one instance, by UUID
    pub instance_id: Option<&'a str>,
    pub from_index: usize,
    pub size: usize,
    pub scope: Scope,
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub data: Vec<Document>,
    pub total: usize,
}

/// Instance CRUD, filtered queries and stored-query management.
///
/// Implementations map the store's refusals onto [`Error::Authorization`]
/// and [`Error::ResourceExists`]; a missing instance is `Ok(None)` where the
/// signature allows it.
pub trait Transport {
    /// URIs of instances are this prefix followed by the instance UUID.
    fn instance_prefix(&self) -> &str;

    fn uri_from_uuid(&self, uuid: &str) -> String {
        format!("{}{uuid}", self.instance_prefix())
    }

    fn uuid_from_uri(&self, uri: &str) -> Result<String> {
        uri.strip_prefix(self.instance_prefix())
            .filter(|uuid| !uuid.is_empty() && !uuid.contains('/'))
            .map(str::to_string)
            .ok_or_else(|| Error::value(format!("'{uri}' is not an instance URI")))
    }

    fn instance_from_full_uri(
        &mut self,
        uri: &str,
        use_cache: bool,
        scope: Scope,
        require_full_data: bool,
    ) -> Result<Option<Document>>;

    fn query(&mut self, request: &QueryRequest<'_>) -> Result<ResultPage>;

    fn list(
        &mut self,
        type_uri: &str,
        space: Option<&str>,
        from_index: usize,
        size: usize,
        scope: Scope,
    ) -> Result<ResultPage>;

    /// Create an instance; the returned document carries the new `@id`.
    fn create_new_instance(
        &mut self,
        document: &Document,
        space: &str,
        instance_id: Option<&str>,
    ) -> Result<Document>;

    /// Apply a partial document. `null` values remove properties.
    fn update_instance(&mut self, uuid: &str, partial: &Document) -> Result<()>;

    fn replace_instance(&mut self, uuid: &str, document: &Document) -> Result<()>;

    fn delete_instance(&mut self, uuid: &str, ignore_not_found: bool) -> Result<()>;

    fn store_query(&mut self, label: &str, definition: &JsonValue, space: &str) -> Result<()>;

    fn retrieve_query(&mut self, label: &str) -> Result<Option<JsonValue>>;

    /// The caller's personal space, if the store has one for them.
    fn private_space(&mut self) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{MemoryTransport, Scope, Transport};

    #[test]
    fn scope_names() -> Result<()> {
        assert_eq!("in progress".parse::<Scope>()?, Scope::InProgress);
        assert_eq!(Scope::Any.to_string(), "any");
        assert!("draft".parse::<Scope>().is_err());
        assert!(Scope::Any.sees(false));
        assert!(!Scope::Released.sees(false));
        Ok(())
    }

    #[test]
    fn uuid_uri_conversion() -> Result<()> {
        let transport = MemoryTransport::new();
        let uri = transport.uri_from_uuid("abc");
        assert_eq!(uri, "https://kg.ebrains.eu/api/instances/abc");
        assert_eq!(transport.uuid_from_uri(&uri)?, "abc");
        assert!(transport.uuid_from_uri("https://elsewhere.example/abc").is_err());
        Ok(())
    }
}
