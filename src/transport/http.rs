use std::collections::HashMap;
use std::env;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::config::KgConfig;
use crate::error::{Error, Result};
use crate::filter::NormalizedFilter;
use crate::json_ld::Document;

use super::{QueryRequest, ResultPage, Scope, Transport};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetched documents kept before the cache starts over.
const MAX_CACHED_INSTANCES: usize = 1024;

/// Responses of the store wrap their payload in `data`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    total: Option<usize>,
}

/// Transport over the store's HTTP API, authenticated with a bearer token.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    instance_prefix: String,
    token: SecretString,
    instances: HashMap<(String, Scope), Document>,
}

impl HttpTransport {
    /// Build a transport reading the token from the environment variable
    /// named in the configuration.
    pub fn new(config: &KgConfig) -> Result<HttpTransport> {
        let token = env::var(&config.token_env).map_err(|_| {
            Error::config(format!(
                "no access token, set the {} environment variable",
                config.token_env
            ))
        })?;
        HttpTransport::with_token(config, SecretString::from(token))
    }

    pub fn with_token(config: &KgConfig, token: SecretString) -> Result<HttpTransport> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .gzip(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(HttpTransport {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            instance_prefix: config.instance_prefix.clone(),
            token,
            instances: HashMap::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .header(header::ACCEPT, "application/json")
            .send()?;
        check_status(response)
    }

    fn remember(&mut self, key: (String, Scope), document: Document) {
        if self.instances.len() >= MAX_CACHED_INSTANCES && !self.instances.contains_key(&key) {
            debug!(target: "kg::http", size = self.instances.len(), "instance cache full, clearing");
            self.instances.clear();
        }
        self.instances.insert(key, document);
    }

    /// `Ok(None)` on 404.
    fn send_optional(&self, request: RequestBuilder) -> Result<Option<Response>> {
        match self.send(request) {
            Ok(response) => Ok(Some(response)),
            Err(Error::Remote { status: 404, .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authorization(body),
        StatusCode::CONFLICT => Error::ResourceExists(body),
        _ => Error::Remote {
            status: status.as_u16(),
            body,
        },
    })
}

fn stage(scope: Scope) -> &'static str {
    match scope {
        Scope::Released => "RELEASED",
        Scope::InProgress | Scope::Any => "IN_PROGRESS",
    }
}

/// Stored queries are addressed by a UUID derived from their label.
fn query_id(label: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, label.as_bytes())
}

/// Filter values as request parameters; lists repeat the parameter.
fn filter_params(filters: &NormalizedFilter) -> Vec<(String, String)> {
    let text = |value: &JsonValue| match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };
    filters
        .iter()
        .flat_map(|(name, value)| match value {
            JsonValue::Array(items) => items.iter().map(|item| (name.clone(), text(item))).collect(),
            other => vec![(name.clone(), text(other))],
        })
        .collect()
}

fn page(response: Response) -> Result<ResultPage> {
    let envelope: Envelope<Vec<Document>> = response.json()?;
    Ok(ResultPage {
        total: envelope.total.unwrap_or(envelope.data.len()),
        data: envelope.data,
    })
}

impl Transport for HttpTransport {
    fn instance_prefix(&self) -> &str {
        &self.instance_prefix
    }

    fn instance_from_full_uri(
        &mut self,
        uri: &str,
        use_cache: bool,
        scope: Scope,
        _require_full_data: bool,
    ) -> Result<Option<Document>> {
        let cache_key = (uri.to_string(), scope);
        if use_cache {
            if let Some(document) = self.instances.get(&cache_key) {
                return Ok(Some(document.clone()));
            }
        }
        let uuid = self.uuid_from_uri(uri)?;
        debug!(target: "kg::http", %uuid, stage = stage(scope), "fetching instance");
        let request = self
            .client
            .get(self.url(&format!("instances/{uuid}")))
            .query(&[("stage", stage(scope)), ("returnPayload", "true")]);
        let Some(response) = self.send_optional(request)? else {
            return Ok(None);
        };
        let envelope: Envelope<Document> = response.json()?;
        self.remember(cache_key, envelope.data.clone());
        Ok(Some(envelope.data))
    }

    fn query(&mut self, request: &QueryRequest<'_>) -> Result<ResultPage> {
        let mut params: Vec<(String, String)> = vec![
            ("stage".to_string(), stage(request.scope).to_string()),
            ("from".to_string(), request.from_index.to_string()),
            ("size".to_string(), request.size.to_string()),
        ];
        if let Some(uuid) = request.instance_id {
            params.push(("instanceId".to_string(), uuid.to_string()));
        }
        if let Some(space) = request.space {
            params.push(("restrictToSpaces".to_string(), space.to_string()));
        }
        if let Some(filters) = request.filters {
            params.extend(filter_params(filters));
        }
        debug!(target: "kg::http", label = ?request.definition["meta"]["name"], "running query");
        let builder = self
            .client
            .post(self.url("queries"))
            .query(&params)
            .json(request.definition);
        page(self.send(builder)?)
    }

    fn list(
        &mut self,
        type_uri: &str,
        space: Option<&str>,
        from_index: usize,
        size: usize,
        scope: Scope,
    ) -> Result<ResultPage> {
        let mut params: Vec<(&str, String)> = vec![
            ("type", type_uri.to_string()),
            ("stage", stage(scope).to_string()),
            ("from", from_index.to_string()),
            ("size", size.to_string()),
            ("returnPayload", "true".to_string()),
        ];
        if let Some(space) = space {
            params.push(("space", space.to_string()));
        }
        let builder = self.client.get(self.url("instances")).query(&params);
        page(self.send(builder)?)
    }

    fn create_new_instance(
        &mut self,
        document: &Document,
        space: &str,
        instance_id: Option<&str>,
    ) -> Result<Document> {
        let path = match instance_id {
            Some(uuid) => format!("instances/{uuid}"),
            None => "instances".to_string(),
        };
        debug!(target: "kg::http", space, ?instance_id, "creating instance");
        let builder = self
            .client
            .post(self.url(&path))
            .query(&[("space", space), ("returnPayload", "true")])
            .json(document);
        let envelope: Envelope<Document> = self.send(builder)?.json()?;
        Ok(envelope.data)
    }

    fn update_instance(&mut self, uuid: &str, partial: &Document) -> Result<()> {
        debug!(target: "kg::http", %uuid, "updating instance");
        let builder = self
            .client
            .patch(self.url(&format!("instances/{uuid}")))
            .json(partial);
        self.send(builder)?;
        self.instances.retain(|(uri, _), _| !uri.ends_with(uuid));
        Ok(())
    }

    fn replace_instance(&mut self, uuid: &str, document: &Document) -> Result<()> {
        debug!(target: "kg::http", %uuid, "replacing instance");
        let builder = self
            .client
            .put(self.url(&format!("instances/{uuid}")))
            .json(document);
        self.send(builder)?;
        self.instances.retain(|(uri, _), _| !uri.ends_with(uuid));
        Ok(())
    }

    fn delete_instance(&mut self, uuid: &str, ignore_not_found: bool) -> Result<()> {
        let builder = self.client.delete(self.url(&format!("instances/{uuid}")));
        match self.send(builder) {
            Ok(_) => {}
            Err(Error::Remote { status: 404, .. }) if ignore_not_found => {
                debug!(target: "kg::http", %uuid, "already deleted");
            }
            Err(error) => return Err(error),
        }
        self.instances.retain(|(uri, _), _| !uri.ends_with(uuid));
        Ok(())
    }

    fn store_query(&mut self, label: &str, definition: &JsonValue, space: &str) -> Result<()> {
        let id = query_id(label);
        debug!(target: "kg::http", label, %id, space, "storing query");
        let builder = self
            .client
            .put(self.url(&format!("queries/{id}")))
            .query(&[("space", space)])
            .json(definition);
        self.send(builder)?;
        Ok(())
    }

    fn retrieve_query(&mut self, label: &str) -> Result<Option<JsonValue>> {
        let builder = self.client.get(self.url(&format!("queries/{}", query_id(label))));
        match self.send_optional(builder)? {
            Some(response) => {
                let envelope: Envelope<JsonValue> = response.json()?;
                Ok(Some(envelope.data))
            }
            None => Ok(None),
        }
    }

    fn private_space(&mut self) -> Result<Option<String>> {
        let builder = self.client.get(self.url("spaces/myspace"));
        let Some(response) = self.send_optional(builder)? else {
            return Ok(None);
        };
        let envelope: Envelope<Document> = response.json()?;
        Ok(["http://schema.org/identifier", "http://schema.org/name", "name"]
            .iter()
            .find_map(|key| envelope.data.get(*key).and_then(JsonValue::as_str))
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use secrecy::SecretString;
    use serde_json::json;

    use crate::config::KgConfig;
    use crate::filter::NormalizedFilter;
    use crate::json_ld::Document;
    use crate::transport::{Scope, Transport};

    use super::{HttpTransport, MAX_CACHED_INSTANCES, filter_params, query_id, stage};

    #[test]
    fn scopes_map_to_stages() {
        assert_eq!(stage(Scope::Released), "RELEASED");
        assert_eq!(stage(Scope::InProgress), "IN_PROGRESS");
        assert_eq!(stage(Scope::Any), "IN_PROGRESS");
    }

    #[test]
    fn query_ids_are_stable() {
        assert_eq!(query_id("kgn-Person-simple-all"), query_id("kgn-Person-simple-all"));
        assert_ne!(query_id("kgn-Person-simple-all"), query_id("kgn-Person-simple-common"));
    }

    #[test]
    fn list_filters_repeat_the_parameter() {
        let mut filters = NormalizedFilter::new();
        filters.insert("name".to_string(), json!("EBRAINS"));
        filters.insert("authors".to_string(), json!(["https://kg.example/a", "https://kg.example/b"]));
        filters.insert("storage_size".to_string(), json!(10));
        let params = filter_params(&filters);
        assert_eq!(
            params,
            vec![
                ("authors".to_string(), "https://kg.example/a".to_string()),
                ("authors".to_string(), "https://kg.example/b".to_string()),
                ("name".to_string(), "EBRAINS".to_string()),
                ("storage_size".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn instance_cache_is_bounded() -> Result<()> {
        let mut transport = HttpTransport::with_token(&KgConfig::default(), SecretString::from("secret"))?;
        for n in 0..MAX_CACHED_INSTANCES {
            transport.remember((transport.uri_from_uuid(&n.to_string()), Scope::Released), Document::new());
        }
        assert_eq!(transport.instances.len(), MAX_CACHED_INSTANCES);
        let refreshed = (transport.uri_from_uuid("0"), Scope::Released);
        transport.remember(refreshed, Document::new());
        assert_eq!(transport.instances.len(), MAX_CACHED_INSTANCES);

        transport.remember((transport.uri_from_uuid("new"), Scope::Any), Document::new());
        assert_eq!(transport.instances.len(), 1);
        Ok(())
    }

    #[test]
    fn token_comes_from_the_environment() -> Result<()> {
        let config = KgConfig {
            token_env: "KGWEAVE_TEST_TOKEN_THAT_IS_NOT_SET".to_string(),
            ..KgConfig::default()
        };
        assert!(HttpTransport::new(&config).is_err());

        let transport = HttpTransport::with_token(&KgConfig::default(), SecretString::from("secret"))?;
        assert_eq!(
            transport.uri_from_uuid("abc"),
            "https://kg.ebrains.eu/api/instances/abc"
        );
        assert_eq!(transport.url("instances"), "https://core.kg.ebrains.eu/v3/instances");
        Ok(())
    }
}
