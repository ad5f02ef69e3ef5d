use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Where a file can be downloaded from, plus what is known about its content.
/// Embedded in the linking document rather than stored as its own node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub location: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    /// e.g. `SHA-256`
    pub digest_method: Option<String>,
    pub content_type: Option<String>,
    pub original_file_name: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DistributionWire {
    #[serde(rename = "downloadURL")]
    download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_size: Option<ContentSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_file_name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ContentSize {
    unit: String,
    value: u64,
}

#[derive(Serialize, Deserialize)]
struct Digest {
    algorithm: Option<String>,
    value: String,
}

impl Distribution {
    pub fn new(location: impl Into<String>) -> Distribution {
        Distribution {
            location: location.into(),
            size: None,
            digest: None,
            digest_method: None,
            content_type: None,
            original_file_name: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>, method: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self.digest_method = Some(method.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_original_file_name(mut self, name: impl Into<String>) -> Self {
        self.original_file_name = Some(name.into());
        self
    }

    pub fn to_jsonld(&self) -> JsonValue {
        let wire = DistributionWire {
            download_url: self.location.clone(),
            content_size: self.size.map(|value| ContentSize {
                unit: "byte".to_string(),
                value,
            }),
            digest: self.digest.clone().map(|value| Digest {
                algorithm: self.digest_method.clone(),
                value,
            }),
            media_type: self.content_type.clone(),
            original_file_name: self.original_file_name.clone(),
        };
        serde_json::to_value(wire).unwrap_or(JsonValue::Null)
    }

    pub fn from_jsonld(data: &JsonValue) -> Result<Distribution> {
        let wire: DistributionWire = serde_json::from_value(data.clone())?;
        let size = match wire.content_size {
            Some(ContentSize { unit, value }) if unit == "byte" => Some(value),
            Some(ContentSize { unit, .. }) => {
                return Err(Error::invalid_document(format!(
                    "unsupported content size unit '{unit}'"
                )));
            }
            None => None,
        };
        let (digest, digest_method) = match wire.digest {
            Some(Digest { algorithm, value }) => (Some(value), algorithm),
            None => (None, None),
        };
        Ok(Distribution {
            location: wire.download_url,
            size,
            digest,
            digest_method,
            content_type: wire.media_type,
            original_file_name: wire.original_file_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::Distribution;

    #[test]
    fn wire_shape() {
        let distribution = Distribution::new("https://data.example/f.nwb")
            .with_size(2048)
            .with_digest("abc123", "SHA-256")
            .with_content_type("application/x-nwb")
            .with_original_file_name("f.nwb");
        assert_eq!(
            distribution.to_jsonld(),
            json!({
                "downloadURL": "https://data.example/f.nwb",
                "contentSize": { "unit": "byte", "value": 2048 },
                "digest": { "algorithm": "SHA-256", "value": "abc123" },
                "mediaType": "application/x-nwb",
                "originalFileName": "f.nwb"
            })
        );
    }

    #[test]
    fn minimal_document() -> Result<()> {
        let distribution =
            Distribution::from_jsonld(&json!({ "downloadURL": "https://data.example/f" }))?;
        assert_eq!(distribution, Distribution::new("https://data.example/f"));
        assert_eq!(
            distribution.to_jsonld(),
            json!({ "downloadURL": "https://data.example/f" })
        );
        Ok(())
    }

    #[test]
    fn non_byte_unit_is_rejected() {
        let result = Distribution::from_jsonld(&json!({
            "downloadURL": "https://data.example/f",
            "contentSize": { "unit": "kB", "value": 2 }
        }));
        assert!(result.is_err());
    }
}
