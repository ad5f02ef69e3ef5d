use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::json_ld::vocab::STORAGE_SIZE;

pub const DEFAULT_BASE_URL: &str = "https://core.kg.ebrains.eu/v3";
pub const DEFAULT_INSTANCE_PREFIX: &str = "https://kg.ebrains.eu/api/instances/";

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kg: KgConfig,
    pub save: SaveConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct KgConfig {
    pub base_url: String,
    pub instance_prefix: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    pub timeout_secs: u64,
    /// Real name of the `myspace` alias; asked of the store when unset
    pub private_space: Option<String>,
    /// Look up and store query definitions under their labels
    pub use_stored_queries: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Spaces that instances may be found in but never written to
    pub protected_spaces: Vec<String>,
    /// Properties managed by the store, never sent in updates
    pub locked_properties: Vec<String>,
}

impl Default for KgConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            instance_prefix: DEFAULT_INSTANCE_PREFIX.to_string(),
            token_env: "KG_AUTH_TOKEN".to_string(),
            timeout_secs: 30,
            private_space: None,
            use_stored_queries: false,
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            protected_spaces: vec!["controlled".to_string()],
            locked_properties: vec![STORAGE_SIZE.to_string()],
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config> {
        toml::from_str(text).context("invalid configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        Config::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }
}

impl SaveConfig {
    pub fn is_protected(&self, space: &str) -> bool {
        self.protected_spaces.iter().any(|protected| protected == space)
    }

    pub fn is_locked(&self, property: &str) -> bool {
        self.locked_properties.iter().any(|locked| locked == property)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;

    use super::Config;

    #[test]
    fn defaults() -> Result<()> {
        let config = Config::from_toml("")?;
        assert_eq!(config.kg.base_url, "https://core.kg.ebrains.eu/v3");
        assert_eq!(config.kg.timeout_secs, 30);
        assert!(config.save.is_protected("controlled"));
        assert!(config.save.is_locked("https://openminds.ebrains.eu/vocab/storageSize"));
        Ok(())
    }

    #[test]
    fn load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            r#"
[kg]
base_url = "https://kg.example/v3"
private_space = "private-42"
use_stored_queries = true

[save]
protected_spaces = ["controlled", "common"]
"#
        )?;
        let config = Config::load(file.path())?;
        assert_eq!(config.kg.base_url, "https://kg.example/v3");
        assert_eq!(config.kg.token_env, "KG_AUTH_TOKEN");
        assert_eq!(config.kg.private_space.as_deref(), Some("private-42"));
        assert!(config.kg.use_stored_queries);
        assert!(config.save.is_protected("common"));
        assert!(config.save.is_locked("https://openminds.ebrains.eu/vocab/storageSize"));
        Ok(())
    }

    #[test]
    fn bad_toml_is_reported() {
        assert!(Config::from_toml("[kg]\ntimeout_secs = \"soon\"").is_err());
        assert!(Config::load("/nonexistent/kgweave.toml").is_err());
    }
}
