use std::{fs, path::Path};
use serde::{Serialize, Deserialize};
use toml;
use anyhow::{self, Context};

use teller::config::StorageConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_address")]
    pub address: String
}

impl ServerConfig {
    fn default_address() -> String {
        "127.0.0.1:8081".to_owned()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { address: Self::default_address() }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig
}

impl AppConfig {
    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file_content = fs::read_to_string(filepath)
            .with_context(|| "failed to read config file")?;
        let config: AppConfig = toml::from_str(&file_content)
            .with_context(|| "failed to parse config file")?;

        config.storage.validate()?;
        if config.server.address.is_empty() {
            anyhow::bail!("server address cannot be empty");
        }
        return Ok(config);
    }
}
