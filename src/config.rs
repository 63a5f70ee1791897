use std::{fs, path::{Path, PathBuf}};

use anyhow::{self, Context};
use serde::{Serialize, Deserialize};
use toml;

/// Where the two table snapshots live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_accounts")]
    pub accounts: PathBuf,
    #[serde(default = "StorageConfig::default_transactions")]
    pub transactions: PathBuf
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            accounts: Self::default_accounts(),
            transactions: Self::default_transactions()
        }
    }
}

impl StorageConfig {
    fn default_accounts() -> PathBuf {
        PathBuf::from("data/accounts.json")
    }

    fn default_transactions() -> PathBuf {
        PathBuf::from("data/transactions.json")
    }

    pub fn new(accounts: impl AsRef<Path>, transactions: impl AsRef<Path>) -> Self {
        StorageConfig {
            accounts: accounts.as_ref().to_path_buf(),
            transactions: transactions.as_ref().to_path_buf()
        }
    }

    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file_content = fs::read_to_string(filepath)
            .with_context(|| "failed to read config file")?;
        let config: StorageConfig = toml::from_str(&file_content)
            .with_context(|| "failed to parse config file")?;
        config.validate()?;
        return Ok(config);
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.accounts.as_os_str().is_empty() || self.transactions.as_os_str().is_empty() {
            anyhow::bail!("snapshot paths cannot be empty");
        }
        Ok(())
    }

    /// Creates missing parent directories of both snapshot files.
    pub fn prepare(&self) -> anyhow::Result<()> {
        for path in [&self.accounts, &self.transactions] {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use crate::config::StorageConfig;

    use std::path::PathBuf;

    #[test]
    fn read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.toml");
        std::fs::write(&path, "accounts = \"a.json\"\ntransactions = \"t.json\"\n").unwrap();

        let config = StorageConfig::read(&path).unwrap();
        assert_eq!(config, StorageConfig::new("a.json", "t.json"));
    }

    #[test]
    fn defaults_fill_missing_paths() {
        let config: StorageConfig = toml::from_str("accounts = \"a.json\"").unwrap();
        assert_eq!(config.transactions, PathBuf::from("data/transactions.json"));
    }

    #[test]
    fn empty_paths_rejected() {
        assert!(StorageConfig::new("", "t.json").validate().is_err());
    }

    #[test]
    fn prepare_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path().join("x/a.json"), dir.path().join("y/t.json"));

        config.prepare().unwrap();
        assert!(dir.path().join("x").is_dir());
        assert!(dir.path().join("y").is_dir());
    }
}
