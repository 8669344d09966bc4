//! Harness configuration.
//!
//! Defaults describe the mainnet-like network every environment boots; each
//! setting can be overridden from the environment:
//!
//! | variable                    | default                |
//! |-----------------------------|------------------------|
//! | `CHAIN_TUBE_TEMP_PREFIX`    | `.chain-tube-temp-`    |
//! | `CHAIN_TUBE_TEMP_ROOT`      | system temp directory  |
//! | `CHAIN_TUBE_GENESIS_TIME`   | creation time (unix s) |
//! | `CHAIN_TUBE_CHAIN_ID`       | `coreum-mainnet-1`     |
//! | `CHAIN_TUBE_DENOM`          | `ucore`                |
//! | `CHAIN_TUBE_ADDRESS_PREFIX` | `core`                 |

use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use chain_tube_types::env_utils::{env_string, env_var};

use crate::network::NetworkConfig;

pub const DEFAULT_TEMP_PREFIX: &str = ".chain-tube-temp-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// File name prefix of each environment's scratch directory.
    pub temp_prefix: String,
    /// Parent of the scratch directories; `None` uses the system temp dir.
    pub temp_root: Option<PathBuf>,
    /// Fixed genesis time; `None` stamps each environment with its creation time.
    pub genesis_time: Option<DateTime<Utc>>,
    pub network: NetworkConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            temp_root: None,
            genesis_time: None,
            network: NetworkConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(prefix) = env_string("CHAIN_TUBE_TEMP_PREFIX") {
            config.temp_prefix = prefix;
        }
        config.temp_root = env_string("CHAIN_TUBE_TEMP_ROOT").map(PathBuf::from);
        config.genesis_time = env_var::<i64>("CHAIN_TUBE_GENESIS_TIME")
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        if let Some(chain_id) = env_string("CHAIN_TUBE_CHAIN_ID") {
            config.network.chain_id = chain_id;
        }
        if let Some(denom) = env_string("CHAIN_TUBE_DENOM") {
            config.network.denom = denom;
        }
        if let Some(prefix) = env_string("CHAIN_TUBE_ADDRESS_PREFIX") {
            config.network.address_prefix = prefix;
        }
        config
    }

    /// Network settings for one new environment.
    pub fn network_for_new_env(&self) -> NetworkConfig {
        let mut network = self.network.clone();
        network.genesis_time = self.genesis_time.unwrap_or_else(Utc::now);
        network
    }

    /// Create a fresh scratch directory, removed when the handle drops.
    pub fn scratch_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.temp_prefix);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_uses_prefix_and_root() {
        let root = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            temp_root: Some(root.path().to_path_buf()),
            ..HarnessConfig::default()
        };
        let dir = config.scratch_dir().unwrap();
        assert!(dir.path().starts_with(root.path()));
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(DEFAULT_TEMP_PREFIX));

        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_fixed_genesis_time() {
        let fixed = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let config = HarnessConfig {
            genesis_time: Some(fixed),
            ..HarnessConfig::default()
        };
        assert_eq!(config.network_for_new_env().genesis_time, fixed);
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("CHAIN_TUBE_DENOM", "utestcore");
        std::env::set_var("CHAIN_TUBE_GENESIS_TIME", "1700000000");
        let config = HarnessConfig::from_env();
        std::env::remove_var("CHAIN_TUBE_DENOM");
        std::env::remove_var("CHAIN_TUBE_GENESIS_TIME");

        assert_eq!(config.network.denom, "utestcore");
        assert_eq!(config.genesis_time.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(config.network.chain_id, "coreum-mainnet-1");
    }
}
