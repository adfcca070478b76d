use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{payload::DEFAULT_OFFER_ID_PREFIX, Error, InternalResult};

pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";

/// How the published instance record is fetched.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueryMode {
    /// `agd query vstorage data` subprocess
    #[default]
    Cli,
    /// `abci_query` against the node's RPC endpoint
    Rpc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub chain_id: String,

    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Node home directory, `/state/<chain_id>` when unset.
    #[serde(default)]
    pub home: Option<String>,

    #[serde(default = "default_keyring_backend")]
    pub keyring_backend: String,

    #[serde(default = "default_agd_bin")]
    pub agd_bin: String,

    #[serde(default = "default_agoric_bin")]
    pub agoric_bin: String,

    #[serde(default = "default_instance_path")]
    pub instance_path: String,

    #[serde(default = "default_offer_file")]
    pub offer_file: String,

    #[serde(default = "default_offer_id_prefix")]
    pub offer_id_prefix: String,

    #[serde(default)]
    pub query_mode: QueryMode,

    #[serde(default = "default_command_timeout", with = "duration_ms")]
    pub command_timeout: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            rpc_url: default_rpc_url(),
            home: None,
            keyring_backend: default_keyring_backend(),
            agd_bin: default_agd_bin(),
            agoric_bin: default_agoric_bin(),
            instance_path: default_instance_path(),
            offer_file: default_offer_file(),
            offer_id_prefix: default_offer_id_prefix(),
            query_mode: QueryMode::default(),
            command_timeout: default_command_timeout(),
        }
    }
}

impl WalletConfig {
    pub fn home_dir(&self) -> String {
        self.home
            .clone()
            .unwrap_or_else(|| format!("/state/{}", self.chain_id))
    }

    /// Applies `RPC_URL` and `CHAIN_ID` when they are set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(RPC_URL_ENV).ok(),
            std::env::var(CHAIN_ID_ENV).ok(),
        )
    }

    pub fn with_overrides(mut self, rpc_url: Option<String>, chain_id: Option<String>) -> Self {
        if let Some(rpc_url) = rpc_url {
            self.rpc_url = rpc_url;
        }
        if let Some(chain_id) = chain_id {
            self.chain_id = chain_id;
        }
        self
    }

    pub fn validate(&self) -> InternalResult<()> {
        if self.chain_id.is_empty() {
            return Err(Error::Config(format!(
                "chain_id is required (set it in the config file or {})",
                CHAIN_ID_ENV
            )));
        }
        if self.command_timeout.is_zero() {
            return Err(Error::Config("command_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_rpc_url() -> String {
    "http://localhost:26657".to_string()
}
fn default_keyring_backend() -> String {
    "test".to_string()
}
fn default_agd_bin() -> String {
    "agd".to_string()
}
fn default_agoric_bin() -> String {
    "agoric".to_string()
}
fn default_instance_path() -> String {
    "published.agoricNames.instance".to_string()
}
fn default_offer_file() -> String {
    "/tmp/offer.json".to_string()
}
fn default_offer_id_prefix() -> String {
    DEFAULT_OFFER_ID_PREFIX.to_string()
}
fn default_command_timeout() -> Duration {
    Duration::from_secs(60)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
