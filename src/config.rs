//! Bridge configuration, read once at startup

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tvlink_shared::{link, topic_for};

/// Prefix of input-mapping variables, e.g. `DEVICE__HDMI_4`
pub const INPUT_KEY_PREFIX: &str = "DEVICE__";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("No source mapped for input key {0}")]
    UnmappedInput(String),
}

/// Normalized input key -> source URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputMap {
    entries: HashMap<String, String>,
}

impl InputMap {
    /// Collect every `DEVICE__*` pair; an empty URI is rejected
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = HashMap::new();
        for (key, value) in vars {
            let key = key.into();
            if !key.starts_with(INPUT_KEY_PREFIX) {
                continue;
            }
            let value = value.into();
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { key, value });
            }
            entries.insert(key, value.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, key: impl Into<String>, uri: impl Into<String>) {
        self.entries.insert(key.into(), uri.into());
    }

    pub fn resolve(&self, key: &str) -> Result<&str, ConfigError> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnmappedInput(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Home-side process configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// TV network address
    pub tv_address: String,
    /// Pre-shared key for the TV's HTTP API
    pub tv_psk: String,
    /// Endpoint id this bridge serves
    pub device_id: String,
    /// Name token stripped from spoken input names
    pub device_name: String,
    /// Broker address
    pub broker_address: String,
    /// Topic root, endpoint id appended
    pub topic_root: String,
    /// HTTP timeout for remote calls
    pub remote_timeout: Duration,
    /// TCP connect timeout for the broker
    pub broker_connect_timeout: Duration,
    pub inputs: InputMap,
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let millis = |key: &'static str, default: Duration| match get(key) {
            Some(ms) => ms
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    key: key.into(),
                    value: ms,
                }),
            None => Ok(default),
        };

        let remote_timeout = millis("TV_TIMEOUT_MS", Duration::from_secs(5))?;
        let broker_connect_timeout = millis("BROKER_CONNECT_TIMEOUT_MS", Duration::from_secs(5))?;

        Ok(Self {
            tv_address: get("TV_IP").ok_or(ConfigError::Missing("TV_IP"))?,
            tv_psk: get("TV_PSK").ok_or(ConfigError::Missing("TV_PSK"))?,
            device_id: get("TV_DEVICE").unwrap_or_else(|| "tv1".into()),
            device_name: get("TV_NAME").unwrap_or_else(|| "TV 1".into()),
            broker_address: get("BROKER_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".into()),
            topic_root: get("TOPIC_ROOT").unwrap_or_else(|| link::DEFAULT_TOPIC_ROOT.into()),
            remote_timeout,
            broker_connect_timeout,
            inputs: InputMap::from_vars(vars.clone())?,
        })
    }

    /// Topic this bridge subscribes to
    pub fn topic(&self) -> String {
        topic_for(&self.topic_root, &self.device_id)
    }
}
