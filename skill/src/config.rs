//! Skill configuration

use crate::discovery::EndpointDescriptor;
use std::time::Duration;
use thiserror::Error;
use tvlink_shared::link;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SkillConfig {
    /// Broker address commands are published to
    pub broker_address: String,
    /// Topic root; the endpoint id is appended per directive
    pub topic_root: String,
    /// How long to wait for the broker to accept a publish
    pub publish_timeout: Duration,
    /// Advertised TV
    pub descriptor: EndpointDescriptor,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            broker_address: "127.0.0.1:8080".into(),
            topic_root: link::DEFAULT_TOPIC_ROOT.into(),
            publish_timeout: Duration::from_millis(link::PUBLISH_ACK_TIMEOUT_MS),
            descriptor: EndpointDescriptor::default(),
        }
    }
}

impl SkillConfig {
    /// Defaults overridden from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BROKER_ADDRESS") {
            config.broker_address = addr;
        }
        if let Some(root) = lookup("TOPIC_ROOT") {
            config.topic_root = root;
        }
        if let Some(ms) = lookup("PUBLISH_TIMEOUT_MS") {
            let millis: u64 = ms.parse().map_err(|_| ConfigError::Invalid {
                key: "PUBLISH_TIMEOUT_MS",
                value: ms.clone(),
            })?;
            config.publish_timeout = Duration::from_millis(millis);
        }

        let descriptor = &mut config.descriptor;
        if let Some(id) = lookup("TV_ENDPOINT_ID") {
            descriptor.endpoint_id = id;
        }
        if let Some(name) = lookup("TV_FRIENDLY_NAME") {
            descriptor.friendly_name = name;
        }
        if let Some(description) = lookup("TV_DESCRIPTION") {
            descriptor.description = description;
        }
        if let Some(manufacturer) = lookup("TV_MANUFACTURER") {
            descriptor.manufacturer = manufacturer;
        }
        if let Some(inputs) = lookup("TV_INPUTS") {
            descriptor.inputs = inputs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if config.broker_address.is_empty() {
            return Err(ConfigError::Missing("BROKER_ADDRESS"));
        }

        Ok(config)
    }
}
