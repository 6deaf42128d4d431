//! Inbound smart home directive

use serde::{Deserialize, Serialize};
use tvlink_shared::CommandAction;

/// Top-level invocation body: `{ "directive": { ... } }`
#[derive(Debug, Clone, Deserialize)]
pub struct DirectiveEnvelope {
    pub directive: Directive,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Directive {
    pub header: DirectiveHeader,
    #[serde(default)]
    pub endpoint: Option<DirectiveEndpoint>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    pub namespace: String,
    pub name: String,
    pub message_id: String,
    #[serde(default)]
    pub correlation_token: Option<String>,
    pub payload_version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    pub endpoint_id: String,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
}

/// `Alexa.Speaker` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakerPayload {
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub volume: Option<i64>,
}

/// `Alexa.InputController` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputPayload {
    #[serde(default)]
    pub input: Option<String>,
}

/// `Alexa.ChannelController` payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPayload {
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub channel_metadata: Option<ChannelMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelRef {
    #[serde(default)]
    pub number: Option<CommandAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

impl ChannelPayload {
    /// Channel number when present and non-empty, else the metadata name
    pub fn channel_value(&self) -> Option<CommandAction> {
        let number = self
            .channel
            .as_ref()
            .and_then(|c| c.number.clone())
            .filter(|n| match n {
                CommandAction::Text(s) => !s.is_empty(),
                CommandAction::Flag(b) => *b,
                CommandAction::Number(n) => *n != 0,
            });

        number.or_else(|| {
            self.channel_metadata
                .as_ref()
                .and_then(|m| m.name.clone())
                .filter(|name| !name.is_empty())
                .map(CommandAction::Text)
        })
    }
}
