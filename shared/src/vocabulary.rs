//! Normalized command vocabulary
//!
//! The message published by the skill and consumed by the bridge:
//! ```text
//! { "source": "Alexa.Speaker", "action": -10, "task": "volume" }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while interpreting vocabulary values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Unrecognized command pair: source={namespace} task={task}")]
    UnrecognizedPair { namespace: Namespace, task: Task },
}

/// Smart home interface namespaces understood by both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    #[serde(rename = "Alexa.Discovery")]
    Discovery,
    #[serde(rename = "Alexa.PowerController")]
    PowerController,
    #[serde(rename = "Alexa.Speaker")]
    Speaker,
    #[serde(rename = "Alexa.PlaybackController")]
    PlaybackController,
    #[serde(rename = "Alexa.InputController")]
    InputController,
    #[serde(rename = "Alexa.ChannelController")]
    ChannelController,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Discovery,
        Namespace::PowerController,
        Namespace::Speaker,
        Namespace::PlaybackController,
        Namespace::InputController,
        Namespace::ChannelController,
    ];

    /// Wire name, e.g. `Alexa.Speaker`
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Discovery => "Alexa.Discovery",
            Namespace::PowerController => "Alexa.PowerController",
            Namespace::Speaker => "Alexa.Speaker",
            Namespace::PlaybackController => "Alexa.PlaybackController",
            Namespace::InputController => "Alexa.InputController",
            Namespace::ChannelController => "Alexa.ChannelController",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| VocabularyError::UnknownNamespace(s.to_string()))
    }
}

/// Disambiguates actions sharing a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Power,
    Muted,
    Volume,
    Control,
    Input,
    Channel,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Power => "power",
            Task::Muted => "muted",
            Task::Volume => "volume",
            Task::Control => "control",
            Task::Input => "input",
            Task::Channel => "channel",
        }
    }

    /// Name of the reported state property for this task
    pub fn state_name(&self) -> &'static str {
        match self {
            Task::Power => "powerState",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The literal value to apply
///
/// Variant order matters for untagged decoding: booleans and integers are
/// tried before falling back to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandAction {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl CommandAction {
    pub fn text(value: impl Into<String>) -> Self {
        CommandAction::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CommandAction::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of a number, or of text that parses as one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CommandAction::Number(n) => Some(*n),
            CommandAction::Text(s) => s.trim().parse().ok(),
            CommandAction::Flag(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CommandAction::Flag(b) => serde_json::Value::Bool(*b),
            CommandAction::Number(n) => serde_json::Value::from(*n),
            CommandAction::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Textual form inspected by the home side for signs and digits
impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandAction::Flag(b) => write!(f, "{}", b),
            CommandAction::Number(n) => write!(f, "{}", n),
            CommandAction::Text(s) => f.write_str(s),
        }
    }
}

/// Recognized (source, task) buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Power,
    Mute,
    Volume,
    Playback,
    Input,
    Channel,
}

/// Normalized command exchanged over the topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCommand {
    pub source: Namespace,
    pub action: CommandAction,
    pub task: Task,
}

impl NormalizedCommand {
    pub fn new(source: Namespace, action: CommandAction, task: Task) -> Self {
        Self {
            source,
            action,
            task,
        }
    }

    /// Classify into the closed set of (source, task) pairs
    pub fn kind(&self) -> Result<CommandKind, VocabularyError> {
        match (self.source, self.task) {
            (Namespace::PowerController, Task::Power) => Ok(CommandKind::Power),
            (Namespace::Speaker, Task::Muted) => Ok(CommandKind::Mute),
            (Namespace::Speaker, Task::Volume) => Ok(CommandKind::Volume),
            (Namespace::PlaybackController, Task::Control) => Ok(CommandKind::Playback),
            (Namespace::InputController, Task::Input) => Ok(CommandKind::Input),
            (Namespace::ChannelController, Task::Channel) => Ok(CommandKind::Channel),
            (namespace, task) => Err(VocabularyError::UnrecognizedPair { namespace, task }),
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Topic a given endpoint's commands are published on
pub fn topic_for(root: &str, endpoint_id: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), endpoint_id)
}
