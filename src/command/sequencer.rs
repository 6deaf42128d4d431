//! Command sequencer - expands normalized commands into remote-call plans

use super::plan::{RemoteCall, SequencePlan, VOLUME_STEPS};
use crate::config::{ConfigError, InputMap, INPUT_KEY_PREFIX};
use crate::remote::RemoteAction;
use thiserror::Error;
use tvlink_shared::{CommandAction, CommandKind, NormalizedCommand, VocabularyError};

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Undecodable command: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error("Unrecognized {kind:?} action: {action}")]
    UnrecognizedAction { kind: CommandKind, action: String },

    #[error("Channel {0:?} contains no digits")]
    NoDigits(String),

    #[error("Volume action {0:?} has no clear sign")]
    AmbiguousVolume(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SequenceError {
    /// Coarse category for logs
    pub fn category(&self) -> &'static str {
        match self {
            SequenceError::Decode(_)
            | SequenceError::Vocabulary(_)
            | SequenceError::UnrecognizedAction { .. } => "classification",
            SequenceError::NoDigits(_) | SequenceError::AmbiguousVolume(_) => "expansion",
            SequenceError::Config(_) => "configuration",
        }
    }
}

/// Decimal digits of `text`, left to right
pub fn extract_digits(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect()
}

/// Input-map key for a spoken input name
///
/// The first occurrence of the device's own name is removed, then the rest
/// is trimmed, upper-cased and has spaces replaced by underscores.
pub fn input_key(input: &str, device_name: &str) -> String {
    let stripped = if device_name.is_empty() {
        input.to_string()
    } else {
        input.replacen(device_name, "", 1)
    };
    format!(
        "{}{}",
        INPUT_KEY_PREFIX,
        stripped.trim().replace(' ', "_").to_uppercase()
    )
}

/// Plans remote calls for one TV
#[derive(Debug, Clone)]
pub struct CommandSequencer {
    device_name: String,
    inputs: InputMap,
}

impl CommandSequencer {
    pub fn new(device_name: impl Into<String>, inputs: InputMap) -> Self {
        Self {
            device_name: device_name.into(),
            inputs,
        }
    }

    /// Plan the calls for a command without performing any of them
    pub fn plan(&self, command: &NormalizedCommand) -> Result<SequencePlan, SequenceError> {
        let kind = command.kind()?;
        let action = &command.action;

        let unrecognized = || SequenceError::UnrecognizedAction {
            kind,
            action: action.to_string(),
        };

        let plan = match kind {
            CommandKind::Power => {
                let press = match action.as_text() {
                    Some("ON") => RemoteAction::PowerOn,
                    Some("OFF") => RemoteAction::PowerOff,
                    _ => return Err(unrecognized()),
                };
                SequencePlan::single(RemoteCall::Action(press))
            }
            // The remote only toggles; the requested state is not consulted
            CommandKind::Mute => SequencePlan::single(RemoteCall::Action(RemoteAction::Mute)),
            CommandKind::Volume => self.plan_volume(action)?,
            CommandKind::Playback => {
                let press = action
                    .as_text()
                    .and_then(RemoteAction::playback)
                    .ok_or_else(unrecognized)?;
                SequencePlan::single(RemoteCall::Action(press))
            }
            CommandKind::Input => {
                let name = action.as_text().ok_or_else(unrecognized)?;
                let key = input_key(name, &self.device_name);
                let uri = self.inputs.resolve(&key)?;
                SequencePlan::single(RemoteCall::SelectContent {
                    uri: uri.to_string(),
                })
            }
            CommandKind::Channel => {
                let text = action.to_string();
                let digits = extract_digits(&text);
                if digits.is_empty() {
                    return Err(SequenceError::NoDigits(text));
                }
                SequencePlan::spaced(digits.into_iter().map(RemoteAction::Num))
            }
        };

        Ok(plan)
    }

    /// Always `VOLUME_STEPS` presses; direction from the sign in the text form
    fn plan_volume(&self, action: &CommandAction) -> Result<SequencePlan, SequenceError> {
        if action.as_integer().is_none() {
            return Err(SequenceError::AmbiguousVolume(action.to_string()));
        }

        let press = if action.to_string().contains('-') {
            RemoteAction::VolumeDown
        } else {
            RemoteAction::VolumeUp
        };

        Ok(SequencePlan::spaced(std::iter::repeat(press).take(VOLUME_STEPS)))
    }
}
