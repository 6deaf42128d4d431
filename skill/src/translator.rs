//! Directive translator
//!
//! Maps a smart home directive onto a normalized command, publishes it on
//! the endpoint's topic and reports the resulting state:
//!
//! | Namespace          | Name                | Action                         | Task    |
//! |--------------------|---------------------|--------------------------------|---------|
//! | PowerController    | TurnOn / TurnOff    | `"ON"` / `"OFF"`               | power   |
//! | Speaker            | SetMute             | `payload.mute`                 | muted   |
//! | Speaker            | AdjustVolume        | `payload.volume`               | volume  |
//! | PlaybackController | any                 | the directive name             | control |
//! | InputController    | any                 | `payload.input`                | input   |
//! | ChannelController  | any                 | channel number, else its name  | channel |

use crate::directive::{ChannelPayload, Directive, DirectiveEnvelope, InputPayload, SpeakerPayload};
use crate::discovery::{self, EndpointDescriptor};
use crate::error::{TranslateError, TranslateResult};
use crate::publisher::Publisher;
use crate::response::{Acknowledgment, EndpointRef, ErrorResponse, SkillResponse};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};
use tvlink_shared::{topic_for, CommandAction, Namespace, NormalizedCommand, Task};

/// A directive's derived command and the state value to report for it
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub command: NormalizedCommand,
    pub state_value: serde_json::Value,
}

impl Translation {
    fn new(source: Namespace, action: CommandAction, task: Task) -> Self {
        let state_value = match task {
            Task::Channel => serde_json::json!({ "number": action.to_json() }),
            _ => action.to_json(),
        };
        Self {
            command: NormalizedCommand::new(source, action, task),
            state_value,
        }
    }

    pub fn state_name(&self) -> &'static str {
        self.command.task.state_name()
    }
}

fn payload_as<T: DeserializeOwned + Default>(directive: &Directive) -> TranslateResult<T> {
    if directive.payload.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(directive.payload.clone())?)
}

fn missing(directive: &Directive, field: &'static str) -> TranslateError {
    TranslateError::MissingField {
        name: directive.header.name.clone(),
        field,
    }
}

fn unsupported(directive: &Directive) -> TranslateError {
    TranslateError::Unsupported {
        namespace: directive.header.namespace.clone(),
        name: directive.header.name.clone(),
    }
}

/// Derive the normalized command for an action directive
///
/// Discovery carries no command and is rejected here, as is anything
/// outside the table above.
pub fn translate(directive: &Directive) -> TranslateResult<Translation> {
    let namespace: Namespace = directive.header.namespace.parse()?;
    let name = directive.header.name.as_str();

    let translation = match namespace {
        Namespace::Discovery => return Err(unsupported(directive)),
        Namespace::PowerController => {
            let action = match name {
                "TurnOn" => "ON",
                "TurnOff" => "OFF",
                _ => return Err(unsupported(directive)),
            };
            Translation::new(namespace, CommandAction::text(action), Task::Power)
        }
        Namespace::Speaker => {
            let payload: SpeakerPayload = payload_as(directive)
                .map_err(|_| missing(directive, "a valid speaker payload"))?;
            match name {
                "SetMute" => {
                    let mute = payload.mute.ok_or_else(|| missing(directive, "payload.mute"))?;
                    Translation::new(namespace, CommandAction::Flag(mute), Task::Muted)
                }
                "AdjustVolume" => {
                    let volume = payload
                        .volume
                        .ok_or_else(|| missing(directive, "payload.volume"))?;
                    Translation::new(namespace, CommandAction::Number(volume), Task::Volume)
                }
                _ => return Err(unsupported(directive)),
            }
        }
        Namespace::PlaybackController => {
            Translation::new(namespace, CommandAction::text(name), Task::Control)
        }
        Namespace::InputController => {
            let payload: InputPayload = payload_as(directive)
                .map_err(|_| missing(directive, "a valid input payload"))?;
            let input = payload
                .input
                .ok_or_else(|| missing(directive, "payload.input"))?;
            Translation::new(namespace, CommandAction::Text(input), Task::Input)
        }
        Namespace::ChannelController => {
            let payload: ChannelPayload = payload_as(directive)
                .map_err(|_| missing(directive, "a valid channel payload"))?;
            let channel = payload
                .channel_value()
                .ok_or_else(|| missing(directive, "payload.channel.number or payload.channelMetadata.name"))?;
            Translation::new(namespace, channel, Task::Channel)
        }
    };

    // The table above only yields recognized pairs
    translation.command.kind()?;

    Ok(translation)
}

/// Translates directives and publishes their commands through `P`
pub struct DirectiveTranslator<P> {
    publisher: P,
    topic_root: String,
    descriptor: EndpointDescriptor,
}

impl<P: Publisher> DirectiveTranslator<P> {
    pub fn new(publisher: P, topic_root: impl Into<String>, descriptor: EndpointDescriptor) -> Self {
        Self {
            publisher,
            topic_root: topic_root.into(),
            descriptor,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Handle one directive; the publish completes before the state report is built
    pub async fn handle(&self, directive: &Directive) -> TranslateResult<SkillResponse> {
        if directive.header.namespace == Namespace::Discovery.as_str() {
            info!(message_id = %directive.header.message_id, "Discovery requested");
            return Ok(SkillResponse::Discovery(discovery::discover(
                directive,
                &self.descriptor,
            )));
        }

        let translation = translate(directive)?;
        let endpoint = directive
            .endpoint
            .as_ref()
            .ok_or_else(|| missing(directive, "endpoint"))?;

        let topic = topic_for(&self.topic_root, &endpoint.endpoint_id);
        let payload = translation.command.to_payload()?;

        info!(
            topic = %topic,
            source = %translation.command.source,
            task = %translation.command.task,
            action = %translation.command.action,
            "Publishing command"
        );

        self.publisher
            .publish(&topic, payload)
            .await
            .map_err(|error| TranslateError::Transport {
                topic: topic.clone(),
                error,
            })?;

        let endpoint_ref = EndpointRef {
            scope: endpoint.scope.clone(),
            endpoint_id: endpoint.endpoint_id.clone(),
        };

        Ok(SkillResponse::Action(Acknowledgment::for_directive(
            directive,
            endpoint_ref,
            translation.state_name(),
            translation.state_value,
            Utc::now(),
        )))
    }

    /// Handle a raw request body; one that does not parse still gets an error response
    pub async fn respond_raw(&self, body: &str) -> SkillResponse {
        match serde_json::from_str::<DirectiveEnvelope>(body) {
            Ok(envelope) => self.respond(&envelope).await,
            Err(e) => {
                let error = TranslateError::Malformed(e);
                error!("Rejecting request: {}", error);
                SkillResponse::Error(ErrorResponse::for_unparsed(body, &error))
            }
        }
    }

    /// Handle an invocation body, turning failures into error responses
    pub async fn respond(&self, envelope: &DirectiveEnvelope) -> SkillResponse {
        let directive = &envelope.directive;
        debug!(
            namespace = %directive.header.namespace,
            name = %directive.header.name,
            "Received directive"
        );

        match self.handle(directive).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    namespace = %directive.header.namespace,
                    name = %directive.header.name,
                    "Directive failed: {}",
                    e
                );
                SkillResponse::Error(ErrorResponse::for_directive(directive, &e))
            }
        }
    }
}
