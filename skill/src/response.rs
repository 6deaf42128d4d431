//! Outbound response envelopes
//!
//! Every directive ends in exactly one of these: a state report for a
//! handled action, the discovery manifest, or an explicit error.

use crate::directive::{Directive, Scope};
use crate::discovery::DiscoveryResponse;
use crate::error::TranslateError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Reported uncertainty of the state sample
pub const UNCERTAINTY_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SkillResponse {
    Action(Acknowledgment),
    Discovery(DiscoveryResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledgment {
    pub event: AckEvent,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AckEvent {
    pub header: ResponseHeader,
    pub endpoint: EndpointRef,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeader {
    pub namespace: String,
    pub name: String,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
    pub payload_version: String,
}

impl ResponseHeader {
    fn reply_to(directive: &Directive, name: &str) -> Self {
        Self {
            namespace: "Alexa".into(),
            name: name.into(),
            message_id: directive.header.message_id.clone(),
            correlation_token: directive.header.correlation_token.clone(),
            payload_version: directive.header.payload_version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRef {
    pub scope: Scope,
    pub endpoint_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Context {
    pub properties: Vec<ContextProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextProperty {
    pub namespace: String,
    pub name: String,
    pub value: serde_json::Value,
    #[serde(serialize_with = "serialize_sample_time")]
    pub time_of_sample: DateTime<Utc>,
    pub uncertainty_in_milliseconds: u64,
}

fn serialize_sample_time<S: Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Acknowledgment {
    /// Build the state report for a handled action directive
    pub fn for_directive(
        directive: &Directive,
        endpoint: EndpointRef,
        state_name: &str,
        value: serde_json::Value,
        sampled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event: AckEvent {
                header: ResponseHeader::reply_to(directive, "Response"),
                endpoint,
                payload: serde_json::Map::new(),
            },
            context: Context {
                properties: vec![ContextProperty {
                    namespace: directive.header.namespace.clone(),
                    name: state_name.into(),
                    value,
                    time_of_sample: sampled_at,
                    uncertainty_in_milliseconds: UNCERTAINTY_MS,
                }],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub event: ErrorEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub header: ResponseHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointRef>,
    pub payload: ErrorPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn for_directive(directive: &Directive, error: &TranslateError) -> Self {
        let endpoint = directive.endpoint.as_ref().map(|e| EndpointRef {
            scope: e.scope.clone(),
            endpoint_id: e.endpoint_id.clone(),
        });

        Self {
            event: ErrorEvent {
                header: ResponseHeader::reply_to(directive, "ErrorResponse"),
                endpoint,
                payload: ErrorPayload {
                    kind: error.error_type().into(),
                    message: error.to_string(),
                },
            },
        }
    }
}

impl ErrorResponse {
    /// Error reply for a body that never parsed; header fields are salvaged where present
    pub fn for_unparsed(body: &str, error: &TranslateError) -> Self {
        let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
        let header = &value["directive"]["header"];
        let field = |name: &str| header[name].as_str().map(String::from);

        Self {
            event: ErrorEvent {
                header: ResponseHeader {
                    namespace: "Alexa".into(),
                    name: "ErrorResponse".into(),
                    message_id: field("messageId").unwrap_or_default(),
                    correlation_token: field("correlationToken"),
                    payload_version: field("payloadVersion").unwrap_or_else(|| "3".into()),
                },
                endpoint: None,
                payload: ErrorPayload {
                    kind: error.error_type().into(),
                    message: error.to_string(),
                },
            },
        }
    }
}
