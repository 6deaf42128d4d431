//! Discovery manifest for the single TV endpoint

use crate::directive::Directive;
use serde::Serialize;
use tvlink_shared::Namespace;

/// Static description of the advertised TV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub endpoint_id: String,
    pub friendly_name: String,
    pub description: String,
    pub manufacturer: String,
    pub inputs: Vec<String>,
}

impl Default for EndpointDescriptor {
    fn default() -> Self {
        Self {
            endpoint_id: "tv1".into(),
            friendly_name: "TV 1".into(),
            description: "The family room tv".into(),
            manufacturer: "Gavin-Sony".into(),
            inputs: vec!["MEDIA PLAYER".into(), "BLURAY".into(), "HDMI 4".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryResponse {
    pub event: DiscoveryEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryEvent {
    pub header: DiscoveryHeader,
    pub payload: DiscoveryPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryHeader {
    pub namespace: String,
    pub name: String,
    pub payload_version: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryPayload {
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub endpoint_id: String,
    pub friendly_name: String,
    pub description: String,
    pub manufacturer_name: String,
    pub display_categories: Vec<String>,
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Capability {
    Controller(ControllerCapability),
    Base(BaseCapability),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerCapability {
    #[serde(rename = "type")]
    pub kind: String,
    pub interface: String,
    pub version: String,
    pub properties: CapabilityProperties,
    pub supported_operations: Vec<String>,
    pub inputs: Vec<InputName>,
    pub proactively_reported: bool,
    pub retrievable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseCapability {
    #[serde(rename = "type")]
    pub kind: String,
    pub interface: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProperties {
    pub supported: Vec<PropertyName>,
    pub proactively_reported: bool,
    pub retrievable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputName {
    pub name: String,
}

fn controller(
    interface: Namespace,
    version: &str,
    properties: &[&str],
    operations: &[&str],
    inputs: &[String],
) -> Capability {
    Capability::Controller(ControllerCapability {
        kind: "AlexaInterface".into(),
        interface: interface.as_str().into(),
        version: version.into(),
        properties: CapabilityProperties {
            supported: properties
                .iter()
                .map(|name| PropertyName {
                    name: (*name).into(),
                })
                .collect(),
            proactively_reported: true,
            retrievable: true,
        },
        supported_operations: operations.iter().map(|op| (*op).into()).collect(),
        inputs: inputs
            .iter()
            .map(|name| InputName { name: name.clone() })
            .collect(),
        proactively_reported: true,
        retrievable: true,
    })
}

/// Build the `Discover.Response` for a discovery directive
pub fn discover(directive: &Directive, descriptor: &EndpointDescriptor) -> DiscoveryResponse {
    let version = directive.header.payload_version.as_str();

    let capabilities = vec![
        controller(Namespace::PowerController, version, &["powerState"], &[], &[]),
        controller(Namespace::Speaker, version, &["volume", "muted"], &[], &[]),
        controller(
            Namespace::PlaybackController,
            version,
            &[],
            &["Play", "Stop", "Pause"],
            &[],
        ),
        controller(
            Namespace::InputController,
            version,
            &[],
            &[],
            &descriptor.inputs,
        ),
        controller(Namespace::ChannelController, version, &["channel"], &[], &[]),
        Capability::Base(BaseCapability {
            kind: "AlexaInterface".into(),
            interface: "Alexa".into(),
            version: version.into(),
        }),
    ];

    DiscoveryResponse {
        event: DiscoveryEvent {
            header: DiscoveryHeader {
                namespace: directive.header.namespace.clone(),
                name: "Discover.Response".into(),
                payload_version: directive.header.payload_version.clone(),
                message_id: directive.header.message_id.clone(),
            },
            payload: DiscoveryPayload {
                endpoints: vec![Endpoint {
                    endpoint_id: descriptor.endpoint_id.clone(),
                    friendly_name: descriptor.friendly_name.clone(),
                    description: descriptor.description.clone(),
                    manufacturer_name: descriptor.manufacturer.clone(),
                    display_categories: vec!["TV".into()],
                    capabilities,
                }],
            },
        },
    }
}
