//! Home-assistant MQTT discovery.
//!
//! Hubs that follow the discovery convention pick the amplifier up from the
//! retained config messages built here, one per entity.

use crate::error::Result;
use crate::mqtt::Topics;
use crate::types::{MAX_VOLUME, MIN_VOLUME};
use serde::Serialize;

/// Device block shared by every entity
#[derive(Debug, Clone, Serialize)]
struct DeviceInfo {
    identifiers: Vec<String>,
    name: &'static str,
    model: &'static str,
    sw_version: &'static str,
}

/// Config payload for one discovered entity
#[derive(Debug, Clone, Serialize)]
struct EntityConfig {
    name: &'static str,
    unique_id: String,
    command_topic: String,
    state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'static str>,
    device: DeviceInfo,
}

/// A retained message to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: String,
}

/// Builds discovery configs for the bridge's entities
#[derive(Debug, Clone)]
pub struct Discovery {
    prefix: String,
    node_id: String,
}

impl Discovery {
    pub fn new(prefix: impl Into<String>, topics: &Topics) -> Self {
        Self {
            prefix: prefix.into(),
            node_id: node_id(topics.base()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Config messages for volume, mute, dim and source
    pub fn messages(&self, topics: &Topics) -> Result<Vec<DiscoveryMessage>> {
        let entities = [
            (
                "number",
                "volume",
                EntityConfig {
                    min: Some(MIN_VOLUME),
                    max: Some(MAX_VOLUME),
                    step: Some(0.5),
                    mode: Some("slider"),
                    unit_of_measurement: Some("dB"),
                    ..self.entity("Volume", "volume", topics)
                },
            ),
            (
                "switch",
                "mute",
                EntityConfig {
                    payload_on: Some("ON"),
                    payload_off: Some("OFF"),
                    ..self.entity("Mute", "mute", topics)
                },
            ),
            (
                "switch",
                "dimmed",
                EntityConfig {
                    payload_on: Some("ON"),
                    payload_off: Some("OFF"),
                    ..self.entity("Dim", "dimmed", topics)
                },
            ),
            (
                "number",
                "source",
                EntityConfig {
                    min: Some(0.0),
                    max: Some(99.0),
                    step: Some(1.0),
                    mode: Some("box"),
                    ..self.entity("Source", "source", topics)
                },
            ),
        ];

        entities
            .into_iter()
            .map(|(component, object_id, config)| -> Result<DiscoveryMessage> {
                Ok(DiscoveryMessage {
                    topic: format!(
                        "{}/{}/{}/{}/config",
                        self.prefix, component, self.node_id, object_id
                    ),
                    payload: serde_json::to_string(&config)?,
                })
            })
            .collect()
    }

    fn entity(&self, name: &'static str, object_id: &str, topics: &Topics) -> EntityConfig {
        EntityConfig {
            name,
            unique_id: format!("{}_{}", self.node_id, object_id),
            command_topic: topics.command(object_id),
            state_topic: topics.state(object_id),
            payload_on: None,
            payload_off: None,
            min: None,
            max: None,
            step: None,
            mode: None,
            unit_of_measurement: None,
            device: DeviceInfo {
                identifiers: vec![self.node_id.clone()],
                name: "Amplifier",
                model: "amp-bridge",
                sw_version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

/// Discovery node ids may only contain `[a-zA-Z0-9_-]`
fn node_id(base_topic: &str) -> String {
    base_topic
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_node_id_sanitized() {
        let topics = Topics::new("home/living room/amp");
        let discovery = Discovery::new("homeassistant", &topics);
        assert_eq!(discovery.node_id(), "home_living_room_amp");
    }

    #[test]
    fn test_messages_cover_all_entities() {
        let topics = Topics::new("amplifier");
        let discovery = Discovery::new("homeassistant", &topics);
        let messages = discovery.messages(&topics).unwrap();

        let topics: Vec<&str> = messages.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(
            topics,
            [
                "homeassistant/number/amplifier/volume/config",
                "homeassistant/switch/amplifier/mute/config",
                "homeassistant/switch/amplifier/dimmed/config",
                "homeassistant/number/amplifier/source/config",
            ]
        );
    }

    #[test]
    fn test_volume_entity_payload() {
        let topics = Topics::new("amplifier");
        let discovery = Discovery::new("homeassistant", &topics);
        let messages = discovery.messages(&topics).unwrap();
        let volume: Value = serde_json::from_str(&messages[0].payload).unwrap();

        assert_eq!(volume["command_topic"], "amplifier/volume/set");
        assert_eq!(volume["state_topic"], "amplifier/volume/state");
        assert_eq!(volume["min"], -120.0);
        assert_eq!(volume["max"], 20.0);
        assert_eq!(volume["unit_of_measurement"], "dB");
        assert_eq!(volume["unique_id"], "amplifier_volume");
        assert_eq!(volume["device"]["identifiers"][0], "amplifier");
        assert!(volume.get("payload_on").is_none());
    }

    #[test]
    fn test_switch_entity_payload() {
        let topics = Topics::new("amplifier");
        let discovery = Discovery::new("homeassistant", &topics);
        let messages = discovery.messages(&topics).unwrap();
        let mute: Value = serde_json::from_str(&messages[1].payload).unwrap();

        assert_eq!(mute["command_topic"], "amplifier/mute/set");
        assert_eq!(mute["payload_on"], "ON");
        assert_eq!(mute["payload_off"], "OFF");
        assert!(mute.get("min").is_none());
    }
}
