//! Bridge configuration.
//!
//! Settings come from an optional TOML file named by `AMP_BRIDGE_CONFIG`,
//! then from individual environment variables which take precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the optional config file
pub const CONFIG_PATH_VAR: &str = "AMP_BRIDGE_CONFIG";

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Amplifier connection
    #[serde(default)]
    pub amplifier: AmplifierConfig,
    /// HTTP listener
    #[serde(default)]
    pub http: HttpConfig,
    /// MQTT broker; the MQTT surface is disabled when absent
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Amplifier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmplifierConfig {
    /// Host or host:port of the amplifier's websocket endpoint
    #[serde(default = "default_amplifier_address")]
    pub address: String,
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self { address: default_amplifier_address() }
    }
}

fn default_amplifier_address() -> String {
    "192.168.1.91".to_string()
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5555
}

/// MQTT broker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Base topic for command and state topics
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Home-assistant discovery prefix
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

impl MqttConfig {
    fn with_host(host: String) -> Self {
        Self {
            host,
            port: default_mqtt_port(),
            topic: default_mqtt_topic(),
            client_id: default_client_id(),
            discovery_prefix: default_discovery_prefix(),
        }
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_topic() -> String {
    "amplifier".to_string()
}

fn default_client_id() -> String {
    format!("amp-bridge-{}", uuid::Uuid::new_v4().simple())
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        let file = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => {
                let path = PathBuf::from(path);
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {path:?}"))?;
                Some(content)
            }
            None => None,
        };

        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build configuration from file contents and an environment lookup
    pub fn from_sources(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: Config = match file {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => Config::default(),
        };

        if let Some(address) = env("AMPLIFIER_IP") {
            config.amplifier.address = address;
        }
        if let Some(host) = env("HTTP_HOST") {
            config.http.host = host;
        }
        if let Some(port) = env("HTTP_PORT") {
            config.http.port = parse_port("HTTP_PORT", &port)?;
        }

        if let Some(host) = env("MQTT_HOST") {
            match config.mqtt.as_mut() {
                Some(mqtt) => mqtt.host = host,
                None => config.mqtt = Some(MqttConfig::with_host(host)),
            }
        }
        if let Some(mqtt) = config.mqtt.as_mut() {
            if let Some(port) = env("MQTT_PORT") {
                mqtt.port = parse_port("MQTT_PORT", &port)?;
            }
            if let Some(topic) = env("MQTT_TOPIC") {
                mqtt.topic = topic;
            }
            if let Some(client_id) = env("MQTT_CLIENT_ID") {
                mqtt.client_id = client_id;
            }
            if let Some(prefix) = env("MQTT_DISCOVERY_PREFIX") {
                mqtt.discovery_prefix = prefix;
            }
        }

        if let Some(level) = env("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a port number, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(None, env(&[])).unwrap();
        assert_eq!(config.amplifier.address, "192.168.1.91");
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 5555);
        assert!(config.mqtt.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_enables_mqtt() {
        let config = Config::from_sources(
            None,
            env(&[
                ("AMPLIFIER_IP", "10.0.0.5"),
                ("MQTT_HOST", "broker.local"),
                ("MQTT_TOPIC", "living/amp"),
            ]),
        )
        .unwrap();

        assert_eq!(config.amplifier.address, "10.0.0.5");
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host, "broker.local");
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.topic, "living/amp");
        assert_eq!(mqtt.discovery_prefix, "homeassistant");
        assert!(mqtt.client_id.starts_with("amp-bridge-"));
    }

    #[test]
    fn test_mqtt_overrides_ignored_without_host() {
        let config = Config::from_sources(None, env(&[("MQTT_TOPIC", "amp")])).unwrap();
        assert!(config.mqtt.is_none());
    }

    #[test]
    fn test_file_then_env() {
        let file = r#"
            [amplifier]
            address = "amp.lan"

            [http]
            port = 8080

            [mqtt]
            host = "mqtt.lan"
            client_id = "bridge"

            [logging]
            level = "debug"
        "#;
        let config = Config::from_sources(Some(file), env(&[("HTTP_PORT", "9090")])).unwrap();

        assert_eq!(config.amplifier.address, "amp.lan");
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.http.host, "0.0.0.0");
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host, "mqtt.lan");
        assert_eq!(mqtt.client_id, "bridge");
        assert_eq!(mqtt.topic, "amplifier");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_port_is_error() {
        assert!(Config::from_sources(None, env(&[("HTTP_PORT", "http")])).is_err());
        assert!(Config::from_sources(None, env(&[("HTTP_PORT", "70000")])).is_err());
    }

    #[test]
    fn test_bad_file_is_error() {
        assert!(Config::from_sources(Some("[http]\nport = \"x\""), env(&[])).is_err());
    }
}
