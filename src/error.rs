use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while bridging commands to the amplifier
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Unrecognized action name or command topic
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Command value could not be parsed
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Value is outside the encodable domain (NaN, infinity)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Frame was not confirmed as written in time
    #[error("Send timeout")]
    Timeout,

    /// MQTT client request could not be queued
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl BridgeError {
    /// Whether the error happened while handing a frame to the amplifier
    pub fn is_transmission(&self) -> bool {
        matches!(
            self,
            BridgeError::WebSocket(_) | BridgeError::ConnectionClosed | BridgeError::Timeout
        )
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidCommand(_) | BridgeError::InvalidValue(_) | BridgeError::Encoding(_)
        )
    }
}
