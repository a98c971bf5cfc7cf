use crate::connection::{Connection, REQUEST_TIMEOUT};
use crate::error::Result;
use crate::protocol::Frame;
use crate::transport::Transport;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

/// Connection to the amplifier's websocket endpoint
///
/// The socket is opened on the first send and reused afterwards. A failed send
/// drops it so that the next command starts from a fresh connection; nothing
/// is retried. Connecting and writing are each bounded by the request timeout.
pub struct Amplifier {
    address: String,
    url: String,
    request_timeout: Duration,
    connection: Mutex<Option<Connection>>,
}

impl Amplifier {
    /// Create a transport for the amplifier at `address` (host or host:port)
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_timeout(address, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(address: impl Into<String>, request_timeout: Duration) -> Self {
        let address = address.into();
        let url = format!("ws://{}/ws", address);

        Self {
            address,
            url,
            request_timeout,
            connection: Mutex::new(None),
        }
    }

    /// Get the amplifier's address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Get the websocket URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for Amplifier {
    async fn send(&self, frame: Frame) -> Result<()> {
        let mut slot = self.connection.lock().await;

        let connection = match slot.take() {
            Some(connection) if !connection.is_closed() => connection,
            _ => Connection::connect(self.url.as_str(), self.request_timeout).await?,
        };

        connection.send_binary(frame.into_bytes()).await?;
        *slot = Some(connection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_address() {
        let amplifier = Amplifier::new("192.168.1.91");
        assert_eq!(amplifier.address(), "192.168.1.91");
        assert_eq!(amplifier.url(), "ws://192.168.1.91/ws");

        let amplifier = Amplifier::new("amp.local:8080");
        assert_eq!(amplifier.url(), "ws://amp.local:8080/ws");
    }

    #[tokio::test]
    async fn test_unreachable_amplifier_is_transmission_error() {
        // port 9 on localhost is not expected to accept websocket upgrades
        let amplifier = Amplifier::new("127.0.0.1:9");
        let frame = crate::protocol::FrameKind::Mute(true).encode().unwrap();
        let err = amplifier.send(frame).await.unwrap_err();
        assert!(err.is_transmission(), "{err:?}");
    }

    #[tokio::test]
    async fn test_silent_amplifier_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let amplifier = Amplifier::with_timeout(
            listener.local_addr().unwrap().to_string(),
            Duration::from_millis(200),
        );
        let frame = crate::protocol::FrameKind::Mute(true).encode().unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), amplifier.send(frame))
            .await
            .expect("send was not bounded");

        assert!(matches!(result, Err(crate::error::BridgeError::Timeout)));
        assert!(amplifier.connection.lock().await.is_none());
    }
}
