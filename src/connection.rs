use crate::error::{BridgeError, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Default bound on the handshake and on each write
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outgoing message paired with the channel that reports the write result
type Outgoing = (Message, oneshot::Sender<Result<()>>);

/// Low-level WebSocket connection handler
pub struct Connection {
    /// Channel for sending outgoing messages
    ws_tx: mpsc::UnboundedSender<Outgoing>,
    /// Task draining the read half; aborted on drop so the socket closes
    reader: JoinHandle<()>,
    request_timeout: Duration,
}

impl Connection {
    /// Connect to a WebSocket URL
    ///
    /// Both the handshake and every later write are bounded by `request_timeout`.
    pub async fn connect(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let url = url.into();
        tracing::info!("Connecting to {}", url);

        let (ws_stream, _) = timeout(request_timeout, connect_async(&url))
            .await
            .map_err(|_| BridgeError::Timeout)??;
        let (mut write, mut read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Outgoing>();

        // Spawn task to forward outgoing messages to WebSocket
        let write_handle = tokio::spawn(async move {
            while let Some((msg, done)) = ws_rx.recv().await {
                match write.send(msg).await {
                    Ok(()) => {
                        let _ = done.send(Ok(()));
                    }
                    Err(e) => {
                        tracing::error!("Failed to send message: {}", e);
                        let _ = done.send(Err(BridgeError::WebSocket(e)));
                        break;
                    }
                }
            }
        });

        // The amplifier's replies are not interpreted, only drained
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Binary(bytes)) => {
                        tracing::debug!("Received {} byte frame", bytes.len());
                    }
                    Ok(Message::Text(text)) => {
                        tracing::debug!("Received: {}", text);
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("WebSocket connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // Stopping the writer drops its receiver, which marks the connection closed
            write_handle.abort();
        });

        Ok(Self {
            ws_tx,
            reader,
            request_timeout,
        })
    }

    /// Whether the socket has gone away
    pub fn is_closed(&self) -> bool {
        self.ws_tx.is_closed()
    }

    /// Send a binary message and wait until it has been written to the socket
    pub async fn send_binary(&self, bytes: Vec<u8>) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        tracing::debug!("Sending {} byte frame", bytes.len());

        self.ws_tx
            .send((Message::Binary(bytes), done_tx))
            .map_err(|_| BridgeError::ConnectionClosed)?;

        match timeout(self.request_timeout, done_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::ConnectionClosed),
            Err(_) => Err(BridgeError::Timeout),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The writer ends once `ws_tx` is gone; the reader would otherwise keep
        // the read half open until the amplifier hangs up.
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_handshake_is_bounded() {
        // bound but never accepted: TCP connects, the upgrade never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());

        let started = tokio::time::Instant::now();
        let result = Connection::connect(url, Duration::from_millis(200)).await;

        assert!(matches!(result, Err(BridgeError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }

    #[tokio::test]
    async fn test_drop_closes_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let first = ws.next().await;
            let after_drop = timeout(Duration::from_secs(5), ws.next()).await;
            (first, after_drop)
        });

        let connection = Connection::connect(url, REQUEST_TIMEOUT).await.unwrap();
        connection.send_binary(vec![1, 2, 3]).await.unwrap();
        drop(connection);

        let (first, after_drop) = server.await.unwrap();
        assert!(matches!(first, Some(Ok(Message::Binary(ref b))) if b[..] == [1, 2, 3]));
        // the stream ends, or errors on reset, instead of idling until the timeout
        let after_drop = after_drop.expect("socket stayed open after drop");
        assert!(!matches!(after_drop, Some(Ok(Message::Binary(_)))));
    }
}
