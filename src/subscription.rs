use crate::error::{BridgeError, Result};
use crate::types::StateSnapshot;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Receives the full state after every effective change
#[async_trait]
pub trait SyncPublisher: Send + Sync {
    async fn publish(&self, snapshot: &StateSnapshot) -> Result<()>;
}

/// Publisher that fans snapshots out over a broadcast channel
///
/// Consumers (the MQTT bridge, tests) hold a [`StateReceiver`]. Publishing with
/// no receivers attached is not an error.
pub struct ChannelPublisher {
    tx: broadcast::Sender<StateSnapshot>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to state snapshots
    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.tx.subscribe())
    }
}

#[async_trait]
impl SyncPublisher for ChannelPublisher {
    async fn publish(&self, snapshot: &StateSnapshot) -> Result<()> {
        if self.tx.send(*snapshot).is_err() {
            tracing::debug!("No state subscribers, snapshot dropped");
        }
        Ok(())
    }
}

/// Receiver for state snapshots
pub struct StateReceiver {
    rx: broadcast::Receiver<StateSnapshot>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateSnapshot>) -> Self {
        Self { rx }
    }

    /// Receive the next snapshot
    ///
    /// A lagging receiver gets a `ChannelError`; it can keep receiving, and the
    /// next snapshot carries the full state anyway.
    pub async fn recv(&mut self) -> Result<StateSnapshot> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => BridgeError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                BridgeError::ChannelError(format!("Lagged by {} snapshots", n))
            }
        })
    }

    /// Try to receive a snapshot without blocking
    ///
    /// Returns `None` if no snapshot is available.
    pub fn try_recv(&mut self) -> Result<Option<StateSnapshot>> {
        match self.rx.try_recv() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(BridgeError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(BridgeError::ChannelError(format!("Lagged by {} snapshots", n)))
            }
        }
    }
}
