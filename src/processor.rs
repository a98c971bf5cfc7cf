use crate::command::LogicalCommand;
use crate::error::Result;
use crate::protocol::{self, FrameKind};
use crate::state::{DeviceState, Field, Mutation};
use crate::subscription::SyncPublisher;
use crate::transport::Transport;
use crate::types::StateSnapshot;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What a command did to the amplifier state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    /// State changed and a frame was sent
    Applied(StateSnapshot),
    /// The requested volume or source was already selected
    AlreadySet(StateSnapshot),
    /// Nothing to do; not reported to the caller as anything special
    Unchanged(StateSnapshot),
}

impl CommandOutcome {
    pub fn snapshot(&self) -> StateSnapshot {
        match *self {
            CommandOutcome::Applied(snapshot)
            | CommandOutcome::AlreadySet(snapshot)
            | CommandOutcome::Unchanged(snapshot) => snapshot,
        }
    }
}

/// Single entry point for state changes
///
/// The `CommandProcessor` owns the [`DeviceState`], decides whether a command
/// needs a frame, hands the frame to the [`Transport`] and then publishes the
/// full snapshot. It is shared between the HTTP and MQTT surfaces.
pub struct CommandProcessor {
    state: DeviceState,
    transport: Arc<dyn Transport>,
    publisher: Arc<dyn SyncPublisher>,
    /// Held from mutation through publish so frames leave in mutation order
    dispatch: Mutex<()>,
}

impl CommandProcessor {
    /// Create a processor starting from the default state
    pub fn new(transport: Arc<dyn Transport>, publisher: Arc<dyn SyncPublisher>) -> Self {
        Self::with_state(StateSnapshot::default(), transport, publisher)
    }

    /// Create a processor starting from a known state
    pub fn with_state(
        initial: StateSnapshot,
        transport: Arc<dyn Transport>,
        publisher: Arc<dyn SyncPublisher>,
    ) -> Self {
        Self {
            state: DeviceState::new(initial),
            transport,
            publisher,
            dispatch: Mutex::new(()),
        }
    }

    /// Get a snapshot of the current state
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Apply a command and, when it changed something, transmit and publish
    ///
    /// A transmission failure is returned after the snapshot has been
    /// published; the state keeps the requested value.
    pub async fn execute(&self, command: LogicalCommand) -> Result<CommandOutcome> {
        if let LogicalCommand::VolumeSet(target) = command {
            protocol::check_volume(target)?;
        }

        let _dispatch = self.dispatch.lock().await;

        let (field, snapshot) = match self.state.apply(command) {
            Mutation::Changed { field, snapshot } => (field, snapshot),
            Mutation::Unchanged(snapshot) => {
                tracing::debug!(?command, "State already matches, nothing sent");
                return Ok(if command.reports_already_set() {
                    CommandOutcome::AlreadySet(snapshot)
                } else {
                    CommandOutcome::Unchanged(snapshot)
                });
            }
        };

        let frame = frame_kind(field, &snapshot).encode()?;
        tracing::debug!(selector = frame.selector(), payload = %frame.payload(), "Sending frame");

        let sent = self.transport.send(frame).await;
        if let Err(e) = &sent {
            tracing::error!(?command, "Failed to send frame to amplifier: {}", e);
        }

        if let Err(e) = self.publisher.publish(&snapshot).await {
            tracing::warn!("Failed to publish state: {}", e);
        }

        sent?;
        Ok(CommandOutcome::Applied(snapshot))
    }
}

fn frame_kind(field: Field, snapshot: &StateSnapshot) -> FrameKind {
    match field {
        Field::Volume => FrameKind::Volume(snapshot.volume),
        Field::Mute => FrameKind::Mute(snapshot.muted),
        Field::Dim => FrameKind::Dim(snapshot.dimmed),
        Field::Source => FrameKind::Source(snapshot.source),
    }
}
