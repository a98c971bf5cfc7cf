//! Control bridge for websocket-controlled audio processors
//!
//! This library turns simple commands (HTTP requests and MQTT messages) into the
//! binary frames an amplifier expects on its `ws://<address>/ws` endpoint, and
//! mirrors the resulting state back out over MQTT. It provides:
//!
//! - Byte-exact frame encoding for volume, mute, dim and source changes
//! - An authoritative in-memory state with clamping and no-op suppression
//! - A command processor shared by the HTTP and MQTT surfaces
//! - Home-assistant MQTT discovery
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use amp_bridge::{Amplifier, ChannelPublisher, CommandProcessor, LogicalCommand, VolumeStep};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let amplifier = Arc::new(Amplifier::new("192.168.1.91"));
//!     let publisher = Arc::new(ChannelPublisher::new(16));
//!     let mut states = publisher.subscribe();
//!
//!     let processor = CommandProcessor::new(amplifier, publisher);
//!     processor.execute(LogicalCommand::VolumeDelta(VolumeStep::Up)).await?;
//!
//!     let snapshot = states.recv().await?;
//!     println!("Volume is now {} dB", snapshot.volume);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Protocol**: frame layout and the selector table
//! - **State**: the lock-guarded device model
//! - **Processor**: decide, encode, transmit, publish
//! - **Amplifier/Connection**: the websocket [`Transport`]
//! - **Subscription**: the [`SyncPublisher`] seam and snapshot broadcast
//! - **Http/Mqtt/Discovery**: the outer surfaces

mod amplifier;
mod command;
mod connection;
mod discovery;
mod error;
mod processor;
mod protocol;
mod state;
mod subscription;
mod transport;
mod types;

pub mod config;
pub mod http;
pub mod mqtt;

// Public exports
pub use amplifier::Amplifier;
pub use command::{parse_source, parse_switch, parse_volume, LogicalCommand, VolumeStep};
pub use discovery::{Discovery, DiscoveryMessage};
pub use error::{BridgeError, Result};
pub use processor::{CommandOutcome, CommandProcessor};
pub use protocol::{
    check_volume, encode, format_volume, integer_digit_count, Frame, FrameKind, PRESET_PATH,
    VOLUME_PATH,
};
pub use state::{DeviceState, Field, Mutation};
pub use subscription::{ChannelPublisher, StateReceiver, SyncPublisher};
pub use transport::Transport;
pub use types::{
    clamp_volume, Decibels, SourceId, StateSnapshot, DEFAULT_SOURCE, DEFAULT_VOLUME, MAX_VOLUME,
    MIN_VOLUME,
};
