//! Logical commands accepted by the bridge.
//!
//! The HTTP and MQTT surfaces both parse their input into a [`LogicalCommand`]
//! which is then handed to the [`CommandProcessor`](crate::CommandProcessor).

use crate::error::{BridgeError, Result};
use crate::types::{Decibels, SourceId};

/// Direction of a one-decibel volume step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStep {
    Up,
    Down,
}

impl VolumeStep {
    pub fn delta(self) -> Decibels {
        match self {
            VolumeStep::Up => 1.0,
            VolumeStep::Down => -1.0,
        }
    }
}

/// A request to change amplifier state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalCommand {
    /// Step the volume by one decibel
    VolumeDelta(VolumeStep),
    /// Set an absolute volume in decibels
    VolumeSet(Decibels),
    /// Set the mute state
    Mute(bool),
    /// Flip the mute state
    ToggleMute,
    /// Set the dim state
    Dim(bool),
    /// Flip the dim state
    ToggleDim,
    /// Select a source preset
    SourceSet(SourceId),
}

impl LogicalCommand {
    /// Map an HTTP `/volume/<action>` segment to a command
    pub fn from_volume_action(action: &str) -> Result<Self> {
        let command = match action {
            "plus" => LogicalCommand::VolumeDelta(VolumeStep::Up),
            "minus" => LogicalCommand::VolumeDelta(VolumeStep::Down),
            "mute" => LogicalCommand::Mute(true),
            "unmute" => LogicalCommand::Mute(false),
            "togglemute" => LogicalCommand::ToggleMute,
            "dim" => LogicalCommand::Dim(true),
            "undim" => LogicalCommand::Dim(false),
            "toggledim" => LogicalCommand::ToggleDim,
            other => return Err(BridgeError::InvalidCommand(format!("unknown volume action '{other}'"))),
        };
        Ok(command)
    }

    /// Whether a no-op for this command is reported back as "already set"
    /// rather than silently ignored
    pub fn reports_already_set(&self) -> bool {
        matches!(self, LogicalCommand::VolumeSet(_) | LogicalCommand::SourceSet(_))
    }
}

/// Parse a decimal volume such as `-42.5`
pub fn parse_volume(text: &str) -> Result<Decibels> {
    text.trim()
        .parse::<Decibels>()
        .map_err(|_| BridgeError::InvalidValue(format!("'{text}' is not a decimal number")))
}

/// Parse a non-negative source id
pub fn parse_source(text: &str) -> Result<SourceId> {
    text.trim()
        .parse::<SourceId>()
        .map_err(|_| BridgeError::InvalidValue(format!("'{text}' is not a source id")))
}

/// Parse an "on"/"off" switch payload, ignoring case
pub fn parse_switch(text: &str) -> Result<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        Err(BridgeError::InvalidValue(format!("'{text}' is not 'on' or 'off'")))
    }
}
