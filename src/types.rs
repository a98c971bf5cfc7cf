use serde::Serialize;

/// Volume value in decibels
pub type Decibels = f64;

/// Preset/source identifier on the amplifier
pub type SourceId = u32;

/// Lowest volume the amplifier accepts
pub const MIN_VOLUME: Decibels = -120.0;

/// Highest volume the amplifier accepts
pub const MAX_VOLUME: Decibels = 20.0;

/// Volume applied at startup
pub const DEFAULT_VOLUME: Decibels = -60.0;

/// Source selected at startup
pub const DEFAULT_SOURCE: SourceId = 1;

/// Clamp a requested volume into the amplifier's range
pub fn clamp_volume(volume: Decibels) -> Decibels {
    volume.clamp(MIN_VOLUME, MAX_VOLUME)
}

/// Point-in-time copy of the amplifier state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub volume: Decibels,
    pub muted: bool,
    pub dimmed: bool,
    pub source: SourceId,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            muted: false,
            dimmed: false,
            source: DEFAULT_SOURCE,
        }
    }
}

impl StateSnapshot {
    /// "ON"/"OFF" rendering used by state topics
    pub fn muted_label(&self) -> &'static str {
        on_off(self.muted)
    }

    pub fn dimmed_label(&self) -> &'static str {
        on_off(self.dimmed)
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}
