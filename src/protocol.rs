//! Binary framing used by the amplifier's websocket endpoint.
//!
//! Every frame is laid out as
//!
//! ```text
//! [00 00 00] [selector] [03 00 00 00] [terminator] [path] [json body]
//! ```
//!
//! The selector and terminator bytes are fixed per command kind. They are kept
//! as a table rather than computed so that frames stay byte-identical to what
//! the device firmware was observed to accept.

use crate::error::{BridgeError, Result};
use crate::types::{Decibels, SourceId};
use serde_json::json;

const FRAME_PREFIX: [u8; 3] = [0x00, 0x00, 0x00];
const FRAME_MARKER: [u8; 4] = [0x03, 0x00, 0x00, 0x00];

/// Property endpoint for volume, mute and dim
pub const VOLUME_PATH: &str = "/optimizer/volume/";

/// Property endpoint for the active source preset
pub const PRESET_PATH: &str = "/metapresets/current/";

const VOLUME_TERMINATOR: u8 = 0x12;
const PRESET_TERMINATOR: u8 = 0x15;

const SET_VOLUME: u8 = 0x35;
const MUTE_ON: u8 = 0x24;
const MUTE_OFF: u8 = 0x25;
const DIM_ON: u8 = 0x23;
const DIM_OFF: u8 = 0x24;
const SOURCE_SINGLE_DIGIT: u8 = 0x22;
const SOURCE_MULTI_DIGIT: u8 = 0x23;

/// Characters shared by the integer and fractional parts of a volume
const VOLUME_CHAR_BUDGET: usize = 18;

/// Offset of the selector byte within a frame
const SELECTOR_OFFSET: usize = FRAME_PREFIX.len();
/// Offset of the terminator byte within a frame
const TERMINATOR_OFFSET: usize = SELECTOR_OFFSET + 1 + FRAME_MARKER.len();

/// One encoded message for the amplifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn selector(&self) -> u8 {
        self.bytes[SELECTOR_OFFSET]
    }

    pub fn terminator(&self) -> u8 {
        self.bytes[TERMINATOR_OFFSET]
    }

    /// Path followed by body, as text
    pub fn payload(&self) -> String {
        String::from_utf8_lossy(&self.bytes[TERMINATOR_OFFSET + 1..]).into_owned()
    }
}

/// Assemble a frame from its raw parts
pub fn encode(selector: u8, terminator: u8, path: &str, body: &str) -> Frame {
    let mut bytes = Vec::with_capacity(
        FRAME_PREFIX.len() + FRAME_MARKER.len() + 2 + path.len() + body.len(),
    );
    bytes.extend_from_slice(&FRAME_PREFIX);
    bytes.push(selector);
    bytes.extend_from_slice(&FRAME_MARKER);
    bytes.push(terminator);
    bytes.extend_from_slice(path.as_bytes());
    bytes.extend_from_slice(body.as_bytes());
    Frame { bytes }
}

/// A property write the amplifier understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameKind {
    Volume(Decibels),
    Mute(bool),
    Dim(bool),
    Source(SourceId),
}

impl FrameKind {
    pub fn selector(&self) -> u8 {
        match *self {
            FrameKind::Volume(_) => SET_VOLUME,
            FrameKind::Mute(true) => MUTE_ON,
            FrameKind::Mute(false) => MUTE_OFF,
            FrameKind::Dim(true) => DIM_ON,
            FrameKind::Dim(false) => DIM_OFF,
            FrameKind::Source(id) if id < 10 => SOURCE_SINGLE_DIGIT,
            FrameKind::Source(_) => SOURCE_MULTI_DIGIT,
        }
    }

    pub fn terminator(&self) -> u8 {
        match self {
            FrameKind::Source(_) => PRESET_TERMINATOR,
            _ => VOLUME_TERMINATOR,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            FrameKind::Source(_) => PRESET_PATH,
            _ => VOLUME_PATH,
        }
    }

    /// Minified JSON body for this write
    pub fn body(&self) -> Result<String> {
        let body = match *self {
            // serde_json would print -60.0, the device wants the padded form
            FrameKind::Volume(volume) => format!("{{\"volume\":{}}}", format_volume(volume)?),
            FrameKind::Mute(mute) => json!({ "mute": mute }).to_string(),
            FrameKind::Dim(dim) => json!({ "dim": dim }).to_string(),
            FrameKind::Source(id) => json!({ "id": id }).to_string(),
        };
        Ok(body)
    }

    pub fn encode(&self) -> Result<Frame> {
        let body = self.body()?;
        Ok(encode(self.selector(), self.terminator(), self.path(), &body))
    }
}

/// Reject volumes that cannot be represented on the wire
pub fn check_volume(volume: Decibels) -> Result<Decibels> {
    if volume.is_finite() {
        Ok(volume)
    } else {
        Err(BridgeError::Encoding(format!("volume {volume} is not a finite number")))
    }
}

/// Number of characters before the decimal point when `volume` is printed,
/// including the minus sign.
///
/// `-120` counts 4, `-9.5` counts 2, `0` counts 1, `19.999` counts 2. Values in
/// (-1, 0) print as `-0.x` and count 2. Negative zero counts as zero.
pub fn integer_digit_count(volume: Decibels) -> usize {
    let digits = format!("{:.0}", volume.trunc().abs()).len();
    if volume < 0.0 {
        digits + 1
    } else {
        digits
    }
}

/// Fixed-point rendering whose integer and fractional characters add up to 18
pub fn format_volume(volume: Decibels) -> Result<String> {
    let volume = check_volume(volume)?;
    // -0.0 would print as "-0"
    let volume = if volume == 0.0 { 0.0 } else { volume };
    let precision = VOLUME_CHAR_BUDGET.saturating_sub(integer_digit_count(volume));
    Ok(format!("{volume:.precision$}"))
}
