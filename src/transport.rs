use crate::error::Result;
use crate::protocol::Frame;
use async_trait::async_trait;

/// Something that can deliver frames to the amplifier
///
/// `send` may block on connecting and writing. It returns once the frame has
/// been written or the attempt has failed; no reply is awaited.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, frame: Frame) -> Result<()>;
}
