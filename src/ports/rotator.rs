//! Rotator control port trait

use crate::domain::{AzEl, LinkResult};

/// One request/response exchange per call with a rotator-control daemon.
pub trait RotatorLink: Send {
    /// Read the current antenna position
    fn get_pos(&mut self) -> LinkResult<AzEl>;

    /// Command a new antenna position
    fn set_pos(&mut self, pos: AzEl) -> LinkResult<()>;
}
