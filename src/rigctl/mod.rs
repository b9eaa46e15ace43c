//! rigctld/rotctld command layer.
//!
//! This module separates the three concerns of talking to a hamlib-style
//! control daemon:
//! - `encode`: translate RigctlCommand → wire bytes (pure, no I/O)
//! - `decode`: translate reply text → RigctlReply (pure, no I/O)
//! - `session`: one TCP connection per command, with timeouts
//!
//! Only the small subset of the protocol the control loops need is covered.

pub mod decode;
pub mod encode;
pub mod session;

pub use decode::decode;
pub use encode::encode;
pub use session::RigctlSession;

use crate::domain::AzEl;

/// Commands understood by rigctld (radio) and rotctld (rotator).
#[derive(Debug, PartialEq, Clone)]
pub enum RigctlCommand {
    // PTT
    GetPtt,
    GetDcd,
    /// `T 1` / `T 0`
    SetPtt(bool),
    // Main VFO
    GetFreq,
    /// Hz; sent as `F %10.0f`
    SetFreq(f64),
    // Split (TX) VFO
    GetSplitFreq,
    SetSplitFreq(f64),
    // Pass notifications
    Aos,
    Los,
    // Rotator
    GetPos,
    SetPos(AzEl),
}

impl RigctlCommand {
    /// Whether the daemon's reply is read back. PTT and frequency writes and
    /// pass notifications are fire-and-forget.
    pub fn expects_reply(&self) -> bool {
        use RigctlCommand::*;
        !matches!(self, SetPtt(_) | SetFreq(_) | SetSplitFreq(_) | Aos | Los)
    }
}

/// Parsed replies.
#[derive(Debug, PartialEq, Clone)]
pub enum RigctlReply {
    Ptt(bool),
    FrequencyHz(f64),
    Position(AzEl),
    /// `RPRT n` status code; 0 means success
    Report(i32),
    /// Command written, no reply expected
    Sent,
}
