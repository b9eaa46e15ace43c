//! Radio control port trait

use crate::domain::{Frequency, LinkResult, PassEvent};

/// One request/response exchange per call with a radio-control daemon.
///
/// Implementations may reconnect on every call; the control loop makes
/// no assumption about connection reuse.
pub trait RadioLink: Send {
    /// Query PTT with the CAT `t` command. `true` only when the radio reports 1.
    fn get_ptt(&mut self) -> LinkResult<bool>;

    /// Query PTT through the data-carrier-detect line
    fn get_dcd(&mut self) -> LinkResult<bool>;

    /// Key or unkey the transmitter. No reply is read.
    fn set_ptt(&mut self, on: bool) -> LinkResult<()>;

    /// Get the current (main/RX) VFO frequency
    fn get_freq(&mut self) -> LinkResult<Frequency>;

    /// Set the current (main/RX) VFO frequency. No reply is read.
    fn set_freq(&mut self, freq: Frequency) -> LinkResult<()>;

    /// Get the split (TX) VFO frequency of a full-duplex radio
    fn get_split_freq(&mut self) -> LinkResult<Frequency>;

    /// Set the split (TX) VFO frequency of a full-duplex radio
    fn set_split_freq(&mut self, freq: Frequency) -> LinkResult<()>;

    /// Forward an AOS/LOS notification to the daemon
    fn signal(&mut self, event: PassEvent) -> LinkResult<()>;
}
