//! Core domain types

use serde::{Deserialize, Serialize};

/// Frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(pub f64);

impl Frequency {
    pub fn hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn khz(khz: f64) -> Self {
        Self(khz * 1_000.0)
    }

    pub fn mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }
}

/// Capability class of the physical radio. Selects the control cycle variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadioType {
    /// Receiver only; drives the downlink
    Rx,
    /// Transmitter only; drives the uplink
    Tx,
    /// Half-duplex transceiver with a single VFO
    Trx,
    /// Full-duplex transceiver with independent RX/TX VFOs
    Duplex,
    /// FT-817/857/897 style split radio: the TX VFO can only be set while
    /// receiving. Uplink is refreshed periodically between overs.
    #[serde(rename = "toggle_auto")]
    ToggleAuto,
    /// As `ToggleAuto`, but the uplink is only set on an operator PTT event
    #[serde(rename = "toggle_man")]
    ToggleMan,
}

impl RadioType {
    pub fn is_toggle(self) -> bool {
        matches!(self, RadioType::ToggleAuto | RadioType::ToggleMan)
    }
}

/// How (and whether) transmit status can be read back from the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PttType {
    /// Don't read PTT
    #[default]
    None,
    /// Read PTT with the `t` command
    Cat,
    /// Read PTT via the DCD query
    Dcd,
}

/// Link direction, relative to the ground station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Downlink,
    Uplink,
}

impl Direction {
    /// Range-rate to feed the Doppler model for this direction.
    ///
    /// The uplink is pre-compensated, so its shift has the opposite sign
    /// of the downlink shift for the same geometry.
    pub fn effective_range_rate(self, range_rate_km_s: f64) -> f64 {
        match self {
            Direction::Downlink => range_rate_km_s,
            Direction::Uplink => -range_rate_km_s,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Direction::Downlink => Direction::Uplink,
            Direction::Uplink => Direction::Downlink,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Downlink => write!(f, "downlink"),
            Direction::Uplink => write!(f, "uplink"),
        }
    }
}

/// Horizon crossing notifications that can be forwarded to the radio daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassEvent {
    Aos,
    Los,
}

/// Target geometry at one instant, as seen from the ground station
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Azimuth in degrees
    pub azimuth_deg: f64,
    /// Elevation in degrees
    pub elevation_deg: f64,
    /// Slant range in km
    pub range_km: f64,
    /// Range-rate in km/s, positive when receding
    pub range_rate_km_s: f64,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            azimuth_deg: 0.0,
            elevation_deg: -90.0,
            range_km: 0.0,
            range_rate_km_s: 0.0,
        }
    }
}

/// Antenna pointing, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzEl {
    pub az: f64,
    pub el: f64,
}

impl AzEl {
    pub fn new(az: f64, el: f64) -> Self {
        Self { az, el }
    }
}

/// One visibility window of the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassWindow {
    /// Acquisition of signal, seconds on the tracker's time scale
    pub aos: f64,
    /// Loss of signal, same time scale as `aos`
    pub los: f64,
    pub aos_az: f64,
    pub los_az: f64,
    /// Azimuth samples between AOS and LOS, in time order
    #[serde(default)]
    pub azimuths: Vec<f64>,
}
