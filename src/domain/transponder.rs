//! Satellite transponder passbands and uplink/downlink locking

use serde::{Deserialize, Serialize};

/// A transponder's passbands. Beacons have no uplink (both limits zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transponder {
    pub name: String,
    #[serde(default)]
    pub uplink_low: f64,
    #[serde(default)]
    pub uplink_high: f64,
    pub downlink_low: f64,
    pub downlink_high: f64,
    /// Inverting transponders map the bottom of the uplink to the top of the downlink
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub mode: Option<String>,
}

impl Transponder {
    /// Both passbands are usable, so uplink and downlink can follow each other.
    pub fn is_lockable(&self) -> bool {
        self.downlink_low > 0.0 && self.uplink_low > 0.0
    }

    pub fn has_downlink(&self) -> bool {
        self.downlink_low > 0.0 && self.downlink_high > 0.0
    }

    pub fn has_uplink(&self) -> bool {
        self.uplink_low > 0.0 && self.uplink_high > 0.0
    }

    /// Uplink sky frequency that lands on `downlink` through this transponder.
    pub fn uplink_for_downlink(&self, downlink: f64) -> Option<f64> {
        if !self.is_lockable() {
            return None;
        }
        let delta = downlink - self.downlink_low;
        Some(if self.invert {
            self.uplink_high - delta
        } else {
            self.uplink_low + delta
        })
    }

    /// Downlink sky frequency produced by transmitting on `uplink`.
    pub fn downlink_for_uplink(&self, uplink: f64) -> Option<f64> {
        if !self.is_lockable() {
            return None;
        }
        let delta = uplink - self.uplink_low;
        Some(if self.invert {
            self.downlink_high - delta
        } else {
            self.downlink_low + delta
        })
    }

    pub fn downlink_center(&self) -> Option<f64> {
        self.has_downlink()
            .then(|| self.downlink_low + (self.downlink_high - self.downlink_low).abs() / 2.0)
    }

    pub fn uplink_center(&self) -> Option<f64> {
        self.has_uplink()
            .then(|| self.uplink_low + (self.uplink_high - self.uplink_low).abs() / 2.0)
    }
}
