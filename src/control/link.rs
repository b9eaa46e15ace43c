//! Per-direction frequency state (downlink or uplink)
//!
//! Tracks the sky frequency the operator wants, the radio frequency that
//! corresponds to it right now, the last value written to the radio, and
//! the value the radio reported holding afterwards. The two can differ on
//! radios with a coarse tuning step: write suppression compares against the
//! former, dial feedback against the latter.

use serde::Serialize;

use crate::domain::Direction;

use super::doppler;

/// Where a link stands relative to the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Nothing has been written yet (or sync was invalidated)
    Idle,
    /// The radio holds `radio_freq` to within the dial threshold
    Synced,
    /// `radio_freq` has moved away from what the radio holds
    Dirty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    pub direction: Direction,
    /// Transverter LO for this direction
    pub lo: f64,
    pub sat_freq: f64,
    pub radio_freq: f64,
    /// What the radio holds as far as we know: read back after a write,
    /// or the written value itself. 0 when idle.
    pub last_commanded: f64,
    /// Last value sent to the radio, before any tuning-step rounding
    pub last_written: f64,
    /// Range-rate used for the most recent conversion, as fed to the model
    range_rate: f64,
}

impl LinkState {
    pub fn new(direction: Direction, lo: f64, sat_freq: f64) -> Self {
        Self {
            direction,
            lo,
            sat_freq,
            radio_freq: sat_freq - lo,
            last_commanded: 0.0,
            last_written: 0.0,
            range_rate: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.last_commanded == 0.0
    }

    pub fn sync_state(&self, threshold_hz: f64) -> SyncState {
        if self.is_idle() {
            SyncState::Idle
        } else if (self.radio_freq - self.last_written).abs() > threshold_hz {
            SyncState::Dirty
        } else {
            SyncState::Synced
        }
    }

    /// Forget what the radio holds; the next forward step will write.
    pub fn invalidate(&mut self) {
        self.last_commanded = 0.0;
        self.last_written = 0.0;
    }

    /// Treat `hz` as already on the radio.
    pub fn assume_commanded(&mut self, hz: f64) {
        self.last_commanded = hz;
        self.last_written = hz;
    }

    /// A dial read that disagrees with the last commanded value.
    /// Never true while idle.
    pub fn dial_changed(&self, read_hz: f64, threshold_hz: f64) -> bool {
        !self.is_idle() && (read_hz - self.last_commanded).abs() > threshold_hz
    }

    /// Adopt a hand-dialed radio frequency and derive the sky frequency from it.
    pub fn apply_dial(&mut self, read_hz: f64, range_rate_km_s: f64, tracking: bool) {
        let rr = self.direction.effective_range_rate(range_rate_km_s);
        self.range_rate = rr;
        self.radio_freq = read_hz;
        self.assume_commanded(read_hz);
        self.sat_freq = doppler::to_sky_freq(read_hz, self.lo, rr, tracking);
    }

    /// Recompute `radio_freq` from `sat_freq` for the current geometry.
    pub fn forward(&mut self, range_rate_km_s: f64, tracking: bool) -> f64 {
        let rr = self.direction.effective_range_rate(range_rate_km_s);
        self.range_rate = rr;
        self.radio_freq = doppler::to_radio_freq(self.sat_freq, self.lo, rr, tracking);
        self.radio_freq
    }

    /// Set a new sky frequency (operator entry or transponder lock)
    pub fn retune(&mut self, sat_freq: f64, range_rate_km_s: f64, tracking: bool) {
        self.sat_freq = sat_freq;
        self.forward(range_rate_km_s, tracking);
    }

    pub fn needs_write(&self, threshold_hz: f64) -> bool {
        self.sync_state(threshold_hz) != SyncState::Synced
    }

    /// Record a successful write of `radio_freq`.
    pub fn commit(&mut self) {
        self.assume_commanded(self.radio_freq);
    }

    /// Record a successful write of `radio_freq` after which the radio
    /// reported holding `read_hz`.
    pub fn commit_with_readback(&mut self, read_hz: f64) {
        self.last_written = self.radio_freq;
        self.last_commanded = read_hz;
    }

    /// Shift currently applied, for display
    pub fn doppler_shift(&self) -> f64 {
        doppler::doppler_shift(self.sat_freq, self.range_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.99;

    #[test]
    fn new_link_is_idle_and_needs_a_write() {
        let link = LinkState::new(Direction::Downlink, 0.0, 145_900_000.0);
        assert_eq!(link.sync_state(THRESHOLD), SyncState::Idle);
        assert!(link.needs_write(THRESHOLD));
        assert!(!link.dial_changed(145_000_000.0, THRESHOLD));
    }

    #[test]
    fn half_hertz_drift_stays_synced() {
        let mut link = LinkState::new(Direction::Downlink, 0.0, 145_000_000.0);
        link.assume_commanded(145_000_000.0);
        link.radio_freq = 145_000_000.5;
        assert_eq!(link.sync_state(THRESHOLD), SyncState::Synced);
        link.radio_freq = 145_000_001.5;
        assert_eq!(link.sync_state(THRESHOLD), SyncState::Dirty);
    }

    #[test]
    fn commit_syncs() {
        let mut link = LinkState::new(Direction::Downlink, 0.0, 145_890_000.0);
        link.forward(2.0, true);
        link.commit();
        assert_eq!(link.sync_state(THRESHOLD), SyncState::Synced);
        link.invalidate();
        assert_eq!(link.sync_state(THRESHOLD), SyncState::Idle);
    }

    #[test]
    fn uplink_shift_has_opposite_sign() {
        let mut down = LinkState::new(Direction::Downlink, 0.0, 435_000_000.0);
        let mut up = LinkState::new(Direction::Uplink, 0.0, 435_000_000.0);
        let d = down.forward(5.0, true);
        let u = up.forward(5.0, true);
        assert!(d < 435_000_000.0);
        assert!(u > 435_000_000.0);
        assert!(down.doppler_shift() < 0.0);
        assert!(up.doppler_shift() > 0.0);
    }

    #[test]
    fn apply_dial_inverts_forward() {
        let mut link = LinkState::new(Direction::Uplink, 116_000_000.0, 435_100_000.0);
        let radio = link.forward(-4.0, true);
        let mut other = LinkState::new(Direction::Uplink, 116_000_000.0, 0.0);
        other.apply_dial(radio, -4.0, true);
        assert!((other.sat_freq - 435_100_000.0).abs() < 1e-6);
        assert_eq!(other.last_commanded, radio);
    }

    #[test]
    fn quantised_readback_is_not_a_dial_change() {
        let mut link = LinkState::new(Direction::Downlink, 0.0, 145_890_000.0);
        link.forward(7.5, true);
        let written = link.radio_freq;
        // 10 Hz tuning step
        let held = (written / 10.0).round() * 10.0;
        link.commit_with_readback(held);

        assert!(!link.dial_changed(held, THRESHOLD));
        assert!(!link.needs_write(THRESHOLD));
        assert_eq!(link.last_written, written);
        assert_eq!(link.last_commanded, held);
        assert!(link.dial_changed(held + 10.0, THRESHOLD));
    }
}
