//! Tracker adapters that need no orbit propagator.
//!
//! - `StaticTracker`: frozen geometry, for bench tests and the CLI's
//!   fixed range-rate mode
//! - `SyntheticPass`: a symmetric overhead-style pass, for demos against
//!   the mock adapters

use std::f64::consts::PI;

use crate::domain::{Observation, PassWindow};
use crate::ports::Tracker;

/// Number of azimuth samples kept in a synthetic pass window
const PASS_SAMPLES: usize = 32;

/// Fixed geometry, optionally with a fixed pass window.
#[derive(Debug, Clone, Default)]
pub struct StaticTracker {
    observation: Observation,
    pass: Option<PassWindow>,
}

impl StaticTracker {
    pub fn new(observation: Observation) -> Self {
        Self {
            observation,
            pass: None,
        }
    }

    /// Overhead target with the given range-rate
    pub fn with_range_rate(range_rate_km_s: f64) -> Self {
        Self::new(Observation {
            azimuth_deg: 180.0,
            elevation_deg: 45.0,
            range_km: 1000.0,
            range_rate_km_s,
        })
    }

    pub fn with_pass(mut self, pass: PassWindow) -> Self {
        self.pass = Some(pass);
        self
    }
}

impl Tracker for StaticTracker {
    fn observe(&self, _t: f64) -> Observation {
        self.observation
    }

    fn next_pass(&self, t: f64) -> Option<PassWindow> {
        self.pass.clone().filter(|p| p.los >= t)
    }
}

/// A repeating pass: the target rises at `aos_az`, culminates at `max_el`
/// half-way, and sets at `los_az`. Range-rate sweeps linearly from
/// approaching to receding.
#[derive(Debug, Clone)]
pub struct SyntheticPass {
    /// Time of the first AOS
    pub start: f64,
    /// Seconds above the horizon
    pub duration: f64,
    /// Seconds between LOS and the next AOS
    pub gap: f64,
    pub aos_az: f64,
    pub los_az: f64,
    pub max_el: f64,
    /// Range-rate magnitude at the horizon, km/s
    pub max_range_rate: f64,
}

impl SyntheticPass {
    pub fn starting_at(start: f64) -> Self {
        Self {
            start,
            duration: 600.0,
            gap: 120.0,
            aos_az: 20.0,
            los_az: 160.0,
            max_el: 60.0,
            max_range_rate: 7.0,
        }
    }

    fn period(&self) -> f64 {
        self.duration + self.gap
    }

    /// Start of the pass in progress at `t`, or of the next one
    fn pass_start(&self, t: f64) -> f64 {
        if t < self.start {
            return self.start;
        }
        let n = ((t - self.start) / self.period()).floor();
        let current = self.start + n * self.period();
        if t <= current + self.duration {
            current
        } else {
            current + self.period()
        }
    }

    fn azimuth_at(&self, frac: f64) -> f64 {
        self.aos_az + (self.los_az - self.aos_az) * frac
    }
}

impl Tracker for SyntheticPass {
    fn observe(&self, t: f64) -> Observation {
        let aos = self.pass_start(t);
        let frac = (t - aos) / self.duration;
        if !(0.0..=1.0).contains(&frac) {
            return Observation {
                azimuth_deg: self.aos_az,
                elevation_deg: -10.0,
                range_km: 3000.0,
                range_rate_km_s: -self.max_range_rate,
            };
        }
        Observation {
            azimuth_deg: self.azimuth_at(frac),
            elevation_deg: self.max_el * (PI * frac).sin(),
            range_km: 500.0 + 2000.0 * (2.0 * frac - 1.0).abs(),
            range_rate_km_s: self.max_range_rate * (2.0 * frac - 1.0),
        }
    }

    fn next_pass(&self, t: f64) -> Option<PassWindow> {
        let aos = self.pass_start(t);
        let azimuths = (0..PASS_SAMPLES)
            .map(|i| self.azimuth_at(i as f64 / (PASS_SAMPLES - 1) as f64))
            .collect();
        Some(PassWindow {
            aos,
            los: aos + self.duration,
            aos_az: self.aos_az,
            los_az: self.los_az,
            azimuths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_tracker_ignores_time() {
        let tracker = StaticTracker::with_range_rate(-3.5);
        assert_eq!(tracker.observe(0.0), tracker.observe(1e9));
        assert_eq!(tracker.observe(0.0).range_rate_km_s, -3.5);
        assert!(tracker.next_pass(0.0).is_none());
    }

    #[test]
    fn static_pass_expires_after_los() {
        let pass = PassWindow {
            aos: 100.0,
            los: 200.0,
            aos_az: 10.0,
            los_az: 90.0,
            azimuths: vec![],
        };
        let tracker = StaticTracker::default().with_pass(pass);
        assert!(tracker.next_pass(150.0).is_some());
        assert!(tracker.next_pass(250.0).is_none());
    }

    #[test]
    fn synthetic_pass_culminates_half_way() {
        let pass = SyntheticPass::starting_at(1000.0);
        let top = pass.observe(1300.0);
        assert!((top.elevation_deg - 60.0).abs() < 1e-9);
        assert!(top.range_rate_km_s.abs() < 1e-9);
        assert!(pass.observe(1010.0).range_rate_km_s < 0.0);
        assert!(pass.observe(1590.0).range_rate_km_s > 0.0);
    }

    #[test]
    fn synthetic_pass_is_below_horizon_in_the_gap() {
        let pass = SyntheticPass::starting_at(0.0);
        assert!(pass.observe(650.0).elevation_deg < 0.0);
        let next = pass.next_pass(650.0).unwrap();
        assert_eq!(next.aos, 720.0);
        assert_eq!(next.los, 1320.0);
        assert_eq!(next.azimuths.len(), PASS_SAMPLES);
    }
}
