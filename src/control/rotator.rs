//! Antenna rotator control cycle
//!
//! Same shape as the radio cycle: compute a set-point, read the rotator
//! position, command a move only when either axis is off by more than the
//! tolerance, and disengage after too many failed ticks.
//!
//! While a target is up the rotator is sent ahead of it: the controller
//! bisects for the furthest future time whose position is still within
//! tolerance of the current set-point, so the antenna waits for the
//! satellite instead of chasing it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::domain::{clamp_period_ms, AzEl, AzType, ControlSettings, PassWindow, RotatorConfig};
use crate::ports::{RotatorLink, Tracker};

use super::{BusyGuard, TickOutcome};

/// How far ahead to lead when no pass window is known, seconds
const DEFAULT_LEAD_WINDOW_S: f64 = 1200.0;

/// Bring `az` into `[min, max]` by whole turns.
fn wrap_azimuth(mut az: f64, min: f64, max: f64) -> f64 {
    if !az.is_finite() || max - min < 360.0 {
        return az;
    }
    while az > max {
        az -= 360.0;
    }
    while az < min {
        az += 360.0;
    }
    az
}

/// A pass is flipped when following it on a rotator with the given azimuth
/// convention and end stop would swing the antenna through the stop, i.e.
/// consecutive azimuths jump by more than half a turn once wrapped into the
/// usable range.
pub fn is_flipped_pass(pass: &PassWindow, az_type: AzType, az_stop_pos: f64) -> bool {
    let (min, max) = az_type.range();
    let offset = az_stop_pos - min;
    let (min, max) = (min + offset, max + offset);

    let interior = pass
        .azimuths
        .get(1..pass.azimuths.len().saturating_sub(1))
        .unwrap_or(&[]);

    let mut flipped = false;
    let mut last = wrap_azimuth(pass.aos_az, min, max);
    for &az in interior.iter().chain(std::iter::once(&pass.los_az)) {
        let az = wrap_azimuth(az, min, max);
        if (az - last).abs() > 180.0 {
            flipped = true;
        }
        last = az;
    }
    flipped
}

#[derive(Debug, Clone)]
pub struct RotatorSession {
    pub tracking: bool,
    pub error_count: u32,
    /// Where the antenna is being sent
    pub set_point: AzEl,
    /// Last position read back, if the last read succeeded
    pub position: Option<AzEl>,
    /// Target position as seen on the last tick, before any mapping
    pub target: Option<AzEl>,
    pass: Option<PassWindow>,
    flipped: bool,
}

impl RotatorSession {
    fn new() -> Self {
        Self {
            tracking: true,
            error_count: 0,
            set_point: AzEl::new(0.0, 0.0),
            position: None,
            target: None,
            pass: None,
            flipped: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotatorStatus {
    pub engaged: bool,
    pub tracking: bool,
    pub error_count: u32,
    pub set_point: AzEl,
    pub position: Option<AzEl>,
    pub target: Option<AzEl>,
    pub flipped: bool,
}

pub struct RotatorController {
    config: RotatorConfig,
    settings: ControlSettings,
    session: Mutex<RotatorSession>,
    /// Cycle period the worker is running at, ms; sets the lead-ahead resolution
    cycle_period_ms: AtomicU64,
    engaged: AtomicBool,
    busy: AtomicBool,
}

impl RotatorController {
    pub fn new(config: RotatorConfig, settings: ControlSettings) -> Self {
        let cycle_period_ms = AtomicU64::new(clamp_period_ms(settings.cycle_period_ms));
        Self {
            config,
            settings,
            session: Mutex::new(RotatorSession::new()),
            cycle_period_ms,
            engaged: AtomicBool::new(false),
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RotatorConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, RotatorSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms.load(Ordering::Relaxed))
    }

    /// Follow a change of the worker's tick period.
    pub fn set_cycle_period(&self, period: Duration) {
        let ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self.cycle_period_ms
            .store(clamp_period_ms(ms), Ordering::Relaxed);
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    pub fn engage(&self) {
        self.lock().error_count = 0;
        self.engaged.store(true, Ordering::SeqCst);
        log::info!("Rotator '{}' engaged", self.config.name);
    }

    pub fn disengage(&self) {
        if self.engaged.swap(false, Ordering::SeqCst) {
            log::info!("Rotator '{}' disengaged", self.config.name);
        }
    }

    pub fn set_tracking(&self, tracking: bool) {
        self.lock().tracking = tracking;
    }

    /// Manual set-point, used while not tracking
    pub fn set_position(&self, pos: AzEl) {
        self.lock().set_point = self.clamp(pos);
    }

    /// New target: forget the cached pass.
    pub fn select_target(&self) {
        let mut session = self.lock();
        session.pass = None;
        session.flipped = false;
    }

    pub fn session(&self) -> RotatorSession {
        self.lock().clone()
    }

    pub fn status(&self) -> RotatorStatus {
        self.snapshot(&self.lock())
    }

    fn snapshot(&self, s: &RotatorSession) -> RotatorStatus {
        RotatorStatus {
            engaged: self.is_engaged(),
            tracking: s.tracking,
            error_count: s.error_count,
            set_point: s.set_point,
            position: s.position,
            target: s.target,
            flipped: s.flipped,
        }
    }

    fn clamp(&self, pos: AzEl) -> AzEl {
        let c = &self.config;
        AzEl::new(
            pos.az.max(c.min_az).min(c.max_az),
            pos.el.max(c.min_el).min(c.max_el),
        )
    }

    /// Map a sky position onto this rotator: flip over the zenith for
    /// flipped passes, then fit the azimuth convention.
    fn map_position(&self, pos: AzEl, flipped: bool) -> AzEl {
        let c = &self.config;
        let AzEl { mut az, mut el } = pos;
        if flipped && c.supports_flip() {
            el = 180.0 - el;
            az = if az > 180.0 { az - 180.0 } else { az + 180.0 };
            az = wrap_azimuth(az, c.min_az, c.max_az);
        }
        if c.az_type == AzType::Az180 && az > 180.0 {
            az -= 360.0;
        }
        AzEl::new(az, el)
    }

    /// Keep the cached pass current. An expired pass is kept until the
    /// tracker offers a newer one so the LOS azimuth stays available.
    fn refresh_pass(&self, s: &mut RotatorSession, tracker: &dyn Tracker, t: f64) {
        let stale = s.pass.as_ref().map_or(true, |p| t > p.los);
        if !stale {
            return;
        }
        if let Some(pass) = tracker.next_pass(t) {
            s.flipped = is_flipped_pass(&pass, self.config.az_type, self.config.stop_position());
            if s.flipped {
                log::info!("Upcoming pass on '{}' is flipped", self.config.name);
            }
            s.pass = Some(pass);
        }
    }

    /// Set-point for the target at `t`, before any lead-ahead.
    fn tracking_set_point(&self, s: &RotatorSession, target: AzEl, t: f64) -> AzEl {
        let sky = if target.el >= 0.0 {
            Some(target)
        } else {
            match &s.pass {
                Some(p) if t < p.aos => Some(AzEl::new(p.aos_az, 0.0)),
                Some(p) if t > p.los => Some(AzEl::new(p.los_az, 0.0)),
                _ => None,
            }
        };
        match sky {
            Some(pos) => self.map_position(pos, s.flipped),
            // Below the horizon with no usable pass: stay put
            None => s.set_point,
        }
    }

    /// Bisect for a future point of the pass still within tolerance of `set_point`.
    fn lead_target(&self, s: &RotatorSession, tracker: &dyn Tracker, set_point: AzEl, t: f64) -> AzEl {
        let tolerance = self.settings.rotator_tolerance_deg;
        let period = self.cycle_period().as_secs_f64();

        let mut time_delta = s
            .pass
            .as_ref()
            .filter(|p| p.los > t)
            .map_or(DEFAULT_LEAD_WINDOW_S, |p| p.los - t);
        let mut step = (time_delta / 2.0).max(period);
        let mut ahead = set_point;

        while step > period / 4.0 {
            let obs = tracker.observe(t + time_delta);
            ahead = self.map_position(AzEl::new(obs.azimuth_deg, obs.elevation_deg), s.flipped);
            let out_of_reach = ahead.el < 0.0
                || ahead.el > 180.0
                || (set_point.az - ahead.az).abs() > tolerance
                || (set_point.el - ahead.el).abs() > tolerance;
            if out_of_reach {
                time_delta -= step;
            } else {
                time_delta += step;
            }
            step /= 2.0;
        }

        AzEl::new(ahead.az, ahead.el.clamp(0.0, 180.0))
    }

    /// Run one rotator cycle for the tracker's target at time `t`.
    pub fn tick(
        &self,
        rotator: &mut dyn RotatorLink,
        tracker: &dyn Tracker,
        t: f64,
    ) -> TickOutcome<RotatorStatus> {
        let Some(_busy) = BusyGuard::try_begin(&self.busy) else {
            log::warn!("Rotator cycle for '{}' missed the deadline", self.config.name);
            return TickOutcome::Skipped;
        };

        let mut session = self.lock();
        let obs = tracker.observe(t);
        let target = AzEl::new(obs.azimuth_deg, obs.elevation_deg);
        session.target = Some(target);
        self.refresh_pass(&mut session, tracker, t);

        let mut set_point = if session.tracking {
            self.tracking_set_point(&session, target, t)
        } else {
            session.set_point
        };

        if self.is_engaged() {
            let mut failed = false;
            let current = match rotator.get_pos() {
                Ok(pos) => {
                    session.position = Some(pos);
                    pos
                }
                Err(e) => {
                    log::debug!("Rotator position read failed: {e}");
                    session.position = None;
                    failed = true;
                    AzEl::new(0.0, 0.0)
                }
            };

            let tolerance = self.settings.rotator_tolerance_deg;
            if (set_point.az - current.az).abs() > tolerance
                || (set_point.el - current.el).abs() > tolerance
            {
                if session.tracking && target.el > 0.0 {
                    set_point = self.lead_target(&session, tracker, set_point, t);
                }
                set_point = self.clamp(set_point);
                if let Err(e) = rotator.set_pos(set_point) {
                    log::debug!("Rotator move failed: {e}");
                    failed = true;
                }
            }

            if failed {
                session.error_count += 1;
                if session.error_count >= self.settings.error_threshold {
                    log::error!(
                        "Rotator '{}': {} consecutive failed cycles, disengaging",
                        self.config.name,
                        session.error_count
                    );
                    self.engaged.store(false, Ordering::SeqCst);
                    session.error_count = 0;
                }
            } else {
                session.error_count = 0;
            }
        } else {
            session.position = None;
        }

        session.set_point = self.clamp(set_point);
        TickOutcome::Completed(self.snapshot(&session))
    }
}
