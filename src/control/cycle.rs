//! Radio control cycle
//!
//! Once per tick the controller:
//! 1. forwards AOS/LOS to the daemon on a horizon crossing,
//! 2. reads PTT (if the radio can report it),
//! 3. reads the dial back and adopts any manual retune,
//! 4. otherwise recomputes the Doppler-corrected frequencies and writes
//!    the active one if it moved past the dial threshold, reading the
//!    result back when configured to,
//! 5. disengages itself after too many consecutive I/O failures.
//!
//! Toggle radios (`ToggleAuto`, `ToggleMan`) run the receive side every
//! tick and set the TX VFO only between overs. With a secondary radio
//! configured, the primary handles the downlink and the secondary the
//! uplink.
//!
//! No `LinkError` escapes a tick. Failures become error-count increments and
//! the cycle carries on with cached values.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::{
    ControlSettings, Direction, Frequency, LinkResult, Observation, PassEvent, PttType,
    RadioConfig, RadioType, Transponder,
};
use crate::ports::RadioLink;

use super::link::{LinkState, SyncState};
use super::{BusyGuard, TickOutcome};

/// Downlink sky frequency used until the operator picks one
const DEFAULT_DOWNLINK_HZ: f64 = 145_900_000.0;
/// Uplink sky frequency used until the operator picks one
const DEFAULT_UPLINK_HZ: f64 = 435_100_000.0;

/// A PTT event waits this many times for a running cycle to finish
const PTT_EVENT_ATTEMPTS: u32 = 4;
const PTT_EVENT_RETRY: Duration = Duration::from_millis(100);

/// Which VFO a link is read from and written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vfo {
    Main,
    /// TX VFO of a split or full-duplex radio (`i` / `I`)
    Split,
}

impl Vfo {
    fn read(self, radio: &mut dyn RadioLink) -> LinkResult<Frequency> {
        match self {
            Vfo::Main => radio.get_freq(),
            Vfo::Split => radio.get_split_freq(),
        }
    }

    fn write(self, radio: &mut dyn RadioLink, freq: Frequency) -> LinkResult<()> {
        match self {
            Vfo::Main => radio.set_freq(freq),
            Vfo::Split => radio.set_split_freq(freq),
        }
    }
}

/// Mutable state of one control session. Only the controller mutates it.
#[derive(Debug, Clone)]
pub struct ControlSession {
    pub tracking: bool,
    /// Consecutive I/O failures
    pub error_count: u32,
    /// PTT as seen on the last tick
    pub ptt: bool,
    pub downlink: LinkState,
    pub uplink: LinkState,
    pub transponder: Option<Transponder>,
    pub transponder_lock: bool,
    /// Range-rate of the last observation, km/s
    range_rate: f64,
    prev_elevation: Option<f64>,
    /// Last periodic uplink refresh on a `ToggleAuto` radio
    toggle_tx_last: Option<Instant>,
}

impl ControlSession {
    fn new(config: &RadioConfig, secondary: Option<&RadioConfig>) -> Self {
        let lo_up = secondary.map_or(config.lo_up, |s| s.lo_up);
        Self {
            tracking: true,
            error_count: 0,
            ptt: false,
            downlink: LinkState::new(Direction::Downlink, config.lo_down, DEFAULT_DOWNLINK_HZ),
            uplink: LinkState::new(Direction::Uplink, lo_up, DEFAULT_UPLINK_HZ),
            transponder: None,
            transponder_lock: false,
            range_rate: 0.0,
            prev_elevation: None,
            toggle_tx_last: None,
        }
    }

    fn link(&self, dir: Direction) -> &LinkState {
        match dir {
            Direction::Downlink => &self.downlink,
            Direction::Uplink => &self.uplink,
        }
    }

    fn link_mut(&mut self, dir: Direction) -> &mut LinkState {
        match dir {
            Direction::Downlink => &mut self.downlink,
            Direction::Uplink => &mut self.uplink,
        }
    }

    fn invalidate(&mut self) {
        self.downlink.invalidate();
        self.uplink.invalidate();
    }

    fn forward_all(&mut self) {
        let (rr, tracking) = (self.range_rate, self.tracking);
        self.downlink.forward(rr, tracking);
        self.uplink.forward(rr, tracking);
    }

    /// With the transponder lock on, move the other link so both stay on
    /// the same spot of the passband.
    fn follow_lock(&mut self, moved: Direction) {
        if !self.transponder_lock {
            return;
        }
        let Some(trsp) = &self.transponder else {
            return;
        };
        let followed = match moved {
            Direction::Downlink => trsp.uplink_for_downlink(self.downlink.sat_freq),
            Direction::Uplink => trsp.downlink_for_uplink(self.uplink.sat_freq),
        };
        if let Some(sat) = followed {
            let (rr, tracking) = (self.range_rate, self.tracking);
            self.link_mut(moved.other()).retune(sat, rr, tracking);
        }
    }

    /// Put both links in the middle of the selected transponder's passbands.
    fn tune_to_transponder(&mut self) {
        let Some(trsp) = &self.transponder else {
            return;
        };
        let (down, up) = (trsp.downlink_center(), trsp.uplink_center());
        if let Some(hz) = down {
            self.downlink.sat_freq = hz;
        }
        if let Some(hz) = up {
            self.uplink.sat_freq = hz;
        }
        self.invalidate();
        self.forward_all();
    }
}

/// Display snapshot of one link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStatus {
    pub sat_freq: f64,
    pub radio_freq: f64,
    pub doppler_shift_hz: f64,
    pub last_commanded: f64,
    pub sync: SyncState,
}

/// Display snapshot of the whole session, published after every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlStatus {
    pub engaged: bool,
    pub tracking: bool,
    pub error_count: u32,
    pub ptt: bool,
    pub transponder: Option<String>,
    pub transponder_lock: bool,
    pub downlink: LinkStatus,
    pub uplink: LinkStatus,
}

/// Drives one radio, or a receiver/transmitter pair. Safe to share between
/// the ticking thread and readers.
pub struct RadioController {
    config: RadioConfig,
    /// Transmitter of a dual-rig station; the primary then only receives
    secondary: Option<RadioConfig>,
    settings: ControlSettings,
    session: Mutex<ControlSession>,
    /// Outside the session lock so a disengage lands before the next write,
    /// even mid-cycle
    engaged: AtomicBool,
    busy: AtomicBool,
}

impl RadioController {
    pub fn new(config: RadioConfig, settings: ControlSettings) -> Self {
        Self::with_secondary(config, None, settings)
    }

    /// Controller for a station that may have a separate uplink radio.
    pub fn with_secondary(
        config: RadioConfig,
        secondary: Option<RadioConfig>,
        settings: ControlSettings,
    ) -> Self {
        let session = ControlSession::new(&config, secondary.as_ref());
        Self {
            config,
            secondary,
            settings,
            session: Mutex::new(session),
            engaged: AtomicBool::new(false),
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn secondary(&self) -> Option<&RadioConfig> {
        self.secondary.as_ref()
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, ControlSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// Start driving the radio. Both links write on the next tick.
    pub fn engage(&self) {
        let mut session = self.lock();
        session.invalidate();
        session.error_count = 0;
        session.toggle_tx_last = None;
        self.engaged.store(true, Ordering::SeqCst);
        log::info!("Radio '{}' engaged", self.config.name);
    }

    pub fn disengage(&self) {
        if self.engaged.swap(false, Ordering::SeqCst) {
            log::info!("Radio '{}' disengaged", self.config.name);
        }
    }

    pub fn set_tracking(&self, tracking: bool) {
        let mut session = self.lock();
        if session.tracking != tracking {
            session.tracking = tracking;
            session.invalidate();
            session.forward_all();
        }
    }

    /// Operator entry of a downlink sky frequency
    pub fn set_downlink(&self, sat_freq_hz: f64) {
        self.set_sat_freq(Direction::Downlink, sat_freq_hz);
    }

    /// Operator entry of an uplink sky frequency
    pub fn set_uplink(&self, sat_freq_hz: f64) {
        self.set_sat_freq(Direction::Uplink, sat_freq_hz);
    }

    fn set_sat_freq(&self, dir: Direction, hz: f64) {
        let mut session = self.lock();
        let (rr, tracking) = (session.range_rate, session.tracking);
        session.link_mut(dir).retune(hz, rr, tracking);
        session.follow_lock(dir);
    }

    /// Select a transponder (or none) and tune to the middle of it.
    pub fn select_transponder(&self, transponder: Option<Transponder>) {
        let mut session = self.lock();
        match &transponder {
            Some(t) => log::info!("Transponder '{}' selected", t.name),
            None => log::info!("Transponder cleared"),
        }
        if !transponder.as_ref().is_some_and(Transponder::is_lockable) {
            session.transponder_lock = false;
        }
        session.transponder = transponder;
        session.tune_to_transponder();
    }

    /// Lock uplink and downlink together. Refused for transponders
    /// without both passbands.
    pub fn set_transponder_lock(&self, lock: bool) {
        let mut session = self.lock();
        if lock && !session.transponder.as_ref().is_some_and(Transponder::is_lockable) {
            log::warn!("Current transponder cannot be locked");
            session.transponder_lock = false;
            return;
        }
        session.transponder_lock = lock;
        if lock {
            session.follow_lock(Direction::Downlink);
        }
    }

    pub fn tune_transponder(&self) {
        self.lock().tune_to_transponder();
    }

    /// New target: the radio state no longer matches anything we sent.
    pub fn select_target(&self) {
        let mut session = self.lock();
        session.invalidate();
        session.prev_elevation = None;
    }

    /// Declare that the radio already holds `hz` on the given link.
    pub fn assume_commanded(&self, dir: Direction, hz: f64) {
        self.lock().link_mut(dir).assume_commanded(hz);
    }

    /// Copy of the session state
    pub fn session(&self) -> ControlSession {
        self.lock().clone()
    }

    pub fn status(&self) -> ControlStatus {
        self.snapshot(&self.lock())
    }

    fn snapshot(&self, session: &ControlSession) -> ControlStatus {
        let threshold = self.settings.dial_threshold_hz;
        let link = |l: &LinkState| LinkStatus {
            sat_freq: l.sat_freq,
            radio_freq: l.radio_freq,
            doppler_shift_hz: l.doppler_shift(),
            last_commanded: l.last_commanded,
            sync: l.sync_state(threshold),
        };
        ControlStatus {
            engaged: self.is_engaged(),
            tracking: session.tracking,
            error_count: session.error_count,
            ptt: session.ptt,
            transponder: session.transponder.as_ref().map(|t| t.name.clone()),
            transponder_lock: session.transponder_lock,
            downlink: link(&session.downlink),
            uplink: link(&session.uplink),
        }
    }

    /// Run one control cycle against `radio` for the target at `obs`.
    pub fn tick(&self, radio: &mut dyn RadioLink, obs: &Observation) -> TickOutcome<ControlStatus> {
        self.tick_with(radio, None, obs)
    }

    /// Run one control cycle, driving the uplink through `secondary` when
    /// a secondary radio is configured.
    pub fn tick_with(
        &self,
        radio: &mut dyn RadioLink,
        secondary: Option<&mut dyn RadioLink>,
        obs: &Observation,
    ) -> TickOutcome<ControlStatus> {
        let Some(_busy) = BusyGuard::try_begin(&self.busy) else {
            log::warn!("Radio cycle for '{}' missed the deadline", self.config.name);
            return TickOutcome::Skipped;
        };

        let mut session = self.lock();
        session.range_rate = obs.range_rate_km_s;
        let event = self.pass_event(&mut session, obs.elevation_deg);
        if let Some(event) = event {
            signal_event(&self.config, radio, event);
        }

        match (&self.secondary, secondary) {
            (Some(second), Some(link2)) => {
                if let Some(event) = event {
                    signal_event(second, link2, event);
                }
                self.dual_cycle(&mut session, radio, link2);
            }
            (Some(second), None) => {
                log::debug!("No link to '{}', running '{}' alone", second.name, self.config.name);
                self.single_cycle(&mut session, radio);
            }
            (None, _) => self.single_cycle(&mut session, radio),
        }

        self.check_errors(&mut session);
        TickOutcome::Completed(self.snapshot(&session))
    }

    /// Operator PTT on a toggle radio: when receiving, set the uplink and
    /// key the transmitter; when transmitting, unkey.
    pub fn ptt_event(&self, radio: &mut dyn RadioLink) -> TickOutcome<ControlStatus> {
        let Some(_busy) = self.wait_idle() else {
            log::error!("Radio '{}' stayed busy, PTT event not handled", self.config.name);
            return TickOutcome::Skipped;
        };

        let mut session = self.lock();
        if !self.is_engaged() {
            log::info!("Radio '{}' not engaged, PTT event ignored", self.config.name);
            return TickOutcome::Completed(self.snapshot(&session));
        }

        let query = match self.config.ptt {
            PttType::Dcd => radio.get_dcd(),
            PttType::None | PttType::Cat => radio.get_ptt(),
        };
        let key = match query {
            Ok(keyed) => !keyed,
            Err(e) => {
                log::warn!("PTT query failed, event dropped: {e}");
                session.error_count += 1;
                self.check_errors(&mut session);
                return TickOutcome::Completed(self.snapshot(&session));
            }
        };

        if key {
            log::debug!("PTT off: setting uplink and keying");
            self.toggle_tx(&mut session, radio, false);
        } else {
            log::debug!("PTT on: unkeying");
        }
        match radio.set_ptt(key) {
            Ok(()) => session.ptt = key,
            Err(e) => {
                log::warn!("Failed to set PTT: {e}");
                session.error_count += 1;
            }
        }

        self.check_errors(&mut session);
        TickOutcome::Completed(self.snapshot(&session))
    }

    fn wait_idle(&self) -> Option<BusyGuard<'_>> {
        for attempt in 1..=PTT_EVENT_ATTEMPTS {
            if let Some(guard) = BusyGuard::try_begin(&self.busy) {
                return Some(guard);
            }
            if attempt < PTT_EVENT_ATTEMPTS {
                thread::sleep(PTT_EVENT_RETRY);
            }
        }
        None
    }

    fn check_errors(&self, s: &mut ControlSession) {
        if s.error_count >= self.settings.error_threshold {
            log::error!(
                "Radio '{}': {} consecutive I/O errors, disengaging",
                self.config.name,
                s.error_count
            );
            self.engaged.store(false, Ordering::SeqCst);
            s.error_count = 0;
        }
    }

    fn single_cycle(&self, s: &mut ControlSession, radio: &mut dyn RadioLink) {
        match self.config.radio_type {
            RadioType::Rx => {
                let ptt = self.read_ptt(s, radio, false);
                self.step_link(s, radio, Direction::Downlink, Vfo::Main, !ptt);
            }
            RadioType::Tx => {
                let ptt = self.read_ptt(s, radio, true);
                self.step_link(s, radio, Direction::Uplink, Vfo::Main, ptt);
            }
            RadioType::Trx => {
                // Single VFO: follow whichever direction the radio is in
                let ptt = self.read_ptt(s, radio, false);
                let dir = if ptt { Direction::Uplink } else { Direction::Downlink };
                self.step_link(s, radio, dir, Vfo::Main, true);
            }
            RadioType::Duplex => {
                s.ptt = false;
                self.step_link(s, radio, Direction::Downlink, Vfo::Main, true);
                self.step_link(s, radio, Direction::Uplink, Vfo::Split, true);
            }
            RadioType::ToggleAuto | RadioType::ToggleMan => {
                let ptt = self.read_ptt(s, radio, false);
                self.step_link(s, radio, Direction::Downlink, Vfo::Main, !ptt);
                if self.config.radio_type == RadioType::ToggleAuto && self.toggle_tx_due(s) {
                    // No PTT source: treat the radio as keyed
                    let keyed = !(self.is_engaged() && self.config.ptt_capable()) || ptt;
                    self.toggle_tx(s, radio, keyed);
                }
            }
        }
    }

    /// Receiver on `radio`, transmitter on `second`. A dial change on one
    /// side moves the other; otherwise both track.
    fn dual_cycle(
        &self,
        s: &mut ControlSession,
        radio: &mut dyn RadioLink,
        second: &mut dyn RadioLink,
    ) {
        s.ptt = false;
        if self.step_link(s, radio, Direction::Downlink, Vfo::Main, true) {
            let (rr, tracking) = (s.range_rate, s.tracking);
            s.uplink.forward(rr, tracking);
            self.push_link(s, second, Direction::Uplink, Vfo::Main);
        } else if self.step_link(s, second, Direction::Uplink, Vfo::Main, true) {
            let (rr, tracking) = (s.range_rate, s.tracking);
            s.downlink.forward(rr, tracking);
            self.push_link(s, radio, Direction::Downlink, Vfo::Main);
        }
    }

    fn toggle_tx_due(&self, s: &mut ControlSession) -> bool {
        let interval = self.settings.toggle_tx_interval();
        if s.toggle_tx_last.is_some_and(|last| last.elapsed() < interval) {
            return false;
        }
        s.toggle_tx_last = Some(Instant::now());
        true
    }

    /// Set the TX VFO of a toggle radio. Nothing happens while keyed, and
    /// there is no dial feedback on this side.
    fn toggle_tx(&self, s: &mut ControlSession, radio: &mut dyn RadioLink, keyed: bool) {
        if keyed {
            return;
        }
        let (rr, tracking) = (s.range_rate, s.tracking);
        let hz = s.uplink.forward(rr, tracking);
        if !self.is_engaged()
            || (s.uplink.last_written - hz).abs() < self.settings.toggle_tx_threshold_hz
        {
            return;
        }
        match radio.set_split_freq(Frequency::hz(hz)) {
            Ok(()) => s.error_count = 0,
            Err(e) => {
                log::debug!("Toggle uplink write of {hz:.0} Hz failed: {e}");
                s.error_count += 1;
            }
        }
        // Recorded even when the write failed
        s.uplink.assume_commanded(hz);
    }

    /// PTT for this tick. `idle_default` is assumed when the radio cannot
    /// report PTT or the session is disengaged. A failed query counts as an
    /// error and reads as "not transmitting".
    fn read_ptt(&self, s: &mut ControlSession, radio: &mut dyn RadioLink, idle_default: bool) -> bool {
        let ptt = if !self.is_engaged() {
            idle_default
        } else {
            let query = match self.config.ptt {
                PttType::None => None,
                PttType::Cat => Some(radio.get_ptt()),
                PttType::Dcd => Some(radio.get_dcd()),
            };
            match query {
                None => idle_default,
                Some(Ok(ptt)) => ptt,
                Some(Err(e)) => {
                    log::debug!("PTT query failed: {e}");
                    s.error_count += 1;
                    false
                }
            }
        };
        s.ptt = ptt;
        ptt
    }

    /// Dial feedback, then forward tracking, for one direction.
    /// `io_ok` gates every radio read and write on this link.
    /// Returns whether a dial change was adopted.
    fn step_link(
        &self,
        s: &mut ControlSession,
        radio: &mut dyn RadioLink,
        dir: Direction,
        vfo: Vfo,
        io_ok: bool,
    ) -> bool {
        let threshold = self.settings.dial_threshold_hz;
        let (rr, tracking) = (s.range_rate, s.tracking);

        if self.is_engaged() && !s.link(dir).is_idle() {
            let last = s.link(dir).last_commanded;
            let read = if io_ok {
                match vfo.read(radio) {
                    Ok(freq) => freq.as_hz(),
                    Err(e) => {
                        log::debug!("{dir} dial read failed: {e}");
                        s.error_count += 1;
                        last
                    }
                }
            } else {
                last
            };

            if s.link(dir).dial_changed(read, threshold) {
                log::info!("{dir} dial moved to {read:.0} Hz");
                s.link_mut(dir).apply_dial(read, rr, tracking);
                s.follow_lock(dir);
                return true;
            }
        }

        s.forward_all();
        if io_ok {
            self.push_link(s, radio, dir, vfo);
        }
        false
    }

    /// Write `radio_freq` if the radio no longer holds it.
    fn push_link(&self, s: &mut ControlSession, radio: &mut dyn RadioLink, dir: Direction, vfo: Vfo) {
        if !(self.is_engaged() && s.link(dir).needs_write(self.settings.dial_threshold_hz)) {
            return;
        }
        let hz = s.link(dir).radio_freq;
        if let Err(e) = vfo.write(radio, Frequency::hz(hz)) {
            log::debug!("{dir} write of {hz:.0} Hz failed: {e}");
            s.error_count += 1;
            return;
        }
        s.error_count = 0;
        if !self.settings.readback_after_write {
            s.link_mut(dir).commit();
            return;
        }
        match vfo.read(radio) {
            Ok(held) => s.link_mut(dir).commit_with_readback(held.as_hz()),
            Err(e) => {
                log::debug!("{dir} read-back after write failed: {e}");
                s.link_mut(dir).commit();
            }
        }
    }

    /// Horizon crossing since the last tick, if any. Only reported while
    /// engaged and tracking.
    fn pass_event(&self, s: &mut ControlSession, elevation: f64) -> Option<PassEvent> {
        let prev = s.prev_elevation.replace(elevation)?;
        if !(self.is_engaged() && s.tracking) {
            return None;
        }
        if prev < 0.0 && elevation >= 0.0 {
            Some(PassEvent::Aos)
        } else if prev >= 0.0 && elevation < 0.0 {
            Some(PassEvent::Los)
        } else {
            None
        }
    }
}

/// Forward a pass event to one radio if its profile asks for it.
fn signal_event(config: &RadioConfig, radio: &mut dyn RadioLink, event: PassEvent) {
    let wanted = match event {
        PassEvent::Aos => config.signal_aos,
        PassEvent::Los => config.signal_los,
    };
    if !wanted {
        return;
    }
    log::info!("{event:?} on '{}'", config.name);
    if let Err(e) = radio.signal(event) {
        log::warn!("Failed to signal {event:?} to '{}': {e}", config.name);
    }
}
