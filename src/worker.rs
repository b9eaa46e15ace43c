//! Control worker: runs the radio and rotator cycles off the caller's thread
//!
//! Architecture: the worker thread owns the daemon links (one radio, or a
//! receiver/transmitter pair, plus an optional rotator) and the tracker.
//! Callers talk to it through two crossbeam channels:
//! - commands in (`ControlCommand`), handled between ticks
//! - status out (`StationStatus`), one snapshot per completed tick
//!
//! Ticks come from `crossbeam_channel::tick`, so a slow daemon delays the
//! next tick instead of stacking them up. The controllers themselves are
//! shared (`Arc`) and also refuse overlapping cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender, TrySendError};
use serde::Serialize;

use crate::control::{ControlStatus, RadioController, RotatorController, RotatorStatus};
use crate::domain::{clamp_period_ms, AzEl, SatctlError, SatctlResult, Transponder};
use crate::ports::{RadioLink, RotatorLink, Tracker};

/// Status snapshots buffered for a slow reader before new ones are dropped
const STATUS_BACKLOG: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCommand {
    Engage,
    Disengage,
    SetTracking(bool),
    /// Downlink sky frequency, Hz
    SetDownlink(f64),
    /// Uplink sky frequency, Hz
    SetUplink(f64),
    SelectTransponder(Option<Transponder>),
    SetTransponderLock(bool),
    TuneTransponder,
    /// Operator PTT on a toggle radio: set the uplink and key, or unkey
    PttEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RotatorCommand {
    Engage,
    Disengage,
    SetTracking(bool),
    SetPosition(AzEl),
}

pub enum ControlCommand {
    Radio(RadioCommand),
    Rotator(RotatorCommand),
    /// Swap the target geometry source
    SelectTarget(Box<dyn Tracker>),
    /// New cycle period in ms, clamped into the accepted range
    SetPeriod(u64),
    Shutdown,
}

impl std::fmt::Debug for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlCommand::Radio(cmd) => f.debug_tuple("Radio").field(cmd).finish(),
            ControlCommand::Rotator(cmd) => f.debug_tuple("Rotator").field(cmd).finish(),
            ControlCommand::SelectTarget(_) => f.write_str("SelectTarget(..)"),
            ControlCommand::SetPeriod(ms) => f.debug_tuple("SetPeriod").field(ms).finish(),
            ControlCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Published after every completed tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationStatus {
    /// Unix time the tick ran for
    pub time: f64,
    pub radio: ControlStatus,
    pub rotator: Option<RotatorStatus>,
}

/// A radio controller together with the link(s) it drives
pub struct RadioUnit {
    pub controller: Arc<RadioController>,
    pub link: Box<dyn RadioLink>,
    /// Uplink radio of a dual-rig station
    pub secondary: Option<Box<dyn RadioLink>>,
}

impl RadioUnit {
    pub fn new(controller: Arc<RadioController>, link: Box<dyn RadioLink>) -> Self {
        Self {
            controller,
            link,
            secondary: None,
        }
    }
}

/// A rotator controller together with the link it drives
pub struct RotatorUnit {
    pub controller: Arc<RotatorController>,
    pub link: Box<dyn RotatorLink>,
}

fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Handle to the running control thread. Dropping it stops the thread.
pub struct ControlWorker {
    commands: Sender<ControlCommand>,
    status: Receiver<StationStatus>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ControlWorker {
    pub fn spawn(
        radio: RadioUnit,
        rotator: Option<RotatorUnit>,
        tracker: Box<dyn Tracker>,
        period: Duration,
    ) -> SatctlResult<Self> {
        let (cmd_tx, cmd_rx) = unbounded();
        let (status_tx, status_rx) = bounded(STATUS_BACKLOG);
        let running = Arc::new(AtomicBool::new(true));

        let worker = WorkerLoop {
            radio,
            rotator,
            tracker,
            status_tx,
        };

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("satctl-control".into())
                .spawn(move || worker.run(cmd_rx, period, running))
                .map_err(|e| SatctlError::Worker(format!("Failed to spawn control thread: {e}")))?
        };

        Ok(Self {
            commands: cmd_tx,
            status: status_rx,
            running,
            handle: Some(handle),
        })
    }

    pub fn send(&self, cmd: ControlCommand) -> SatctlResult<()> {
        self.commands
            .send(cmd)
            .map_err(|_| SatctlError::Worker("Control thread has stopped".into()))
    }

    pub fn radio(&self, cmd: RadioCommand) -> SatctlResult<()> {
        self.send(ControlCommand::Radio(cmd))
    }

    pub fn rotator(&self, cmd: RotatorCommand) -> SatctlResult<()> {
        self.send(ControlCommand::Rotator(cmd))
    }

    /// Status stream, one item per completed tick
    pub fn status(&self) -> &Receiver<StationStatus> {
        &self.status
    }

    /// Most recent snapshot, discarding older queued ones
    pub fn latest_status(&self) -> Option<StationStatus> {
        self.status.try_iter().last()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(&mut self) -> SatctlResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // A send error means the thread is already gone; join anyway
        let _ = self.commands.send(ControlCommand::Shutdown);
        handle
            .join()
            .map_err(|_| SatctlError::Worker("Control thread panicked".into()))
    }
}

impl Drop for ControlWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("{e}");
        }
    }
}

/// State owned by the control thread
struct WorkerLoop {
    radio: RadioUnit,
    rotator: Option<RotatorUnit>,
    tracker: Box<dyn Tracker>,
    status_tx: Sender<StationStatus>,
}

impl WorkerLoop {
    fn run(mut self, commands: Receiver<ControlCommand>, period: Duration, running: Arc<AtomicBool>) {
        log::info!("Control thread started, period {} ms", period.as_millis());
        let mut ticker = tick(period);
        let mut stop = false;

        while !stop {
            let mut new_period = None;
            select! {
                recv(commands) -> msg => match msg {
                    Ok(ControlCommand::Shutdown) | Err(_) => stop = true,
                    Ok(ControlCommand::SetPeriod(ms)) => {
                        new_period = Some(Duration::from_millis(clamp_period_ms(ms)));
                    }
                    Ok(cmd) => self.apply(cmd),
                },
                recv(ticker) -> _ => self.cycle(unix_time()),
            }
            if let Some(p) = new_period {
                log::info!("Cycle period set to {} ms", p.as_millis());
                ticker = tick(p);
                if let Some(rot) = &self.rotator {
                    rot.controller.set_cycle_period(p);
                }
            }
        }

        self.radio.controller.disengage();
        if let Some(rot) = &self.rotator {
            rot.controller.disengage();
        }
        running.store(false, Ordering::SeqCst);
        log::info!("Control thread stopped");
    }

    fn apply(&mut self, cmd: ControlCommand) {
        log::debug!("Control command: {cmd:?}");
        match cmd {
            ControlCommand::Radio(cmd) => self.apply_radio(cmd),
            ControlCommand::Rotator(cmd) => match &self.rotator {
                Some(rot) => match cmd {
                    RotatorCommand::Engage => rot.controller.engage(),
                    RotatorCommand::Disengage => rot.controller.disengage(),
                    RotatorCommand::SetTracking(on) => rot.controller.set_tracking(on),
                    RotatorCommand::SetPosition(pos) => rot.controller.set_position(pos),
                },
                None => log::warn!("No rotator configured, ignoring {cmd:?}"),
            },
            ControlCommand::SelectTarget(tracker) => {
                self.tracker = tracker;
                self.radio.controller.select_target();
                if let Some(rot) = &self.rotator {
                    rot.controller.select_target();
                }
            }
            // Handled by the loop
            ControlCommand::SetPeriod(_) | ControlCommand::Shutdown => {}
        }
    }

    fn apply_radio(&mut self, cmd: RadioCommand) {
        let ctrl = &self.radio.controller;
        match cmd {
            RadioCommand::Engage => ctrl.engage(),
            RadioCommand::Disengage => ctrl.disengage(),
            RadioCommand::SetTracking(on) => ctrl.set_tracking(on),
            RadioCommand::SetDownlink(hz) => ctrl.set_downlink(hz),
            RadioCommand::SetUplink(hz) => ctrl.set_uplink(hz),
            RadioCommand::SelectTransponder(t) => ctrl.select_transponder(t),
            RadioCommand::SetTransponderLock(on) => ctrl.set_transponder_lock(on),
            RadioCommand::TuneTransponder => ctrl.tune_transponder(),
            RadioCommand::PttEvent => {
                if !ctrl.config().radio_type.is_toggle() {
                    log::warn!("PTT events only apply to toggle radios");
                    return;
                }
                if ctrl.ptt_event(&mut *self.radio.link).is_skipped() {
                    log::error!("PTT event not handled");
                }
            }
        }
    }

    fn cycle(&mut self, t: f64) {
        let obs = self.tracker.observe(t);
        let unit = &mut self.radio;
        let secondary = unit
            .secondary
            .as_mut()
            .map(|link| &mut **link as &mut dyn RadioLink);
        let outcome = unit.controller.tick_with(&mut *unit.link, secondary, &obs);
        let Some(radio) = outcome.completed() else {
            return;
        };
        let rotator = self.rotator.as_mut().and_then(|rot| {
            rot.controller
                .tick(&mut *rot.link, &*self.tracker, t)
                .completed()
        });

        let status = StationStatus {
            time: t,
            radio,
            rotator,
        };
        match self.status_tx.try_send(status) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => log::trace!("Status backlog full, dropping snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockCall, MockRadio, StaticTracker};
    use crate::control::SyncState;
    use crate::domain::{ControlSettings, PttType, RadioConfig, RadioType};

    fn radio_ctrl(radio_type: RadioType) -> Arc<RadioController> {
        let config = RadioConfig {
            name: "worker".into(),
            host: "localhost".into(),
            port: 4532,
            radio_type,
            ptt: PttType::Cat,
            lo_down: 0.0,
            lo_up: 0.0,
            signal_aos: false,
            signal_los: false,
        };
        Arc::new(RadioController::new(config, ControlSettings::default()))
    }

    #[test]
    fn shutdown_joins_thread() {
        let mut worker = ControlWorker::spawn(
            RadioUnit::new(radio_ctrl(RadioType::Rx), Box::new(MockRadio::new())),
            None,
            Box::new(StaticTracker::default()),
            Duration::from_millis(20),
        )
        .unwrap();
        assert!(worker.is_running());
        worker.shutdown().unwrap();
        assert!(!worker.is_running());
        assert!(worker.radio(RadioCommand::Engage).is_err());
    }

    #[test]
    fn ticks_publish_status() {
        let worker = ControlWorker::spawn(
            RadioUnit::new(radio_ctrl(RadioType::Rx), Box::new(MockRadio::new())),
            None,
            Box::new(StaticTracker::with_range_rate(1.0)),
            Duration::from_millis(20),
        )
        .unwrap();
        let status = worker
            .status()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert!(status.time > 0.0);
        assert!(status.rotator.is_none());
        assert!(status.radio.downlink.doppler_shift_hz < 0.0);
    }

    fn first_status(worker: &ControlWorker, pred: impl Fn(&StationStatus) -> bool) -> StationStatus {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            let status = worker.status().recv_timeout(left).expect("no matching status");
            if pred(&status) {
                return status;
            }
        }
    }

    #[test]
    fn ptt_event_keys_toggle_radio() {
        let radio = MockRadio::new();
        let worker = ControlWorker::spawn(
            RadioUnit::new(radio_ctrl(RadioType::ToggleMan), Box::new(radio.clone())),
            None,
            Box::new(StaticTracker::with_range_rate(1.0)),
            Duration::from_millis(20),
        )
        .unwrap();
        worker.radio(RadioCommand::Engage).unwrap();
        worker.radio(RadioCommand::PttEvent).unwrap();
        first_status(&worker, |s| s.radio.ptt);
        assert!(radio.is_keyed());
        assert!(radio.calls().contains(&MockCall::SetPtt(true)));
        assert!(radio.split_frequency().as_hz() > 435_000_000.0);
    }

    #[test]
    fn ptt_event_is_refused_for_plain_receivers() {
        let radio = MockRadio::new();
        let worker = ControlWorker::spawn(
            RadioUnit::new(radio_ctrl(RadioType::Rx), Box::new(radio.clone())),
            None,
            Box::new(StaticTracker::default()),
            Duration::from_millis(20),
        )
        .unwrap();
        worker.radio(RadioCommand::Engage).unwrap();
        worker.radio(RadioCommand::PttEvent).unwrap();
        first_status(&worker, |s| s.radio.downlink.sync == SyncState::Synced);
        assert!(!radio.calls().iter().any(|c| matches!(c, MockCall::SetPtt(_))));
    }

    #[test]
    fn dual_rig_unit_drives_both_radios() {
        let rx = MockRadio::new();
        let tx = MockRadio::new();
        let second = RadioConfig {
            name: "uplink".into(),
            port: 4534,
            radio_type: RadioType::Tx,
            ptt: PttType::None,
            ..radio_ctrl(RadioType::Rx).config().clone()
        };
        let controller = Arc::new(RadioController::with_secondary(
            radio_ctrl(RadioType::Rx).config().clone(),
            Some(second),
            ControlSettings::default(),
        ));
        let worker = ControlWorker::spawn(
            RadioUnit {
                controller,
                link: Box::new(rx.clone()),
                secondary: Some(Box::new(tx.clone())),
            },
            None,
            Box::new(StaticTracker::default()),
            Duration::from_millis(20),
        )
        .unwrap();
        worker.radio(RadioCommand::Engage).unwrap();
        first_status(&worker, |s| {
            s.radio.downlink.sync == SyncState::Synced && s.radio.uplink.sync == SyncState::Synced
        });
        assert_eq!(rx.set_freq_calls().len(), 1);
        assert_eq!(tx.set_freq_calls().len(), 1);
    }
}
