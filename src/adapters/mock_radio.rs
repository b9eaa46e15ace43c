//! Mock radio adapter for development and testing without a rigctld daemon.
//!
//! Activate from the CLI with `--mock`:
//!
//!   RUST_LOG=satctl_lib=info satctl --config station.json --mock
//!
//! Every RadioLink call is logged at INFO level with the rigctld command it
//! stands for, so you can verify exactly what would go over the wire.
//! Clones share state: keep one clone to steer the "radio" (turn the dial,
//! key PTT, take it offline) while the control loop owns the other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::{Frequency, LinkError, LinkResult, PassEvent};
use crate::ports::RadioLink;

/// Default frequency: 2m satellite sub-band
const DEFAULT_FREQ_HZ: f64 = 145_900_000.0;

/// Calls kept in the log before the oldest are dropped
pub const DEFAULT_CALL_LOG_LIMIT: usize = 10_000;

/// A RadioLink call as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GetPtt,
    GetDcd,
    SetPtt(bool),
    GetFreq,
    SetFreq(f64),
    GetSplitFreq,
    SetSplitFreq(f64),
    Signal(PassEvent),
}

#[derive(Debug)]
struct MockRadioState {
    frequency: f64,
    split_frequency: f64,
    ptt: bool,
    offline: bool,
    latency: Duration,
    /// VFO resolution in Hz; 0 stores frequencies as written
    tuning_step: f64,
    calls: VecDeque<MockCall>,
    call_log_limit: usize,
}

impl MockRadioState {
    fn quantise(&self, hz: f64) -> f64 {
        if self.tuning_step > 0.0 {
            (hz / self.tuning_step).round() * self.tuning_step
        } else {
            hz
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockRadio {
    state: Arc<Mutex<MockRadioState>>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::with_frequency(Frequency::hz(DEFAULT_FREQ_HZ))
    }

    pub fn with_frequency(freq: Frequency) -> Self {
        log::info!("[MOCK RADIO] Initialized at {:.6} MHz", freq.as_hz() / 1e6);
        Self {
            state: Arc::new(Mutex::new(MockRadioState {
                frequency: freq.as_hz(),
                split_frequency: freq.as_hz(),
                ptt: false,
                offline: false,
                latency: Duration::ZERO,
                tuning_step: 0.0,
                calls: VecDeque::new(),
                call_log_limit: DEFAULT_CALL_LOG_LIMIT,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockRadioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate the operator turning the main dial
    pub fn turn_dial(&self, freq: Frequency) {
        log::info!("[MOCK RADIO] Dial turned to {:.6} MHz", freq.as_hz() / 1e6);
        self.lock().frequency = freq.as_hz();
    }

    /// Simulate the operator turning the split (TX) dial
    pub fn turn_split_dial(&self, freq: Frequency) {
        self.lock().split_frequency = freq.as_hz();
    }

    pub fn key(&self, ptt: bool) {
        self.lock().ptt = ptt;
    }

    /// While offline every call fails as if the daemon refused the connection
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Delay added to every call
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Round every written frequency to a multiple of `step_hz`, like a
    /// radio with a coarse VFO (10 Hz on the FT-817)
    pub fn set_tuning_step(&self, step_hz: f64) {
        self.lock().tuning_step = step_hz.max(0.0);
    }

    /// Keep at most `limit` calls in the log, dropping the oldest
    pub fn set_call_log_limit(&self, limit: usize) {
        let mut state = self.lock();
        state.call_log_limit = limit;
        while state.calls.len() > limit {
            state.calls.pop_front();
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.lock().ptt
    }

    pub fn frequency(&self) -> Frequency {
        Frequency::hz(self.lock().frequency)
    }

    pub fn split_frequency(&self) -> Frequency {
        Frequency::hz(self.lock().split_frequency)
    }

    /// Logged calls, oldest first
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.iter().cloned().collect()
    }

    /// Frequencies written with `set_freq`, oldest first
    pub fn set_freq_calls(&self) -> Vec<f64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::SetFreq(hz) => Some(*hz),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Record the call, apply latency, and fail if offline.
    fn enter(&self, call: MockCall) -> LinkResult<()> {
        let latency = {
            let mut state = self.lock();
            if state.call_log_limit > 0 {
                if state.calls.len() >= state.call_log_limit {
                    state.calls.pop_front();
                }
                state.calls.push_back(call.clone());
            }
            if state.offline {
                log::info!("[MOCK RADIO] {call:?} → connection refused");
                return Err(LinkError::Connect("mock radio is offline".to_string()));
            }
            state.latency
        };
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        Ok(())
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioLink for MockRadio {
    fn get_ptt(&mut self) -> LinkResult<bool> {
        self.enter(MockCall::GetPtt)?;
        let ptt = self.lock().ptt;
        log::info!("[MOCK RADIO] GET PTT → t → {}", ptt as u8);
        Ok(ptt)
    }

    fn get_dcd(&mut self) -> LinkResult<bool> {
        self.enter(MockCall::GetDcd)?;
        let ptt = self.lock().ptt;
        log::info!("[MOCK RADIO] GET DCD → 0x8b → {}", ptt as u8);
        Ok(ptt)
    }

    fn set_ptt(&mut self, on: bool) -> LinkResult<()> {
        self.enter(MockCall::SetPtt(on))?;
        log::info!("[MOCK RADIO] SET PTT → T {}", on as u8);
        self.lock().ptt = on;
        Ok(())
    }

    fn get_freq(&mut self) -> LinkResult<Frequency> {
        self.enter(MockCall::GetFreq)?;
        let hz = self.lock().frequency;
        log::info!("[MOCK RADIO] GET FREQ → f → {hz:.0}  ({:.6} MHz)", hz / 1e6);
        Ok(Frequency::hz(hz))
    }

    fn set_freq(&mut self, freq: Frequency) -> LinkResult<()> {
        self.enter(MockCall::SetFreq(freq.as_hz()))?;
        log::info!(
            "[MOCK RADIO] SET FREQ → F {:10.0}  ({:.6} MHz)",
            freq.as_hz(),
            freq.as_hz() / 1e6
        );
        let mut state = self.lock();
        state.frequency = state.quantise(freq.as_hz());
        Ok(())
    }

    fn get_split_freq(&mut self) -> LinkResult<Frequency> {
        self.enter(MockCall::GetSplitFreq)?;
        let hz = self.lock().split_frequency;
        log::info!("[MOCK RADIO] GET SPLIT → i → {hz:.0}");
        Ok(Frequency::hz(hz))
    }

    fn set_split_freq(&mut self, freq: Frequency) -> LinkResult<()> {
        self.enter(MockCall::SetSplitFreq(freq.as_hz()))?;
        log::info!("[MOCK RADIO] SET SPLIT → I {:10.0}", freq.as_hz());
        let mut state = self.lock();
        state.split_frequency = state.quantise(freq.as_hz());
        Ok(())
    }

    fn signal(&mut self, event: PassEvent) -> LinkResult<()> {
        self.enter(MockCall::Signal(event))?;
        log::info!("[MOCK RADIO] {event:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_written_frequency() {
        let mut radio = MockRadio::new();
        radio.set_freq(Frequency::hz(437_800_000.0)).unwrap();
        assert_eq!(radio.get_freq().unwrap(), Frequency::hz(437_800_000.0));
        assert_eq!(
            radio.calls(),
            vec![MockCall::SetFreq(437_800_000.0), MockCall::GetFreq]
        );
    }

    #[test]
    fn clones_share_state() {
        let mut radio = MockRadio::new();
        let handle = radio.clone();
        handle.turn_dial(Frequency::hz(145_800_000.0));
        handle.key(true);
        assert_eq!(radio.get_freq().unwrap().as_hz(), 145_800_000.0);
        assert!(radio.get_ptt().unwrap());
        assert_eq!(handle.calls().len(), 2);
    }

    #[test]
    fn offline_radio_fails_every_call_but_records_it() {
        let mut radio = MockRadio::new();
        radio.set_offline(true);
        assert!(matches!(radio.get_freq(), Err(LinkError::Connect(_))));
        assert!(radio.set_freq(Frequency::hz(1.0)).is_err());
        assert_eq!(radio.calls().len(), 2);
        assert_eq!(radio.frequency().as_hz(), DEFAULT_FREQ_HZ);
    }

    #[test]
    fn split_vfo_is_independent() {
        let mut radio = MockRadio::new();
        radio.set_split_freq(Frequency::hz(435_000_000.0)).unwrap();
        assert_eq!(radio.get_freq().unwrap().as_hz(), DEFAULT_FREQ_HZ);
        assert_eq!(radio.get_split_freq().unwrap().as_hz(), 435_000_000.0);
    }

    #[test]
    fn tuning_step_rounds_written_frequency() {
        let mut radio = MockRadio::new();
        radio.set_tuning_step(10.0);
        radio.set_freq(Frequency::hz(145_886_357.4)).unwrap();
        assert_eq!(radio.get_freq().unwrap().as_hz(), 145_886_360.0);
        radio.set_split_freq(Frequency::hz(435_103_644.0)).unwrap();
        assert_eq!(radio.split_frequency().as_hz(), 435_103_640.0);
    }

    #[test]
    fn call_log_keeps_only_the_newest_calls() {
        let mut radio = MockRadio::new();
        radio.set_call_log_limit(3);
        for hz in 1..=5 {
            radio.set_freq(Frequency::hz(hz as f64)).unwrap();
        }
        assert_eq!(radio.set_freq_calls(), vec![3.0, 4.0, 5.0]);

        radio.set_call_log_limit(0);
        radio.get_freq().unwrap();
        assert!(radio.calls().is_empty());
    }

    #[test]
    fn set_ptt_keys_the_radio() {
        let mut radio = MockRadio::new();
        radio.set_ptt(true).unwrap();
        assert!(radio.is_keyed());
        assert!(radio.get_ptt().unwrap());
        radio.set_ptt(false).unwrap();
        assert!(!radio.is_keyed());
    }
}
