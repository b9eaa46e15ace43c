//! Control loops: Doppler-corrected radio tuning and antenna pointing.
//!
//! - `doppler`: pure sky ↔ radio frequency conversion
//! - `link`: per-direction frequency state
//! - `cycle`: the radio control cycle (RX, TX, TRX, duplex, toggle, dual rig)
//! - `rotator`: the antenna rotator control cycle
//!
//! Controllers are `Sync`: one thread ticks them while others read status
//! or flip flags. A tick that would overlap a running one is skipped.

pub mod cycle;
pub mod doppler;
pub mod link;
pub mod rotator;

pub use cycle::{ControlSession, ControlStatus, LinkStatus, RadioController};
pub use link::{LinkState, SyncState};
pub use rotator::{is_flipped_pass, RotatorController, RotatorStatus};

use std::sync::atomic::{AtomicBool, Ordering};

/// Result of asking a controller to run one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome<S> {
    Completed(S),
    /// Another cycle was still in flight
    Skipped,
}

impl<S> TickOutcome<S> {
    pub fn completed(self) -> Option<S> {
        match self {
            TickOutcome::Completed(s) => Some(s),
            TickOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TickOutcome::Skipped)
    }
}

/// Holds a controller's busy flag for the duration of one cycle.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    /// `None` if the flag is already held
    pub(crate) fn try_begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
