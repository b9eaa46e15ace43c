//! Satellite tracker port trait
//!
//! Orbit propagation lives outside this crate. The control loops only need
//! the target's geometry at a given time and the window of its next pass.

use crate::domain::{Observation, PassWindow};

/// Source of target geometry. Times are seconds on the tracker's own scale
/// (Unix time for the worker's wall-clock driver).
pub trait Tracker: Send {
    /// Az/el/range/range-rate of the target at time `t`
    fn observe(&self, t: f64) -> Observation;

    /// The pass in progress at `t`, or the next one after it
    fn next_pass(&self, t: f64) -> Option<PassWindow>;
}
