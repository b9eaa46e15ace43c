//! Port traits (interfaces)
//!
//! These traits define the boundaries between the control loops and external I/O.
//! Adapters implement these traits to connect to real daemons or in-memory fakes.

pub mod radio;
pub mod rotator;
pub mod tracker;

pub use radio::*;
pub use rotator::*;
pub use tracker::*;
