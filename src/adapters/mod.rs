//! Adapters: implementations of the port traits
//!
//! - `rigctld` / `rotctld`: hamlib network daemons over TCP
//! - `mock_radio` / `mock_rotator`: in-memory fakes for tests and `--mock`
//! - `tracker`: propagator-free target geometry sources

pub mod mock_radio;
pub mod mock_rotator;
pub mod rigctld;
pub mod rotctld;
pub mod tracker;

pub use mock_radio::{MockCall, MockRadio};
pub use mock_rotator::MockRotator;
pub use rigctld::RigctldRadio;
pub use rotctld::RotctldRotator;
pub use tracker::{StaticTracker, SyntheticPass};
