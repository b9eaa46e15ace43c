//! Core domain types
//!
//! Pure types with no I/O dependencies: radio/rotator profiles, target
//! geometry, transponder passbands, and the error taxonomy.

pub mod config;
pub mod error;
pub mod transponder;
pub mod types;

pub use config::*;
pub use error::*;
pub use transponder::*;
pub use types::*;
