//! satctl: Doppler-corrected radio and antenna rotator control
//!
//! Drives hamlib `rigctld`/`rotctld` daemons during satellite passes: keeps
//! the radio on the right frequency as the Doppler shift changes, follows
//! manual retuning on the radio's dial, and points the antenna.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions (interfaces) for the radio, rotator and tracker
//! - `rigctl/` - rigctld/rotctld wire protocol (pure encode/decode + TCP session)
//! - `control/` - Doppler model and the radio/rotator control cycles
//! - `adapters/` - Implementations of ports (rigctld, rotctld, mocks, trackers)
//! - `worker` - Control thread driven by a ticker, fed by a command channel
//! - `state` - Controllers built from a station profile

// Core domain (pure, no I/O)
pub mod control;
pub mod domain;
pub mod ports;
pub mod rigctl;

// Adapters (external I/O)
pub mod adapters;

// Runtime
pub mod state;
pub mod worker;
