//! rigctld radio adapter
//!
//! rigctld is hamlib's network front-end for radio CAT control. Every
//! `RadioLink` call becomes exactly one command on a fresh TCP connection:
//! - `t` / 0x8b: PTT via CAT or via the DCD line, `T`: key the transmitter
//! - `f` / `F`: main VFO, `i` / `I`: split (TX) VFO
//! - `AOS` / `LOS`: pass notifications
//!
//! Frequency writes are fire-and-forget; the daemon's `RPRT` is never read.

use std::time::Duration;

use crate::domain::{Endpoint, Frequency, LinkError, LinkResult, PassEvent, RadioConfig};
use crate::ports::RadioLink;
use crate::rigctl::{RigctlCommand, RigctlReply, RigctlSession};

pub struct RigctldRadio {
    session: RigctlSession,
}

impl RigctldRadio {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        log::info!("rigctld radio at {endpoint}");
        Self {
            session: RigctlSession::new(endpoint, timeout),
        }
    }

    pub fn from_config(config: &RadioConfig, timeout: Duration) -> Self {
        Self::new(config.endpoint(), timeout)
    }

    /// Commands exchanged so far
    pub fn exchanges(&self) -> u64 {
        self.session.exchanges()
    }

    fn query_flag(&mut self, cmd: RigctlCommand) -> LinkResult<bool> {
        match self.session.execute(&cmd)? {
            RigctlReply::Ptt(on) => Ok(on),
            other => Err(unexpected(&cmd, &other)),
        }
    }

    fn query_freq(&mut self, cmd: RigctlCommand) -> LinkResult<Frequency> {
        match self.session.execute(&cmd)? {
            RigctlReply::FrequencyHz(hz) => Ok(Frequency::hz(hz)),
            other => Err(unexpected(&cmd, &other)),
        }
    }

    fn send(&mut self, cmd: RigctlCommand) -> LinkResult<()> {
        self.session.execute(&cmd).map(|_| ())
    }
}

fn unexpected(cmd: &RigctlCommand, reply: &RigctlReply) -> LinkError {
    LinkError::Protocol(format!("Unexpected reply {reply:?} to {cmd:?}"))
}

impl RadioLink for RigctldRadio {
    fn get_ptt(&mut self) -> LinkResult<bool> {
        self.query_flag(RigctlCommand::GetPtt)
    }

    fn get_dcd(&mut self) -> LinkResult<bool> {
        self.query_flag(RigctlCommand::GetDcd)
    }

    fn set_ptt(&mut self, on: bool) -> LinkResult<()> {
        self.send(RigctlCommand::SetPtt(on))
    }

    fn get_freq(&mut self) -> LinkResult<Frequency> {
        self.query_freq(RigctlCommand::GetFreq)
    }

    fn set_freq(&mut self, freq: Frequency) -> LinkResult<()> {
        self.send(RigctlCommand::SetFreq(freq.as_hz()))
    }

    fn get_split_freq(&mut self) -> LinkResult<Frequency> {
        self.query_freq(RigctlCommand::GetSplitFreq)
    }

    fn set_split_freq(&mut self, freq: Frequency) -> LinkResult<()> {
        self.send(RigctlCommand::SetSplitFreq(freq.as_hz()))
    }

    fn signal(&mut self, event: PassEvent) -> LinkResult<()> {
        let cmd = match event {
            PassEvent::Aos => RigctlCommand::Aos,
            PassEvent::Los => RigctlCommand::Los,
        };
        self.send(cmd)
    }
}
