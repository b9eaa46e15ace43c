//! rotctld rotator adapter
//!
//! `p` reads the position as two lines (azimuth, elevation). `P az el`
//! answers with `RPRT n`; a non-zero code is logged and otherwise ignored.

use std::time::Duration;

use crate::domain::{AzEl, Endpoint, LinkError, LinkResult, RotatorConfig};
use crate::ports::RotatorLink;
use crate::rigctl::{RigctlCommand, RigctlReply, RigctlSession};

pub struct RotctldRotator {
    session: RigctlSession,
}

impl RotctldRotator {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        log::info!("rotctld rotator at {endpoint}");
        Self {
            session: RigctlSession::new(endpoint, timeout),
        }
    }

    pub fn from_config(config: &RotatorConfig, timeout: Duration) -> Self {
        Self::new(config.endpoint(), timeout)
    }
}

impl RotatorLink for RotctldRotator {
    fn get_pos(&mut self) -> LinkResult<AzEl> {
        match self.session.execute(&RigctlCommand::GetPos)? {
            RigctlReply::Position(pos) => Ok(pos),
            other => Err(LinkError::Protocol(format!(
                "Unexpected reply {other:?} to GetPos"
            ))),
        }
    }

    fn set_pos(&mut self, pos: AzEl) -> LinkResult<()> {
        match self.session.execute(&RigctlCommand::SetPos(pos))? {
            RigctlReply::Report(0) => Ok(()),
            RigctlReply::Report(code) => {
                log::warn!(
                    "rotctld {} rejected P {:.2} {:.2}: RPRT {code}",
                    self.session.endpoint(),
                    pos.az,
                    pos.el
                );
                Ok(())
            }
            other => Err(LinkError::Protocol(format!(
                "Unexpected reply {other:?} to SetPos"
            ))),
        }
    }
}
