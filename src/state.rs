//! Station state: controllers built from a station profile

use std::path::Path;
use std::sync::Arc;

use crate::adapters::{MockRadio, MockRotator, RigctldRadio, RotctldRotator};
use crate::control::{RadioController, RotatorController};
use crate::domain::{RadioConfig, SatctlResult, StationConfig, Transponder};
use crate::ports::{RadioLink, RotatorLink, Tracker};
use crate::worker::{ControlWorker, RadioUnit, RotatorUnit};

/// Shared state for one ground station
pub struct StationState {
    pub config: StationConfig,
    pub radio: Arc<RadioController>,
    pub rotator: Option<Arc<RotatorController>>,
}

/// Hardware links for one control session
pub struct StationLinks {
    pub radio: Box<dyn RadioLink>,
    /// Uplink radio, present when the profile names a secondary
    pub secondary: Option<Box<dyn RadioLink>>,
    pub rotator: Option<Box<dyn RotatorLink>>,
}

impl StationState {
    pub fn new(config: StationConfig) -> Self {
        let radio = Arc::new(RadioController::with_secondary(
            config.radio.clone(),
            config.secondary.clone(),
            config.settings.clone(),
        ));
        let rotator = config
            .rotator
            .clone()
            .map(|rot| Arc::new(RotatorController::new(rot, config.settings.clone())));
        Self {
            config,
            radio,
            rotator,
        }
    }

    pub fn load(path: &Path) -> SatctlResult<Self> {
        StationConfig::load(path).map(Self::new)
    }

    /// Look up a configured transponder by name (case-insensitive)
    pub fn transponder(&self, name: &str) -> Option<Transponder> {
        self.config
            .transponders
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Links to the configured rigctld/rotctld daemons
    pub fn daemon_links(&self) -> StationLinks {
        let timeout = self.config.settings.connect_timeout();
        let radio = |conf: &RadioConfig| {
            Box::new(RigctldRadio::from_config(conf, timeout)) as Box<dyn RadioLink>
        };
        StationLinks {
            radio: radio(&self.config.radio),
            secondary: self.config.secondary.as_ref().map(radio),
            rotator: self.config.rotator.as_ref().map(|rot| {
                Box::new(RotctldRotator::from_config(rot, timeout)) as Box<dyn RotatorLink>
            }),
        }
    }

    /// In-memory links for running without hardware
    pub fn mock_links(&self) -> StationLinks {
        StationLinks {
            radio: Box::new(MockRadio::new()),
            secondary: self
                .config
                .secondary
                .as_ref()
                .map(|_| Box::new(MockRadio::new()) as Box<dyn RadioLink>),
            rotator: self
                .rotator
                .as_ref()
                .map(|_| Box::new(MockRotator::default()) as Box<dyn RotatorLink>),
        }
    }

    /// Start the control thread with the given links and target.
    /// Links for hardware the profile does not configure are ignored.
    pub fn start(&self, links: StationLinks, tracker: Box<dyn Tracker>) -> SatctlResult<ControlWorker> {
        let rotator = match (&self.rotator, links.rotator) {
            (Some(controller), Some(link)) => Some(RotatorUnit {
                controller: controller.clone(),
                link,
            }),
            _ => None,
        };
        let radio = RadioUnit {
            controller: self.radio.clone(),
            link: links.radio,
            secondary: links.secondary.filter(|_| self.config.secondary.is_some()),
        };
        ControlWorker::spawn(radio, rotator, tracker, self.config.settings.cycle_period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "radio": { "name": "FT-847", "radio_type": "duplex" },
        "rotator": { "name": "G-5500" },
        "transponders": [
            { "name": "Mode U/V", "uplink_low": 435030000, "uplink_high": 435050000,
              "downlink_low": 145950000, "downlink_high": 145970000, "invert": true }
        ]
    }"#;

    const DUAL_PROFILE: &str = r#"{
        "radio": { "name": "IC-R8600", "radio_type": "rx" },
        "secondary": { "name": "FT-817", "port": 4534, "radio_type": "tx", "lo_up": -116000000 }
    }"#;

    #[test]
    fn builds_controllers_from_profile() {
        let state = StationState::new(StationConfig::from_json(PROFILE).unwrap());
        assert_eq!(state.radio.config().name, "FT-847");
        assert!(state.radio.secondary().is_none());
        assert!(state.rotator.is_some());
        assert!(!state.radio.is_engaged());
    }

    #[test]
    fn transponder_lookup_ignores_case() {
        let state = StationState::new(StationConfig::from_json(PROFILE).unwrap());
        assert!(state.transponder("mode u/v").is_some());
        assert!(state.transponder("Mode V/U").is_none());
    }

    #[test]
    fn mock_links_follow_configured_hardware() {
        let state = StationState::new(StationConfig::from_json(PROFILE).unwrap());
        let links = state.mock_links();
        assert!(links.rotator.is_some());
        assert!(links.secondary.is_none());
    }

    #[test]
    fn dual_profile_gets_secondary_link_and_uplink_lo() {
        let state = StationState::new(StationConfig::from_json(DUAL_PROFILE).unwrap());
        assert_eq!(state.radio.secondary().map(|s| s.name.as_str()), Some("FT-817"));
        assert_eq!(state.radio.session().uplink.lo, -116_000_000.0);
        let links = state.mock_links();
        assert!(links.secondary.is_some());
        assert!(links.rotator.is_none());
        assert!(state.daemon_links().secondary.is_some());
    }
}
