//! Station configuration profiles
//!
//! A `StationConfig` bundles the radio and (optional) rotator profiles with
//! the control-loop tunables. Profiles are plain JSON; every field that has
//! a sensible default may be left out.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{PttType, RadioType, SatctlError, SatctlResult, Transponder};

/// Shortest and longest accepted control cycle period
pub const MIN_CYCLE_PERIOD_MS: u64 = 100;
pub const MAX_CYCLE_PERIOD_MS: u64 = 5000;

/// Network endpoint of a rigctld/rotctld daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_rig_port() -> u16 {
    4532
}

fn default_rot_port() -> u16 {
    4533
}

/// Radio profile, read-only for the duration of a control session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Profile name (e.g. "IC-910 shack")
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_rig_port")]
    pub port: u16,
    pub radio_type: RadioType,
    #[serde(default)]
    pub ptt: PttType,
    /// Downconverter LO in Hz, subtracted from the sky frequency
    #[serde(default)]
    pub lo_down: f64,
    /// Upconverter LO in Hz
    #[serde(default)]
    pub lo_up: f64,
    /// Send `AOS` to the daemon when the target rises
    #[serde(default)]
    pub signal_aos: bool,
    /// Send `LOS` to the daemon when the target sets
    #[serde(default)]
    pub signal_los: bool,
}

impl RadioConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn ptt_capable(&self) -> bool {
        self.ptt != PttType::None
    }
}

/// Azimuth convention of the rotator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AzType {
    /// 0 to 360 degrees
    #[default]
    Az360,
    /// -180 to +180 degrees
    Az180,
}

impl AzType {
    /// Nominal (min, max) azimuth range for this convention
    pub fn range(self) -> (f64, f64) {
        match self {
            AzType::Az360 => (0.0, 360.0),
            AzType::Az180 => (-180.0, 180.0),
        }
    }
}

fn default_max_az() -> f64 {
    360.0
}

fn default_max_el() -> f64 {
    90.0
}

/// Rotator profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatorConfig {
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_rot_port")]
    pub port: u16,
    #[serde(default)]
    pub az_type: AzType,
    #[serde(default)]
    pub min_az: f64,
    #[serde(default = "default_max_az")]
    pub max_az: f64,
    #[serde(default)]
    pub min_el: f64,
    #[serde(default = "default_max_el")]
    pub max_el: f64,
    /// Azimuth of the mechanical end stop; shifts the usable range
    #[serde(default)]
    pub az_stop_pos: Option<f64>,
}

impl RotatorConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Elevation beyond zenith is reachable, so flipped passes can be flown.
    pub fn supports_flip(&self) -> bool {
        self.max_el >= 180.0
    }

    pub fn stop_position(&self) -> f64 {
        self.az_stop_pos.unwrap_or_else(|| self.az_type.range().0)
    }
}

fn default_cycle_period_ms() -> u64 {
    1000
}

fn default_error_threshold() -> u32 {
    5
}

fn default_dial_threshold_hz() -> f64 {
    0.99
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_rotator_tolerance_deg() -> f64 {
    5.0
}

fn default_readback_after_write() -> bool {
    true
}

fn default_toggle_tx_interval_ms() -> u64 {
    10_000
}

fn default_toggle_tx_threshold_hz() -> f64 {
    10.0
}

/// Control loop tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,
    /// Consecutive I/O failures before the session disengages itself
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,
    /// Frequency differences at or below this are treated as "in sync"
    #[serde(default = "default_dial_threshold_hz")]
    pub dial_threshold_hz: f64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_rotator_tolerance_deg")]
    pub rotator_tolerance_deg: f64,
    /// Read the VFO back after every write and treat that as commanded.
    /// Radios with a coarse tuning step (10 Hz on the FT-817) never hold
    /// the exact value written.
    #[serde(default = "default_readback_after_write")]
    pub readback_after_write: bool,
    /// Minimum time between uplink refreshes on a `toggle_auto` radio
    #[serde(default = "default_toggle_tx_interval_ms")]
    pub toggle_tx_interval_ms: u64,
    /// Uplink moves at or below this are not sent to a toggle radio
    #[serde(default = "default_toggle_tx_threshold_hz")]
    pub toggle_tx_threshold_hz: f64,
}

impl ControlSettings {
    /// Cycle period, clamped into the accepted range
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(clamp_period_ms(self.cycle_period_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn toggle_tx_interval(&self) -> Duration {
        Duration::from_millis(self.toggle_tx_interval_ms)
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            cycle_period_ms: default_cycle_period_ms(),
            error_threshold: default_error_threshold(),
            dial_threshold_hz: default_dial_threshold_hz(),
            connect_timeout_ms: default_connect_timeout_ms(),
            rotator_tolerance_deg: default_rotator_tolerance_deg(),
            readback_after_write: default_readback_after_write(),
            toggle_tx_interval_ms: default_toggle_tx_interval_ms(),
            toggle_tx_threshold_hz: default_toggle_tx_threshold_hz(),
        }
    }
}

pub fn clamp_period_ms(ms: u64) -> u64 {
    ms.clamp(MIN_CYCLE_PERIOD_MS, MAX_CYCLE_PERIOD_MS)
}

/// Everything needed to run a ground station control session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub radio: RadioConfig,
    /// Second radio carrying the uplink. When present the primary radio
    /// only receives and the pair runs as a dual-rig station.
    #[serde(default)]
    pub secondary: Option<RadioConfig>,
    #[serde(default)]
    pub rotator: Option<RotatorConfig>,
    #[serde(default)]
    pub settings: ControlSettings,
    #[serde(default)]
    pub transponders: Vec<Transponder>,
}

impl StationConfig {
    /// Parse and validate a JSON station profile.
    pub fn from_json(json: &str) -> SatctlResult<Self> {
        let config: StationConfig = serde_json::from_str(json)
            .map_err(|e| SatctlError::Config(format!("Failed to parse station config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON station profile from disk.
    pub fn load(path: &Path) -> SatctlResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SatctlError::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> SatctlResult<()> {
        validate_profile_name(&self.radio.name)?;
        if let Some(secondary) = &self.secondary {
            validate_profile_name(&secondary.name)?;
        }
        if let Some(rot) = &self.rotator {
            validate_profile_name(&rot.name)?;
            if rot.min_az >= rot.max_az || rot.min_el >= rot.max_el {
                return Err(SatctlError::Config(format!(
                    "Rotator '{}' has empty az/el limits",
                    rot.name
                )));
            }
        }
        if self.settings.error_threshold == 0 {
            return Err(SatctlError::Config(
                "error_threshold must be at least 1".to_string(),
            ));
        }
        if !(self.settings.dial_threshold_hz >= 0.0) {
            return Err(SatctlError::Config(
                "dial_threshold_hz must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reject profile names that could escape a profile directory.
/// Only alphanumerics, spaces, hyphens and underscores are allowed.
pub fn validate_profile_name(name: &str) -> SatctlResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SatctlError::Config("Profile name cannot be empty".to_string()));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(SatctlError::Config(format!("Invalid profile name '{trimmed}'")));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(SatctlError::Config(format!(
            "Profile name '{trimmed}' contains invalid characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{ "radio": { "name": "FT-847", "radio_type": "rx" } }"#;

    #[test]
    fn minimal_profile_gets_defaults() {
        let config = StationConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.radio.host, "localhost");
        assert_eq!(config.radio.port, 4532);
        assert_eq!(config.radio.ptt, PttType::None);
        assert!(!config.radio.ptt_capable());
        assert_eq!(config.settings.cycle_period_ms, 1000);
        assert_eq!(config.settings.error_threshold, 5);
        assert_eq!(config.settings.dial_threshold_hz, 0.99);
        assert!(config.settings.readback_after_write);
        assert_eq!(config.settings.toggle_tx_interval(), Duration::from_secs(10));
        assert_eq!(config.settings.toggle_tx_threshold_hz, 10.0);
        assert!(config.secondary.is_none());
        assert!(config.rotator.is_none());
        assert!(config.transponders.is_empty());
    }

    #[test]
    fn full_profile_parses() {
        let json = r#"{
            "radio": {
                "name": "IC-910",
                "host": "shack.local",
                "port": 4600,
                "radio_type": "duplex",
                "ptt": "cat",
                "lo_down": 100000000.0,
                "signal_aos": true
            },
            "rotator": { "name": "G-5500", "az_type": "az180", "min_az": -180, "max_az": 180, "max_el": 180 },
            "settings": { "cycle_period_ms": 500, "error_threshold": 3 },
            "transponders": [
                { "name": "Mode V/U", "uplink_low": 145900000, "uplink_high": 146000000,
                  "downlink_low": 435800000, "downlink_high": 435900000, "invert": true }
            ]
        }"#;
        let config = StationConfig::from_json(json).unwrap();
        assert_eq!(config.radio.radio_type, RadioType::Duplex);
        assert!(config.radio.ptt_capable());
        assert_eq!(config.radio.endpoint().to_string(), "shack.local:4600");
        let rot = config.rotator.unwrap();
        assert_eq!(rot.az_type, AzType::Az180);
        assert!(rot.supports_flip());
        assert_eq!(rot.stop_position(), -180.0);
        assert_eq!(config.settings.cycle_period_ms, 500);
        assert_eq!(config.settings.dial_threshold_hz, 0.99);
        assert!(config.transponders[0].invert);
    }

    #[test]
    fn cycle_period_is_clamped() {
        let mut settings = ControlSettings::default();
        settings.cycle_period_ms = 10;
        assert_eq!(settings.cycle_period(), Duration::from_millis(100));
        settings.cycle_period_ms = 60_000;
        assert_eq!(settings.cycle_period(), Duration::from_millis(5000));
    }

    #[test]
    fn zero_error_threshold_is_rejected() {
        let json = r#"{ "radio": { "name": "x", "radio_type": "rx" }, "settings": { "error_threshold": 0 } }"#;
        assert!(StationConfig::from_json(json).is_err());
    }

    #[test]
    fn empty_rotator_limits_are_rejected() {
        let json = r#"{ "radio": { "name": "x", "radio_type": "rx" },
                        "rotator": { "name": "r", "min_az": 90, "max_az": 90 } }"#;
        assert!(StationConfig::from_json(json).is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = StationConfig::load(file.path()).unwrap();
        assert_eq!(config.radio.name, "FT-847");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StationConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SatctlError::Config(_)));
    }

    #[test]
    fn profile_name_rejects_path_traversal() {
        assert!(validate_profile_name("../evil").is_err());
        assert!(validate_profile_name("foo/bar").is_err());
        assert!(validate_profile_name("foo\\bar").is_err());
        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name("  ").is_err());
    }

    #[test]
    fn profile_name_accepts_valid_names() {
        assert_eq!(validate_profile_name("IC-910 Home").unwrap(), "IC-910 Home");
        assert_eq!(validate_profile_name("rig_2").unwrap(), "rig_2");
    }

    #[test]
    fn profile_name_rejects_special_characters() {
        assert!(validate_profile_name("rig<>").is_err());
        assert!(validate_profile_name("rig;drop").is_err());
    }

    #[test]
    fn radio_config_serializes_to_json() {
        let config = StationConfig::from_json(MINIMAL).unwrap();
        let json = serde_json::to_string(&config.radio).unwrap();
        assert!(json.contains("\"radio_type\":\"rx\""));
    }

    #[test]
    fn dual_rig_profile_parses() {
        let json = r#"{
            "radio": { "name": "FT-847 RX", "radio_type": "rx", "lo_down": 100000000 },
            "secondary": { "name": "FT-817 TX", "port": 4534, "radio_type": "toggle_auto", "lo_up": 116000000 },
            "settings": { "readback_after_write": false }
        }"#;
        let config = StationConfig::from_json(json).unwrap();
        let secondary = config.secondary.unwrap();
        assert_eq!(secondary.radio_type, RadioType::ToggleAuto);
        assert!(secondary.radio_type.is_toggle());
        assert_eq!(secondary.endpoint().to_string(), "localhost:4534");
        assert!(!config.settings.readback_after_write);
    }

    #[test]
    fn secondary_name_is_validated() {
        let json = r#"{ "radio": { "name": "rx", "radio_type": "rx" },
                        "secondary": { "name": "../tx", "radio_type": "tx" } }"#;
        assert!(StationConfig::from_json(json).is_err());
    }
}
