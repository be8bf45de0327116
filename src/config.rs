//! Run configuration for the simulator and its transmit backend.

use anyhow::Context;
use serde::Deserialize;

use crate::channel::PhaseMode;
use crate::dac::DacWidth;

/// Everything the engine needs besides the scenario inputs themselves.
/// Loadable from TOML; flags override individual fields.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Baseband sample rate [Hz].
    pub fs_hz: f64,
    /// RF bandwidth [Hz], for the radio backend.
    pub bw_hz: f64,
    /// Carrier (LO) frequency [Hz].
    pub lo_hz: f64,
    /// TX attenuation [dB], clamped to [-80, 0] by the front end.
    pub tx_gain_db: f64,
    /// Backend URI (`file:<path>`, `stdout:`, or a radio URI).
    pub uri: Option<String>,
    /// Radio backend network name.
    pub hostname: String,
    /// Apply the ionospheric delay model.
    pub iono_enable: bool,
    /// Print per-channel details during the run.
    pub verbose: bool,
    /// Carrier-phase representation.
    pub phase_mode: PhaseMode,
    /// DAC width of the output path.
    pub dac: DacWidth,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            fs_hz: 2_600_000.0,
            bw_hz: 3_000_000.0,
            lo_hz: 1_575_420_000.0,
            tx_gain_db: -20.0,
            uri: None,
            hostname: "pluto.local".to_string(),
            iono_enable: true,
            verbose: false,
            phase_mode: PhaseMode::Float,
            dac: DacWidth::I16,
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("read config file {path}"))?;
        let cfg: SimConfig = toml::from_str(&content).context("parse config toml")?;
        Ok(cfg)
    }
}
