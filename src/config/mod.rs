use crate::error::EngineError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Engine role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineMode {
    Singleplayer,
    Server,
    ClientPrediction,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Singleplayer => "SINGLEPLAYER",
            EngineMode::Server => "SERVER",
            EngineMode::ClientPrediction => "CLIENT_PREDICTION",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLEPLAYER" => Ok(EngineMode::Singleplayer),
            "SERVER" => Ok(EngineMode::Server),
            "CLIENT_PREDICTION" => Ok(EngineMode::ClientPrediction),
            other => Err(format!("unknown engine mode '{}'", other)),
        }
    }
}

/// Engine configuration. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub mode: EngineMode,
    /// Fixed ticks per second
    pub tick_rate: u32,
    /// Pixels per world unit (presentation only)
    pub unit_pixels: f32,
    /// AI runs on ticks where `tick % ai_update_interval == 0`
    pub ai_update_interval: u64,
    /// Snapshot ring buffer capacity
    pub snapshot_buffer_size: usize,
    /// Root of every random draw in the simulation
    pub rng_seed: u64,
    /// Capture a memento every N ticks
    pub snapshot_emission_interval: u64,
}

impl EngineConfig {
    /// Reject configurations the scheduler cannot run
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_rate == 0 {
            return Err(EngineError::InvalidConfig("tick_rate must be positive".into()));
        }
        if !self.unit_pixels.is_finite() || self.unit_pixels <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "unit_pixels must be a positive finite number".into(),
            ));
        }
        if self.ai_update_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "ai_update_interval must be positive".into(),
            ));
        }
        if self.snapshot_buffer_size == 0 {
            return Err(EngineError::InvalidConfig(
                "snapshot_buffer_size must be positive".into(),
            ));
        }
        if self.snapshot_emission_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "snapshot_emission_interval must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Fixed timestep in seconds
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Apply `NECROTON_*` overrides from a variable lookup.
    /// Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NECROTON_MODE") {
            match v.parse::<EngineMode>() {
                Ok(mode) => self.mode = mode,
                Err(e) => warn!(value = %v, error = %e, "Ignoring NECROTON_MODE override"),
            }
        }
        if let Some(v) = lookup("NECROTON_TICK_RATE") {
            match v.parse::<u32>() {
                Ok(n) => self.tick_rate = n,
                Err(e) => warn!(value = %v, error = %e, "Ignoring NECROTON_TICK_RATE override"),
            }
        }
        if let Some(v) = lookup("NECROTON_RNG_SEED") {
            match v.parse::<u64>() {
                Ok(n) => self.rng_seed = n,
                Err(e) => warn!(value = %v, error = %e, "Ignoring NECROTON_RNG_SEED override"),
            }
        }
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }
}

/// Host binary settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostConfig {
    /// Stop after this many ticks (runs until Ctrl-C when absent)
    #[serde(default)]
    pub run_ticks: Option<u64>,
    #[serde(default = "default_spawn_demo_entities")]
    pub spawn_demo_entities: bool,
    /// Client id whose scripted inputs the host feeds
    #[serde(default = "default_demo_client")]
    pub demo_client: String,
}

fn default_spawn_demo_entities() -> bool {
    true
}

fn default_demo_client() -> String {
    "player1".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            run_ticks: None,
            spawn_demo_entities: default_spawn_demo_entities(),
            demo_client: default_demo_client(),
        }
    }
}

/// Complete Necroton configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NecrotonConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<NecrotonConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: NecrotonConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}
