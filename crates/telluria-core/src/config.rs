//! Engine configuration: typed structs, YAML loading, env overrides.
//!
//! The canonical configuration lives in `telluria-config.yaml` at the
//! project root. All fields carry serde defaults so a missing file section
//! falls back to a runnable world. Environment variables override the file
//! for the values an operator most often wants to pin:
//!
//! - `TELLURIA_STORE_PATH` overrides `store.path`
//! - `TELLURIA_SEED` overrides `world.seed`
//! - `TELLURIA_TICK_INTERVAL_MS` overrides `world.tick_interval_ms`
//! - `TELLURIA_ORACLE_URL` overrides `oracle.endpoint`

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// World identity and pacing.
    #[serde(default)]
    pub world: WorldConfig,

    /// State-store location.
    #[serde(default)]
    pub store: StoreConfig,

    /// External decision-oracle endpoints (optional).
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Initial population shape.
    #[serde(default)]
    pub spawn: SpawnConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment-variable overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TELLURIA_STORE_PATH") {
            self.store.path = path;
        }
        if let Ok(seed) = std::env::var("TELLURIA_SEED") {
            if let Ok(seed) = seed.parse() {
                self.world.seed = seed;
            }
        }
        if let Ok(interval) = std::env::var("TELLURIA_TICK_INTERVAL_MS") {
            if let Ok(interval) = interval.parse() {
                self.world.tick_interval_ms = interval;
            }
        }
        if let Ok(endpoint) = std::env::var("TELLURIA_ORACLE_URL") {
            self.oracle.endpoint = Some(endpoint);
        }
    }
}

/// World identity and pacing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for world generation and the deterministic weather fallback.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Hex map radius.
    #[serde(default = "default_radius")]
    pub radius: i32,

    /// Real-time milliseconds per tick at speed 1.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Initial speed multiplier (0 starts paused).
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            radius: default_radius(),
            tick_interval_ms: default_tick_interval_ms(),
            speed: default_speed(),
        }
    }
}

/// State-store location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Path handed to the state store.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// External oracle endpoints. The engine runs fine without them; when
/// `required` is set and the endpoint is unusable, startup fails with the
/// provider-misconfiguration exit code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct OracleConfig {
    /// Decision-oracle endpoint URL, if any.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Call timeout in milliseconds.
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether a usable oracle is mandatory for this deployment.
    #[serde(default)]
    pub required: bool,
}

/// Initial population shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpawnConfig {
    /// Settlements seeded at world creation.
    #[serde(default = "default_settlements")]
    pub settlements: u32,

    /// Agents per seeded settlement.
    #[serde(default = "default_agents_per_settlement")]
    pub agents_per_settlement: u32,

    /// Named Tier-2 agents across the world.
    #[serde(default = "default_named_agents")]
    pub named_agents: u32,

    /// Starting crowns per seed agent (the world's money supply).
    #[serde(default = "default_initial_wealth")]
    pub initial_wealth: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            settlements: default_settlements(),
            agents_per_settlement: default_agents_per_settlement(),
            named_agents: default_named_agents(),
            initial_wealth: default_initial_wealth(),
        }
    }
}

fn default_world_name() -> String {
    String::from("telluria")
}

const fn default_seed() -> u64 {
    1_618
}

const fn default_radius() -> i32 {
    12
}

const fn default_tick_interval_ms() -> u64 {
    250
}

const fn default_speed() -> f64 {
    1.0
}

fn default_store_path() -> String {
    String::from("telluria-world.json")
}

const fn default_oracle_timeout_ms() -> u64 {
    5_000
}

const fn default_settlements() -> u32 {
    5
}

const fn default_agents_per_settlement() -> u32 {
    60
}

const fn default_named_agents() -> u32 {
    30
}

const fn default_initial_wealth() -> u64 {
    25
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = EngineConfig::parse("{}").unwrap();
        assert_eq!(config.world.seed, 1_618);
        assert_eq!(config.world.radius, 12);
        assert_eq!(config.spawn.settlements, 5);
        assert!(config.oracle.endpoint.is_none());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
world:
  seed: 42
  radius: 8
store:
  path: /tmp/w.json
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.world.radius, 8);
        assert_eq!(config.store.path, "/tmp/w.json");
        // Untouched defaults survive.
        assert_eq!(config.world.tick_interval_ms, 250);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(EngineConfig::parse("world: [not a map").is_err());
    }
}
