//! Agent configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use wumpus_rules::Cell;

use crate::planner::PlannerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for one agent run. Every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Side length of the cave. Overridden by the map when running a simulation.
    pub grid_size: i32,

    /// Node expansions allowed per planner search.
    pub max_expansions: usize,

    /// Steps before a simulation is declared stalled.
    pub max_steps: usize,

    /// Cell the agent climbs out from.
    pub exit_cell: Cell,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            max_expansions: 200_000,
            max_steps: 1_000,
            exit_cell: Cell::START,
        }
    }
}

impl AgentConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < 1 {
            return Err(ConfigError::Invalid(format!(
                "grid_size must be positive, got {}",
                self.grid_size
            )));
        }
        if !self.exit_cell.in_bounds(self.grid_size) {
            return Err(ConfigError::Invalid(format!(
                "exit_cell {} lies outside a {}x{} cave",
                self.exit_cell, self.grid_size, self.grid_size
            )));
        }
        if self.max_expansions == 0 {
            return Err(ConfigError::Invalid("max_expansions must be positive".into()));
        }
        Ok(())
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            grid_size: self.grid_size,
            exit_cell: self.exit_cell,
            max_expansions: self.max_expansions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.planner_config(), PlannerConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let config = AgentConfig::from_toml_str(
            "grid_size = 4\nmax_steps = 50\nexit_cell = { x = 4, y = 1 }\n",
        )
        .unwrap();
        assert_eq!(config.grid_size, 4);
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.exit_cell, Cell::new(4, 1));
        assert_eq!(config.max_expansions, 200_000);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = AgentConfig::from_toml_str("grid_size = 4\nexit_cell = { x = 5, y = 1 }\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AgentConfig::from_toml_str("grid_size = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = AgentConfig::from_toml_str("max_expansions = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("wumpus-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agent.toml");

        let config = AgentConfig {
            grid_size: 6,
            max_steps: 300,
            ..AgentConfig::default()
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(AgentConfig::load(&path).unwrap(), config);

        assert!(matches!(
            AgentConfig::load(dir.join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
