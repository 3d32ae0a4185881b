//! Engine configuration loaded from TOML
//!
//! ```toml
//! max_progressive_states = 100
//! max_scene_states = 32
//! random_seed = 7
//! lengthening_fill = "seeded_random"   # silence | alternating | seeded_random
//! accent_toggle_policy = "reject_rest" # reject_rest | create_onset
//! ```

use crate::accent::AccentTogglePolicy;
use crate::progressive::{LengtheningFill, DEFAULT_MAX_STATES};
use crate::scene::DEFAULT_MAX_SCENES;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_progressive_states: usize,
    pub max_scene_states: usize,
    /// Fixed seed for random generators and lengthening fill
    pub random_seed: Option<u64>,
    pub lengthening_fill: LengtheningFill,
    pub accent_toggle_policy: AccentTogglePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_progressive_states: DEFAULT_MAX_STATES,
            max_scene_states: DEFAULT_MAX_SCENES,
            random_seed: None,
            lengthening_fill: LengtheningFill::default(),
            accent_toggle_policy: AccentTogglePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_toml_str(
            "random_seed = 5\nlengthening_fill = \"alternating\"\n",
        )
        .unwrap();
        assert_eq!(config.random_seed, Some(5));
        assert_eq!(config.lengthening_fill, LengtheningFill::Alternating);
        assert_eq!(config.max_progressive_states, 100);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(EngineConfig::from_toml_str("accent_toggle_policy = \"maybe\"").is_err());
    }
}
