//! Application configuration
use std::{env, fs};

use chip8::prelude::Chip8Conf;
use serde::Deserialize;

use crate::{error::AppError, inputmap::InputDef};

/// Configuration used when no file is given.
pub const DEFAULT_CONFIG: &str = include_str!("../config.yaml");

/// Environment variable naming a configuration file to use instead of the default.
pub const CONFIG_ENV: &str = "CHIP8_CONFIG";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Size of one chip8 pixel, in window pixels.
    pub scale: u32,
    pub vm: Chip8Conf,
    pub keys: Vec<InputDef>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scale: 10,
            vm: Chip8Conf::default(),
            keys: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load the file named by `CHIP8_CONFIG`, falling back to the builtin configuration.
    pub fn load() -> Result<Self, AppError> {
        match env::var_os(CONFIG_ENV) {
            Some(filepath) => {
                log::info!("load config: {}", filepath.to_string_lossy());
                let source = fs::read_to_string(filepath)?;
                Self::from_yaml(&source)
            }
            None => Self::from_yaml(DEFAULT_CONFIG),
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self, AppError> {
        let config: Self = serde_yaml::from_str(source)?;
        log::debug!("loaded config: {:#?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::from_yaml(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.scale, 10);
        assert_eq!(config.vm.cycles_per_frame, 10);
        assert_eq!(config.vm.seed, None);
        // Every keypad key, and the exit action.
        assert_eq!(config.keys.len(), 17);
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_yaml("scale: 4\nvm:\n  seed: 12\n").unwrap();

        assert_eq!(config.scale, 4);
        assert_eq!(config.vm.cycles_per_frame, 10);
        assert_eq!(config.vm.seed, Some(12));
        assert!(config.keys.is_empty());
    }

    #[test]
    fn test_invalid_key() {
        let result = AppConfig::from_yaml("keys:\n  - chip8: 16\n    keyboard_keys: [A]\n");
        assert!(result.is_err());
    }
}
