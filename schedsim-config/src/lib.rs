//! # schedsim configuration
//!
//! Layered configuration for the scheduler simulation.
//!
//! ## Features
//! - **Single source**: every model constant comes from here, nothing is hard-coded in the core
//! - **Validation**: field ranges via `validator`, cross-field checks in [`validation`]
//! - **Layering**: defaults, YAML files and `SCHEDSIM_*` environment variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod simulator;
mod sweep;
pub mod validation;

pub use error::ConfigError;
pub use simulator::InclusiveRange;
pub use simulator::SimulatorConfig;
pub use sweep::SweepConfig;

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
#[serde(default)]
pub struct SchedsimConfig {
    /// Parameters of a single run; also the base of every sweep run.
    #[validate(nested)]
    pub simulator: SimulatorConfig,

    /// Sweep grid and repetition settings.
    #[validate(nested)]
    pub sweep: SweepConfig,
}

impl SchedsimConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/schedsim.yaml`, if present
    /// 3. `config/<SCHEDSIM_ENV>.yaml`, if present (default environment: `default`)
    /// 4. `SCHEDSIM_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SchedsimConfig::default()));

        if Path::new("config/schedsim.yaml").exists() {
            figment = figment.merge(Yaml::file("config/schedsim.yaml"));
        }

        let env = std::env::var("SCHEDSIM_ENV").unwrap_or_else(|_| "default".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        figment
            .merge(Env::prefixed("SCHEDSIM_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.check()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path, with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(SchedsimConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SCHEDSIM_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.check()?;
                Ok(config)
            })
    }

    /// Field validation plus the cross-field checks of both sections.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        validation::check_simulator(&self.simulator)?;
        validation::check_sweep(&self.sweep)
    }
}
