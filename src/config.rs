// Layered settings
//
// Defaults, then a TOML file, then USBWIPE_* environment variables, then CLI flags.

use crate::erase::{ErasePolicy, FailureScope, PolicyKind};
use crate::platform::Platform;
use crate::{WipeError, WipeResult};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "USBWIPE";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Erase policy; the platform default when unset
    pub policy: Option<PolicyKind>,
    pub random_passes: u32,
    /// Whether an overwrite failure stops the whole run; the platform default when unset
    pub halt_on_overwrite_failure: Option<bool>,
    /// Where to write the JSON run report
    pub report_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: None,
            random_passes: 1,
            halt_on_overwrite_failure: None,
            report_path: None,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub policy: Option<PolicyKind>,
    pub random_passes: Option<u32>,
    pub halt_on_overwrite_failure: Option<bool>,
    pub report_path: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "usbwipe", "usbwipe")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

impl Settings {
    /// Load file and environment layers. An explicit path must exist; the default
    /// per-user file is optional.
    pub fn load(explicit: Option<&Path>) -> WipeResult<Self> {
        let mut builder = Config::builder();

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    tracing::debug!(path = %path.display(), "Looking for config file");
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| WipeError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn apply(mut self, overrides: CliOverrides) -> WipeResult<Self> {
        if let Some(policy) = overrides.policy {
            self.policy = Some(policy);
        }
        if let Some(passes) = overrides.random_passes {
            self.random_passes = passes;
        }
        if let Some(halt) = overrides.halt_on_overwrite_failure {
            self.halt_on_overwrite_failure = Some(halt);
        }
        if overrides.report_path.is_some() {
            self.report_path = overrides.report_path;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> WipeResult<()> {
        if self.random_passes == 0 {
            return Err(WipeError::Config(
                "random_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the policy for `platform`, filling unset values from its defaults
    pub fn erase_policy(&self, platform: Platform) -> ErasePolicy {
        let default = platform.default_policy(self.random_passes);
        match self.policy.unwrap_or_else(|| default.kind()) {
            PolicyKind::PartitionDestroy => ErasePolicy::PartitionDestroy,
            PolicyKind::SignatureOverwrite => {
                let failure_scope = match (self.halt_on_overwrite_failure, default) {
                    (Some(true), _) => FailureScope::Run,
                    (Some(false), _) => FailureScope::Device,
                    (None, ErasePolicy::SignatureOverwrite { failure_scope, .. }) => failure_scope,
                    (None, ErasePolicy::PartitionDestroy) => FailureScope::Device,
                };
                ErasePolicy::SignatureOverwrite {
                    random_passes: self.random_passes,
                    failure_scope,
                }
            }
        }
    }
}
