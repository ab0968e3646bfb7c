//! Process-wide configuration.
//!
//! Defaults that per-call options fall back to, read from a TOML file:
//!
//! ```toml
//! [serialize]
//! unloaded = "warn"        # fetch | warn | raise
//!
//! [populate]
//! unmatched_key = "reject" # create | reject
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//! ```
//!
//! `${VAR}` references are replaced by environment variables before parsing.
//!
//! # Environment Variables
//!
//! - `MODELMAP_CONFIG` - Path of the TOML file loaded by [`ModelMapConfig::from_env`]
//! - `MODELMAP_UNLOADED` - Overrides `serialize.unloaded`
//! - `MODELMAP_UNMATCHED_KEY` - Overrides `populate.unmatched_key`

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::populate::UnmatchedKeyPolicy;
use crate::serialize::UnloadedPolicy;

static GLOBAL: OnceLock<ModelMapConfig> = OnceLock::new();

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMapConfig {
    /// Serialization defaults.
    #[serde(default)]
    pub serialize: SerializeConfig,

    /// Population defaults.
    #[serde(default)]
    pub populate: PopulateConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serialization defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializeConfig {
    /// Policy for relationships that are not loaded.
    #[serde(default)]
    pub unloaded: UnloadedPolicy,
}

/// Population defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulateConfig {
    /// Policy for payload keys matching no existing record.
    #[serde(default)]
    pub unmatched_key: UnmatchedKeyPolicy,
}

/// Logging settings, applied by [`crate::logging::init_with_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default)]
    pub level: Option<String>,

    /// Output format (json, pretty, compact).
    #[serde(default)]
    pub format: Option<String>,
}

impl ModelMapConfig {
    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModelError::configuration(format!("cannot read {}: {}", path.display(), e))
                .with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ModelResult<Self> {
        let expanded = expand_env_vars(content)?;
        Ok(toml::from_str(&expanded)?)
    }

    /// Load configuration from the environment.
    ///
    /// Reads the file named by `MODELMAP_CONFIG` if set, then applies the
    /// `MODELMAP_UNLOADED` and `MODELMAP_UNMATCHED_KEY` overrides.
    pub fn from_env() -> ModelResult<Self> {
        let mut config = match std::env::var("MODELMAP_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(value) = std::env::var("MODELMAP_UNLOADED") {
            config.serialize.unloaded = UnloadedPolicy::parse(&value).ok_or_else(|| {
                ModelError::configuration(format!("MODELMAP_UNLOADED: unknown policy '{}'", value))
            })?;
        }
        if let Ok(value) = std::env::var("MODELMAP_UNMATCHED_KEY") {
            config.populate.unmatched_key = UnmatchedKeyPolicy::parse(&value).ok_or_else(|| {
                ModelError::configuration(format!(
                    "MODELMAP_UNMATCHED_KEY: unknown policy '{}'",
                    value
                ))
            })?;
        }

        Ok(config)
    }

    /// Set the unloaded relationship policy.
    pub fn with_unloaded(mut self, policy: UnloadedPolicy) -> Self {
        self.serialize.unloaded = policy;
        self
    }

    /// Set the unmatched key policy.
    pub fn with_unmatched_key(mut self, policy: UnmatchedKeyPolicy) -> Self {
        self.populate.unmatched_key = policy;
        self
    }
}

/// Install the process-wide configuration.
///
/// Fails if a configuration is already in place, either installed or loaded
/// lazily by [`global`].
pub fn install(config: ModelMapConfig) -> ModelResult<()> {
    GLOBAL
        .set(config)
        .map_err(|_| ModelError::configuration("a global configuration is already installed"))
}

/// The process-wide configuration.
///
/// Loaded from the environment on first use when none was installed; an
/// invalid environment falls back to the defaults with a warning.
pub fn global() -> &'static ModelMapConfig {
    GLOBAL.get_or_init(|| {
        ModelMapConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid modelmap configuration");
            ModelMapConfig::default()
        })
    })
}

/// Replace `${VAR}` references with environment variables.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> ModelResult<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ModelError::internal(e.to_string()))?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    Ok(result)
}
