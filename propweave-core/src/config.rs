#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Knobs for the matchers. Read from the `[matching]` table of a TOML file:
///
/// ```toml
/// [matching]
/// strict_function_capture = true
/// compare_param_types = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchOptions {
    /// A pattern function name seen twice must be matched by the same
    /// concrete function both times.
    pub strict_function_capture: bool,

    /// Also require in-parameters to agree on type shape, not only on
    /// declaration kind.
    pub compare_param_types: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            strict_function_capture: true,
            compare_param_types: false,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    #[serde(default)]
    matching: MatchOptions,
}

impl MatchOptions {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError {
            message: format!("failed to parse matcher options: {e}"),
        })?;
        Ok(parsed.matching)
    }

    /// Loads options from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no matcher config, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&raw).map_err(|e| ConfigError {
            message: format!("{}: {}", path.display(), e.message),
        })
    }
}
