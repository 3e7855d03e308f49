//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional
//! `finc-marc.toml` in the working directory, then `FINC_MARC_*`
//! environment variables with `__` between nested keys, e.g.
//! `FINC_MARC_OUTPUT__ENCODING=windows-1252` or `FINC_MARC_LOGGING__LEVEL=debug`.
//!
//! ```toml
//! formats_file = "formats.json"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [output]
//! encoding = "utf-8"
//! ```

use crate::encoding::TargetEncoding;
use crate::error::{ConvertError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "finc-marc.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "FINC_MARC";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive: trace, debug, info, warn, error, off, or a full
    /// `tracing` filter such as `finc_marc::driver=debug`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Character encoding of written records
    pub encoding: TargetEncoding,
}

/// All settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logging
    pub logging: LoggingSettings,
    /// Output
    pub output: OutputSettings,
    /// JSON format table replacing the built-in one
    pub formats_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `finc-marc.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Config`] if a source holds invalid values.
    pub fn load() -> Result<Self> {
        Self::build(Path::new(DEFAULT_CONFIG_FILE), false, Self::environment())
    }

    /// Load settings from a specific file, which must exist, and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Config`] if the file is missing or invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(path, true, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    fn build(path: &Path, required: bool, environment: Environment) -> Result<Self> {
        let name = path.to_str().ok_or_else(|| {
            ConvertError::Config(format!("config path is not valid UTF-8: {}", path.display()))
        })?;
        Config::builder()
            .add_source(File::new(name, FileFormat::Toml).required(required))
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConvertError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(Some(map))
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::build(&dir.path().join("missing.toml"), false, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.output.encoding, TargetEncoding::Utf8);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finc-marc.toml");
        fs::write(
            &path,
            "formats_file = \"formats.json\"\n[logging]\nformat = \"json\"\n[output]\nencoding = \"windows-1252\"\n",
        )
        .unwrap();

        let settings = Settings::build(&path, true, env(&[])).unwrap();
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.output.encoding, TargetEncoding::Windows1252);
        assert_eq!(settings.formats_file, Some(PathBuf::from("formats.json")));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finc-marc.toml");
        fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        let settings = Settings::build(&path, true, env(&[("FINC_MARC_LOGGING__LEVEL", "debug")])).unwrap();
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finc-marc.toml");
        fs::write(&path, "[output]\nencoding = \"latin-9\"\n").unwrap();
        assert!(matches!(
            Settings::build(&path, true, env(&[])),
            Err(ConvertError::Config(_))
        ));
        assert!(matches!(
            Settings::load_from(&dir.path().join("absent.toml")),
            Err(ConvertError::Config(_))
        ));
    }
}
