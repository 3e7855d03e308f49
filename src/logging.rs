//! Log output for the command-line tool.
//!
//! The library only emits `tracing` events. The binary installs a
//! subscriber writing text or JSON lines to stderr, so stdout stays free.
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{ConvertError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Build the event filter from `RUST_LOG` or, if unset, the configured level.
///
/// # Errors
///
/// Returns [`ConvertError::Config`] if the configured level is not a valid
/// filter directive.
pub fn build_env_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|e| {
        ConvertError::Config(format!("invalid log level '{}': {e}", settings.level))
    })
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`ConvertError::Config`] if the level is invalid or a subscriber
/// is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = build_env_filter(settings)?;
    let base_subscriber = Registry::default().with(filter);

    let installed = match settings.format {
        LogFormat::Json => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|e| ConvertError::Config(format!("cannot install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let settings = LoggingSettings {
            level: "finc_marc=loud".to_string(),
            ..LoggingSettings::default()
        };
        assert!(matches!(build_env_filter(&settings), Err(ConvertError::Config(_))));
    }

    #[test]
    fn test_level_directives_are_accepted() {
        for level in ["info", "off", "warn,finc_marc::driver=debug"] {
            let settings = LoggingSettings {
                level: level.to_string(),
                ..LoggingSettings::default()
            };
            assert!(build_env_filter(&settings).is_ok());
        }
    }
}
