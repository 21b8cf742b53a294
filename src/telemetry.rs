use thiserror::Error;
use tracing::warn;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Pick the filter directive: `--verbose` beats the config file, which beats
/// the default. `RUST_LOG`, when set, overrides all of them in [`init`].
pub fn resolve_level(config_level: Option<&str>, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        config_level.unwrap_or(DEFAULT_LOG_LEVEL).to_string()
    }
}

/// Build the filter from `RUST_LOG` when it holds a usable directive,
/// otherwise from `level`. A rejected `RUST_LOG` value is handed back so the
/// caller can report it once logging is up.
fn build_filter(
    env_value: Option<&str>,
    level: &str,
) -> Result<(EnvFilter, Option<String>), TelemetryError> {
    let fallback = || {
        EnvFilter::try_new(level).map_err(|source| TelemetryError::EnvFilter {
            value: level.to_string(),
            source,
        })
    };

    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => match EnvFilter::try_new(raw) {
            Ok(filter) => Ok((filter, None)),
            Err(_) => Ok((fallback()?, Some(raw.to_string()))),
        },
        None => Ok((fallback()?, None)),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for reports and TSV output.
pub fn init(level: &str) -> Result<(), TelemetryError> {
    let env_value = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (env_filter, rejected) = build_filter(env_value.as_deref(), level)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)?;

    if let Some(raw) = rejected {
        warn!(value = %raw, fallback = %level, "ignoring invalid RUST_LOG filter");
    }
    Ok(())
}
