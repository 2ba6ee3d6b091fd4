//! Boot: logging init and layered configuration load.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::{CheckerConfig, ConfigError};
use super::cli::CliArgs;

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracecheck=info,trace_checker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// File, then environment, then command line; validated.
pub fn load_config(args: &CliArgs) -> Result<CheckerConfig, ConfigError> {
    let mut config = CheckerConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    info!(
        "Loaded configuration: marker={:?}, output_dir={}, servers={}",
        config.marker,
        config.output_dir.display(),
        if config.servers.is_empty() {
            "discovered".to_string()
        } else {
            config.servers.join(",")
        }
    );
    Ok(config)
}
