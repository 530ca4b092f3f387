//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::LoggerConfig;
use crate::{AppError, AppResult};

/// Installs the global subscriber described by `conf`.
///
/// `format` is one of `pretty`, `compact` or `json`; anything else falls back
/// to `pretty`.
pub fn init(conf: &LoggerConfig) -> AppResult<()> {
    let filter = EnvFilter::try_new(&conf.level)
        .map_err(|e| AppError::public(format!("invalid log level `{}`: {e}", conf.level)))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(conf.ansi_colors)
        .with_span_events(FmtSpan::CLOSE);

    let result = match &*conf.format {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().without_time().try_init(),
        _ => builder.pretty().try_init(),
    };
    result.map_err(|e| AppError::internal(format!("failed to install logger: {e}")))
}
