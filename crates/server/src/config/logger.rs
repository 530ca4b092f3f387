use serde::Deserialize;

use crate::core::serde::default_true;

#[derive(Clone, Debug, Deserialize)]
pub struct LoggerConfig {
    /// Max log level, or any `EnvFilter` directive string.
    ///
    /// See also:
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives
    ///
    /// default: "info"
    #[serde(default = "default_level")]
    pub level: String,

    // pretty, compact, json
    #[serde(default = "default_format")]
    pub format: String,

    /// Output logs with ANSI colours.
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            ansi_colors: true,
        }
    }
}

/// do debug logging by default for debug builds
#[must_use]
pub fn default_level() -> String {
    cfg!(debug_assertions).then_some("debug").unwrap_or("info").to_owned()
}

#[must_use]
pub fn default_format() -> String {
    "pretty".to_owned()
}
