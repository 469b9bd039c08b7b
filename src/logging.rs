//! Logger initialisation.
//!
//! The crate only talks to the `log` facade. Hosts that do not bring their own
//! logger can call [`init_logging`] once at startup to get `env_logger` output.

use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "airframe_gfx=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initialises the global logger once. Later calls are ignored.
///
/// The filter is taken from `config.env_filter`, then `RUST_LOG`, and falls
/// back to `info`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }
        builder.write_style(config.write_style);

        // A host or test harness may already have installed a logger.
        if builder.try_init().is_err() {
            log::debug!("logger already installed, keeping it");
        }
    });
}

/// Whether [`init_logging`] has run in this process.
pub fn logging_initialized() -> bool {
    INIT.is_completed()
}
