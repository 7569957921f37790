use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// HTTP stack crates that log on every request and every SSE frame.
/// Matched as module path prefixes, so `hyper` also covers `hyper_util`.
const NOISY_DEPENDENCIES: &[&str] = &["tower", "tracing", "hyper", "axum", "mio"];

pub struct Logger;

impl Logger {
    /// Installs a terminal logger at the configured level.
    ///
    /// Below Trace the HTTP stack is silenced so that one log line per chat
    /// message does not drown in per-frame transport noise.
    pub fn init_logger(config: &Config) {
        let level = config.log_level_filter;

        if let Err(e) = TermLogger::init(
            level,
            Self::build_log_config(level),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ) {
            eprintln!("Logger was already initialized: {e}");
        }
    }

    fn hides_dependencies(level: LevelFilter) -> bool {
        level < LevelFilter::Trace
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();
        // Many connection tasks log concurrently; thread ids help at Debug.
        builder.set_thread_level(LevelFilter::Debug);

        if Self::hides_dependencies(level) {
            for module in NOISY_DEPENDENCIES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
