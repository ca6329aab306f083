//! Tracing subscriber setup.
//!
//! Filter precedence: `RUST_LOG`, then `PORTFOLIO_KIT_LOG`, then the level
//! implied by `--verbose`. `PORTFOLIO_KIT_LOG_JSON=true` switches to JSON
//! lines. Logs go to stderr so command output on stdout stays clean.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub use_json: bool,
    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// `-v` shows the pipeline's info events, `-vv` and up everything down
    /// to individual git invocations
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        };
        Self {
            level,
            use_json: json_from_env(),
            include_location: verbose > 2,
        }
    }

    fn filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
        if let Ok(directives) = env::var("PORTFOLIO_KIT_LOG")
            && let Ok(filter) = EnvFilter::try_new(&directives)
        {
            return filter;
        }
        EnvFilter::new(format!(
            "warn,portfolio_kit={level},portfolio_kit_deployer={level},portfolio_kit_generator={level},tower_http={level}",
            level = self.level
        ))
    }
}

fn json_from_env() -> bool {
    env::var("PORTFOLIO_KIT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Install the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.filter();
        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}
