//! Logging setup for the `trafficlight` driver.
//!
//! Log lines go to stderr so they never interleave with observer output on
//! stdout. Each line carries the thread name, which separates the
//! `signal-timing` thread from the observer threads.
//!
//! Verbosity only raises this crate's own level; dependencies (the
//! Prometheus exporter and its HTTP stack) stay at `warn` until `-vvv`.
//! `TRAFFICLIGHT_LOG_LEVEL`, when set to a valid `EnvFilter` directive,
//! replaces the verbosity-derived filter entirely.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding an `EnvFilter` directive override.
pub const LOG_LEVEL_ENV: &str = "TRAFFICLIGHT_LOG_LEVEL";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Plain text, colored when stderr is a terminal.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Builds the filter directive for `-v` repeated `verbosity` times.
///
/// | `-v` count | directive |
/// | --- | --- |
/// | 0 | `warn` |
/// | 1 | `warn,trafficlight=info` |
/// | 2 | `warn,trafficlight=debug` |
/// | 3+ | `trace` |
#[must_use]
pub fn directive_for(verbosity: u8) -> String {
    let crate_level = match verbosity {
        0 => return "warn".to_string(),
        1 => "info",
        2 => "debug",
        _ => return "trace".to_string(),
    };
    format!("warn,{}={crate_level}", env!("CARGO_CRATE_NAME"))
}

/// Resolved subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    format: LogFormat,
    directive: String,
    ansi: bool,
    show_target: bool,
}

impl LogSettings {
    /// Resolves CLI flags against the environment.
    ///
    /// `env_directive` is the raw `TRAFFICLIGHT_LOG_LEVEL` value; an unparseable
    /// value is ignored in favor of the verbosity directive.
    fn resolve(
        format: LogFormat,
        verbosity: u8,
        color: ColorChoice,
        env_directive: Option<String>,
        stderr_is_terminal: bool,
        no_color: bool,
    ) -> Self {
        let directive = env_directive
            .filter(|d| EnvFilter::try_new(d).is_ok())
            .unwrap_or_else(|| directive_for(verbosity));
        let ansi = format == LogFormat::Human
            && match color {
                ColorChoice::Auto => stderr_is_terminal && !no_color,
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            };
        Self {
            format,
            directive,
            ansi,
            show_target: verbosity >= 2,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let settings = LogSettings::resolve(
        format,
        verbosity,
        color,
        std::env::var(LOG_LEVEL_ENV).ok(),
        std::io::stderr().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    );
    let filter = EnvFilter::new(&settings.directive);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(settings.show_target)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    let _ = match settings.format {
        LogFormat::Human => builder.with_ansi(settings.ansi).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
