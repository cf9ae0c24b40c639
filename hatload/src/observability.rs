//! Tracing setup for the `hatload` binary.

use std::env;
use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::config::{LogFormat, Logging};

/// Crates whose logs follow the configured level. Everything else is capped at `WARN`.
const CRATE_NAMES: &[&str] = &["hatload"];

/// Installs the global tracing subscriber writing to stderr.
pub fn init_tracing(logging: &Logging) {
    let env_filter = EnvFilter::new(filter_directives(
        env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        logging.level,
    ));

    let format = match logging.format {
        LogFormat::Auto if std::io::stderr().is_terminal() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        format => format,
    };

    let pretty = (format == LogFormat::Pretty).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let simplified = (format == LogFormat::Simplified).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .compact()
    });
    let json = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(simplified)
        .with(json)
        .init();
}

/// Builds the filter directives from `RUST_LOG` and the configured level.
///
/// A plain level in `RUST_LOG` replaces the configured level. Anything else is used literally.
fn filter_directives(rust_log: Option<&str>, level: LevelFilter) -> String {
    let level = match rust_log {
        Some(value) if !value.is_empty() => match value.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => return value.to_owned(),
        },
        _ => level,
    };

    let mut directives = String::from("WARN");
    for name in CRATE_NAMES {
        directives.push_str(&format!(",{name}={level}"));
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level() {
        assert_eq!(
            filter_directives(None, LevelFilter::INFO),
            "WARN,hatload=info"
        );
    }

    #[test]
    fn rust_log_level_wins() {
        assert_eq!(
            filter_directives(Some("trace"), LevelFilter::INFO),
            "WARN,hatload=trace"
        );
    }

    #[test]
    fn rust_log_directives_used_literally() {
        assert_eq!(
            filter_directives(Some("hatload=debug,reqwest=trace"), LevelFilter::INFO),
            "hatload=debug,reqwest=trace"
        );
    }
}
