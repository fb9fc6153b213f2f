//! Tracing setup: console output plus optional daily-rolling log files

use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "hostel-laundry.log";

/// Keeps the file writer alive; dropping it flushes pending lines
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter used when `RUST_LOG` is not set
pub fn default_directives(level: &str) -> String {
    format!("hostel_laundry_server={},tower_http=debug", level)
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig) -> io::Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let (file_writer, file_guard) = match &config.directory {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json())
            .with(file_writer.map(|w| fmt::layer().json().with_writer(w).with_ansi(false)))
            .init();
    } else {
        registry
            .with(fmt::layer())
            .with(file_writer.map(|w| fmt::layer().with_writer(w).with_ansi(false)))
            .init();
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("hostel_laundry_server=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
