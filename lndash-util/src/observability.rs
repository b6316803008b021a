use std::error::Error;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::env_var::compare_env_var;

/** create a non blocking tracing file appender writing `<datadir>/<who>.log` */
pub fn setup_file_appender<P: AsRef<Path>>(datadir: P, who: &str) -> (NonBlocking, WorkerGuard) {
    let file_appender = rolling::never(datadir.as_ref(), format!("{}.log", who));

    tracing_appender::non_blocking(file_appender)
}

/** create a RUST_LOG env based log filter, falling back to `default_level` */
pub fn env_filter(default_level: &str) -> Result<EnvFilter, Box<dyn Error>> {
    let level = LevelFilter::from_str(default_level)?;
    Ok(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
}

/**
 * Initialize tracing-subscriber with env filter based on RUST_LOG env variable.
 * fmt layer is used to print logs to stdout.
 * fmt layer with custom writer is used to write logs to log file in datadir.
 * `log` records from the core crate are forwarded to the same layers.
 */
pub fn init_tracing_subscriber<P: AsRef<Path>>(
    datadir: P,
    who: &str,
    default_level: &str,
) -> Result<LogGuard, Box<dyn Error>> {
    fs::create_dir_all(datadir.as_ref())?;
    let (file_writer, file_guard) = setup_file_appender(datadir, who);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(!compare_env_var("NO_COLOR", "1"))
        .with_target(false)
        .with_source_location(true)
        .compact();

    let stdout_layer = fmt::layer().event_format(format.clone()).with_writer(std::io::stdout);
    let file_layer = fmt::layer().event_format(format.with_ansi(false)).with_writer(file_writer);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter(default_level)?)
        .try_init()?;
    Ok(LogGuard::new(file_guard))
}

/// Flushes the log file when dropped
pub struct LogGuard {
    _file_appender_guard: WorkerGuard,
}

impl LogGuard {
    /// Hold `file_appender_guard` until this guard is dropped
    pub fn new(file_appender_guard: WorkerGuard) -> Self {
        Self { _file_appender_guard: file_appender_guard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_file_appender_test() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("lndash.log");

        let (file_writer, file_guard) = setup_file_appender(dir.path(), "lndash");
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .with(EnvFilter::new("info"));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("channel 7ab3:1 enriched");
            tracing::debug!("filtered out");
        });
        drop(file_guard);

        let contents = fs::read_to_string(&file_path).expect("failed to read file");
        assert!(contents.contains("channel 7ab3:1 enriched"));
        assert!(!contents.contains("filtered out"));
    }

    #[test]
    fn env_filter_test() {
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("loud").is_err());
    }
}
