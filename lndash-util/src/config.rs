use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use triggered::Listener;

use lndash_core::{Models, PollIntervals, Poller};

use crate::env_var::{
    lndash_datadir, lndash_log_level, lndash_request_timeout, LOG_LEVEL_VAR, REQUEST_TIMEOUT_VAR,
};

/// Data directory under the home directory when none is configured
pub const DEFAULT_DIR: &str = ".lndash";

/// Accepted log levels
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize config")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("home directory not found")]
    NoHomeDir,
}

/// Refresh intervals, in seconds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct IntervalsConfig {
    pub info: u64,
    pub balances: u64,
    pub channels: u64,
    pub transactions: u64,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        let defaults = PollIntervals::default();
        IntervalsConfig {
            info: defaults.info.as_secs(),
            balances: defaults.balances.as_secs(),
            channels: defaults.channels.as_secs(),
            transactions: defaults.transactions.as_secs(),
        }
    }
}

/// Dashboard settings, read from a TOML file.
///
/// ```toml
/// datadir = "/var/lib/lndash"
/// log_level = "debug"
/// request_timeout_secs = 10
///
/// [intervals]
/// channels = 2
/// ```
///
/// Missing keys take their defaults. `LNDASH_DATADIR`, `LNDASH_LOG_LEVEL` and
/// `LNDASH_REQUEST_TIMEOUT` override the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub datadir: Option<String>,
    pub log_level: String,
    /// zero disables the timeout
    pub request_timeout_secs: u64,
    pub intervals: IntervalsConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            datadir: None,
            log_level: "info".to_string(),
            request_timeout_secs: 30,
            intervals: IntervalsConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Read the config file if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        info!("config: {:?}", config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(datadir) = lndash_datadir() {
            self.datadir = Some(datadir);
        }
        if let Some(level) = lndash_log_level() {
            self.log_level = level;
        }
        if let Some(timeout) = lndash_request_timeout() {
            self.request_timeout_secs = timeout.trim().parse().map_err(|_| {
                ConfigError::InvalidValue { key: REQUEST_TIMEOUT_VAR.to_string(), value: timeout }
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: LOG_LEVEL_VAR.to_string(),
                value: self.log_level.clone(),
            });
        }
        let intervals = [
            ("intervals.info", self.intervals.info),
            ("intervals.balances", self.intervals.balances),
            ("intervals.channels", self.intervals.channels),
            ("intervals.transactions", self.intervals.transactions),
        ];
        for (key, secs) in intervals {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: secs.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The configured data directory, or `~/.lndash`
    pub fn datadir(&self) -> Result<PathBuf, ConfigError> {
        match &self.datadir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => {
                let mut datadir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
                datadir.push(DEFAULT_DIR);
                Ok(datadir)
            }
        }
    }

    pub fn poll_intervals(&self) -> PollIntervals {
        PollIntervals {
            info: Duration::from_secs(self.intervals.info),
            balances: Duration::from_secs(self.intervals.balances),
            channels: Duration::from_secs(self.intervals.channels),
            transactions: Duration::from_secs(self.intervals.transactions),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// A poller for `models` driven by this config
    pub fn poller(&self, models: Arc<Models>, shutdown_signal: Listener) -> Poller {
        Poller::new(models, self.poll_intervals(), self.request_timeout(), shutdown_signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_var::DATADIR_VAR;
    use lndash_core::util::mocks::MockNodeClient;
    use lndash_core::Status;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;
    use test_log::test;

    // tests that touch the environment must not overlap
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_test() {
        let config = DashboardConfig::from_toml("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.poll_intervals(), PollIntervals::default());
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_file_test() {
        let config = DashboardConfig::from_toml(
            r#"
            log_level = "debug"
            request_timeout_secs = 0

            [intervals]
            channels = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.poll_intervals().channels, Duration::from_secs(2));
        assert_eq!(config.poll_intervals().info, PollIntervals::default().info);
    }

    #[test]
    fn unknown_key_test() {
        assert!(matches!(
            DashboardConfig::from_toml("refresh = 3"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DashboardConfig::from_toml("[intervals]\nrouting = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validate_test() {
        let mut config = DashboardConfig::default();
        config.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = DashboardConfig::default();
        config.intervals.balances = 0;
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "intervals.balances"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn toml_round_trip_test() {
        let mut config = DashboardConfig::default();
        config.datadir = Some("/tmp/lndash".to_string());
        let text = config.to_toml().unwrap();
        assert_eq!(DashboardConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn env_overrides_file_test() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datadir = \"/from/file\"\nlog_level = \"warn\"").unwrap();

        env::set_var(DATADIR_VAR, "/from/env");
        env::set_var(REQUEST_TIMEOUT_VAR, "7");
        let config = DashboardConfig::load(Some(file.path()));
        env::remove_var(DATADIR_VAR);
        env::remove_var(REQUEST_TIMEOUT_VAR);

        let config = config.unwrap();
        assert_eq!(config.datadir().unwrap(), PathBuf::from("/from/env"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn bad_env_test() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(REQUEST_TIMEOUT_VAR, "soon");
        let config = DashboardConfig::load(None);
        env::remove_var(REQUEST_TIMEOUT_VAR);
        assert!(matches!(config, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn missing_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lndash.toml");
        assert!(matches!(DashboardConfig::from_file(&path), Err(ConfigError::Read { .. })));
    }

    #[test(tokio::test(start_paused = true))]
    async fn poller_from_config_test() {
        let client = Arc::new(MockNodeClient::new());
        client.fail_all(Status::unavailable("offline"));
        let models = Arc::new(Models::new(client.clone()));
        let config = DashboardConfig::from_toml("[intervals]\ninfo = 1").unwrap();

        let (trigger, listener) = triggered::trigger();
        let handle = config.poller(models, listener).start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.trigger();
        handle.await.unwrap();
        assert_eq!(client.info_calls(), 3);
    }
}
