//! Run configuration loaded from `supplier.ron`.
//!
//! Every field is optional in the file; anything omitted takes the default
//! shown in [`AppConfig::default`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use supplier_engine::{LookupSettings, RetryPolicy, RunConfig};
use supplier_logging::{supplier_info, LogDestination};

pub const DEFAULT_CONFIG_PATH: &str = "supplier.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub endpoint: String,
    pub form_build_id: String,
    pub form_id: String,
    pub user_agent: String,
    pub envelope_index: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        let settings = LookupSettings::default();
        Self {
            endpoint: settings.endpoint,
            form_build_id: settings.form_build_id,
            form_id: settings.form_id,
            user_agent: settings.user_agent,
            envelope_index: settings.envelope_index,
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub progress_path: PathBuf,
    pub results_path: PathBuf,
    pub max_retries: u32,
    pub max_concurrency: usize,
    pub retry_delay_ms: u64,
    pub log_destination: LogTarget,
    pub log_level: LogLevel,
    pub log_path: PathBuf,
    pub lookup: LookupConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            input_dir: run.input_dir,
            progress_path: run.progress_path,
            results_path: run.results_path,
            max_retries: run.retry.max_attempts,
            max_concurrency: run.max_concurrency,
            retry_delay_ms: run.retry.delay.as_millis() as u64,
            log_destination: LogTarget::Both,
            log_level: LogLevel::Info,
            log_path: PathBuf::from("supplier.log"),
            lookup: LookupConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the config at `path`. A missing file yields the defaults; a
    /// malformed one is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {:?}", path));
            }
        };
        Self::parse(&content).with_context(|| format!("failed to parse config {:?}", path))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            input_dir: self.input_dir.clone(),
            progress_path: self.progress_path.clone(),
            results_path: self.results_path.clone(),
            retry: RetryPolicy {
                max_attempts: self.max_retries.max(1),
                delay: Duration::from_millis(self.retry_delay_ms),
            },
            max_concurrency: self.max_concurrency.max(1),
        }
    }

    pub fn lookup_settings(&self) -> LookupSettings {
        LookupSettings {
            endpoint: self.lookup.endpoint.clone(),
            form_build_id: self.lookup.form_build_id.clone(),
            form_id: self.lookup.form_id.clone(),
            user_agent: self.lookup.user_agent.clone(),
            envelope_index: self.lookup.envelope_index,
            connect_timeout: Duration::from_secs(self.lookup.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.lookup.request_timeout_secs),
            ..LookupSettings::default()
        }
    }

    pub fn log_summary(&self) {
        supplier_info!(
            "Input {:?}, progress {:?}, results {:?}, concurrency {}, retries {}",
            self.input_dir,
            self.progress_path,
            self.results_path,
            self.max_concurrency.max(1),
            self.max_retries.max(1)
        );
    }
}
