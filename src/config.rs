// Runtime configuration and logging setup

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::downloader::ytdlp::YtDlpEngine;

/// Log file, created in the working directory
pub const LOG_FILE_NAME: &str = "downloader.log";

/// Hosts a URL must point at to be accepted
pub const ACCEPTED_HOSTS: [&str; 3] = ["youtube.com", "www.youtube.com", "youtu.be"];

pub const EXTRACT_TIMEOUT_ENV: &str = "YTDLP_EXTRACT_TIMEOUT";
const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LOG_FILTER: &str = "info";
const LOG_TIME_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log timestamp format: {0}")]
    TimeFormat(String),

    #[error("logging is already initialized")]
    LoggingAlreadyInitialized,
}

/// Keeps the background log writer alive; drop it last to flush the file
pub type LogGuard = WorkerGuard;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_file: PathBuf,
    pub log_filter: String,
    pub default_download_dir: PathBuf,
    pub ytdlp_binary: PathBuf,
    pub extract_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let log_filter = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let extract_timeout = std::env::var(EXTRACT_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_EXTRACT_TIMEOUT_SECS);

        Self {
            log_file: PathBuf::from(LOG_FILE_NAME),
            log_filter,
            default_download_dir: default_download_dir(),
            ytdlp_binary: YtDlpEngine::locate(),
            extract_timeout: Duration::from_secs(extract_timeout),
        }
    }

    pub fn engine(&self) -> YtDlpEngine {
        YtDlpEngine::new(self.ytdlp_binary.clone(), self.extract_timeout)
    }
}

/// `~/Downloads`, else the platform download dir, else the working directory
pub fn default_download_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Downloads"))
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Install the global subscriber: console (stderr) plus append-only log file
pub fn init_logging(config: &AppConfig) -> Result<LogGuard, ConfigError> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let format = time::format_description::parse(LOG_TIME_FORMAT)
        .map_err(|e| ConfigError::TimeFormat(e.to_string()))?;
    let timer = UtcTime::new(format);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|source| ConfigError::LogFile {
            path: config.log_file.clone(),
            source,
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_timer(timer)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| ConfigError::LoggingAlreadyInitialized)?;

    Ok(guard)
}
