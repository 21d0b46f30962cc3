//! Tracing subscriber setup.
//!
//! Logs always go to stdout. With `--log-save` they are also written to
//! rolling files under [`DEFAULT_LOGS_PATH`], without ANSI colors.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogsConfig;

/// Directory holding the log files, relative to the working directory.
pub const DEFAULT_LOGS_PATH: &str = "logs";

const LOG_FILE_PREFIX: &str = "keywatch";
const LOG_FILE_SUFFIX: &str = "log";

/// Closest rotation period not longer than `life_span`. Zero keeps a single
/// file.
pub fn rotation_for(life_span: Duration) -> Rotation {
    match life_span.as_secs() {
        0 => Rotation::NEVER,
        1..=3599 => Rotation::MINUTELY,
        3600..=86399 => Rotation::HOURLY,
        _ => Rotation::DAILY,
    }
}

/// Rolling appender writing `keywatch.<date>.log` files into `dir`.
pub fn file_appender(dir: &Path, logs: &LogsConfig) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(rotation_for(Duration::from_secs(logs.log_file_life_span_in_sec)))
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(dir)
        .with_context(|| format!("creating log files in {}", dir.display()))
}

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop and must live until the application exits.
pub fn init(log_level: &str, save_to_file: Option<&LogsConfig>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level {log_level:?}"))?;

    let (file_layer, guard) = match save_to_file {
        Some(logs) => {
            let appender = file_appender(Path::new(DEFAULT_LOGS_PATH), logs)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
