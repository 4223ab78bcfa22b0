//! Tracing subscriber setup for the pipeline binary.
//!
//! Console output goes to stderr so stdout stays free for reports. A daily
//! rolling file is added when [`LogOptions::file_dir`] is set.

use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_PREFIX: &str = "tutor.log";
const FALLBACK_LEVEL: &str = "info";

/// Resolved logging configuration; see [`crate::config::Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogOptions {
    /// An `EnvFilter` directive string such as `info,tutor_engine=debug`.
    pub level: String,
    pub file_dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: FALLBACK_LEVEL.to_string(),
            file_dir: None,
        }
    }
}

/// Keeps the background file writer alive; drop it last.
pub struct FileLogGuard {
    _guard: WorkerGuard,
    dir: PathBuf,
}

impl FileLogGuard {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Parses `level`, falling back to `info` on a malformed directive.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|err| {
        eprintln!("invalid log filter {level:?} ({err}), using {FALLBACK_LEVEL}");
        EnvFilter::new(FALLBACK_LEVEL)
    })
}

fn file_writer(dir: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber. Later calls leave the first one in place.
pub fn init_tracing(options: &LogOptions) -> Option<FileLogGuard> {
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(true);

    let file = options.file_dir.as_deref().and_then(|dir| match file_writer(dir) {
        Ok((writer, guard)) => Some((writer, guard, dir.to_path_buf())),
        Err(err) => {
            eprintln!("failed to open log directory {}: {err}", dir.display());
            None
        }
    });
    let (file_layer, guard) = match file {
        Some((writer, guard, dir)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(FileLogGuard { _guard: guard, dir }),
        ),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(&options.level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
