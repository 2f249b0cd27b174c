//! Log file setup
//!
//! Logs go to a file, never to the terminal. `RESTACK_LOG` (an `EnvFilter`
//! directive such as `restack=debug`) overrides the configured level.
//! Tail with: `tail -f $TMPDIR/restack.log`

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "RESTACK_LOG";

const DEFAULT_FILE_NAME: &str = "restack.log";

/// Directory and file name the log is written to
pub fn log_path(config: &LogConfig) -> (PathBuf, String) {
    match &config.file {
        Some(file) => {
            let dir = file
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            let name = file
                .file_name()
                .map_or_else(|| DEFAULT_FILE_NAME.to_string(), |n| n.to_string_lossy().into_owned());
            (dir, name)
        }
        None => (std::env::temp_dir(), DEFAULT_FILE_NAME.to_string()),
    }
}

fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config.level.trim()))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn open_appender(dir: &Path, name: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
}

/// Install the global subscriber; a second call is a no-op
///
/// If the configured file cannot be opened, logs go to the default file and
/// the problem is returned so it can be reported with the config issues.
pub fn init(config: &LogConfig) -> Option<String> {
    let (dir, name) = log_path(config);
    let (appender, issue) = match open_appender(&dir, &name) {
        Ok(appender) => (appender, None),
        Err(err) => {
            let issue = format!("cannot open log file {:?}: {err}", dir.join(&name));
            match open_appender(&std::env::temp_dir(), DEFAULT_FILE_NAME) {
                Ok(appender) => (appender, Some(issue)),
                Err(_) => return Some(issue),
            }
        }
    };

    let installed = tracing_subscriber::fmt()
        .with_writer(appender)
        .with_env_filter(filter(config))
        .with_ansi(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
    issue
}
