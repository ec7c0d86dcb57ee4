use tracing::warn;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "server-monitor.log";

/// Daily-rotated `server-monitor.log.<date>` under `log_dir`, creating the
/// directory if needed.
pub fn open_log_file(log_dir: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
}

/// Installs the global subscriber: JSON lines into a daily-rotated file under
/// `log_dir`, human-readable lines on stdout. `RUST_LOG` overrides the default
/// `info` filter. If the log file cannot be opened, only stdout is used.
pub fn init_logging(log_dir: &str) {
    let (file_layer, file_error) = match open_log_file(log_dir) {
        Ok(appender) => {
            let layer = fmt::layer().with_writer(appender).with_ansi(false).json();
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // sqlx logs every statement at info; the probe query is not interesting.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    if let Some(e) = file_error {
        warn!(log_dir, error = %e, "Could not open log file; logging to stdout only.");
    }
}
