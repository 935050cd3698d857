//! Logging and tracing configuration
//!
//! Console logs go to stderr so stdout stays free for reports. Each run can
//! also write a full-detail log file into the data directory.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Handle returned by [`init_cli`]; keep it alive until the process exits
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
    /// Path of the per-run log file, if one was opened
    pub file: Option<PathBuf>,
}

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies.
pub fn init_cli(verbose: bool, file_logging: bool) -> LogGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("webscenario=debug,warn")
        } else {
            EnvFilter::new("webscenario=info,warn")
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file_target = if file_logging {
        match paths::ensure_log_dir() {
            Ok(Some(dir)) => Some((dir.clone(), run_log_name())),
            Ok(None) => None,
            Err(e) => {
                eprintln!("Warning: Could not create log directory: {}", e);
                None
            }
        }
    } else {
        None
    };

    if let Some((dir, name)) = file_target {
        let appender = tracing_appender::rolling::never(&dir, &name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        // File logging with full details
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();

        return LogGuard {
            _guard: Some(guard),
            file: Some(dir.join(name)),
        };
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();

    LogGuard {
        _guard: None,
        file: None,
    }
}

/// File name of the log for a run started now
fn run_log_name() -> String {
    format!("run_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}
