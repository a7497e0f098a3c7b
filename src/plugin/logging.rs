// Logging configuration for TPA System

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::config::LoggingSettings;

/// Target of every log line emitted by this crate
const CRATE_TARGET: &str = "tpa_system";

// Keep the guards alive for the lifetime of the program
static LOG_GUARD: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

/// Filter directive for the configured level: the host's own crates stay at
/// `warn`, this crate logs at `level`.
fn filter_directive(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        l @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => l.to_string(),
        _ => "info".to_string(),
    };
    format!("warn,{}={}", CRATE_TARGET, level)
}

/// Install the global subscriber from the `[logging]` settings.
///
/// `RUST_LOG` overrides the configured level. Returns false if a subscriber
/// was already installed (by the host, or by a previous enable), in which
/// case nothing changes.
pub fn init_logging(settings: &LoggingSettings, log_file_path: Option<PathBuf>) -> bool {
    let mut guards = Vec::new();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&settings.level)));

    let file_layer = log_file_path.and_then(|path| {
        let parent = path.parent()?;
        let file_name = path.file_name()?.to_str()?;

        let file_appender = tracing_appender::rolling::never(parent, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_thread_names(true),
        )
    });

    // Console lines go to the server's stdout next to its own log, so keep
    // them short
    let console_layer = settings.console.then(|| {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);

        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(false)
            .without_time()
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    if installed {
        let _ = LOG_GUARD.set(guards);
    }
    installed
}
