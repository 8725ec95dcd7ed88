use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

/// Used when `RUST_LOG` is unset. HTTP client internals stay at warn.
const DEFAULT_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn";
const LOG_FILE_PREFIX: &str = "event-rag.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Sends events to stdout and to a daily file under `<data>/logs`.
///
/// Returns `false` if a global subscriber is already installed; that call's
/// file writer is dropped.
pub fn init(paths: &AppPaths) -> bool {
    let appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .is_ok();

    if installed {
        let _ = LOG_GUARD.set(guard);
    }
    installed
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn only_first_init_installs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data"));

        init(&paths);

        assert!(!init(&paths));
        assert!(paths.log_dir.is_dir());
    }
}
