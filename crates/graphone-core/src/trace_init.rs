//! JSONL trace output for training runs (feature `trace`).

use std::path::Path;

#[cfg(feature = "trace")]
use std::sync::Once;

/// File written inside `log_dir`.
pub const TRACE_FILE_NAME: &str = "graphone-trace.jsonl";

#[cfg(feature = "trace")]
static INIT: Once = Once::new();

/// Install a JSON subscriber writing to `log_dir/graphone-trace.jsonl`.
///
/// Writes are blocking so the last EM iterations are on disk when a batch
/// run exits. Only the first call in a process has any effect.
/// `RUST_LOG` overrides the default `graphone_core=debug` filter.
#[cfg(feature = "trace")]
pub fn init_tracing(log_dir: &Path) {
    INIT.call_once(|| {
        let file_appender = tracing_appender::rolling::never(log_dir, TRACE_FILE_NAME);

        tracing_subscriber::fmt()
            .json()
            .with_writer(file_appender)
            .with_target(true)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("graphone_core=debug")),
            )
            .init();
    });
}

#[cfg(not(feature = "trace"))]
pub fn init_tracing(_log_dir: &Path) {}
