use chrono::Local;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy)]
struct CompactTimer;

impl FormatTime for CompactTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%m%dT%H:%M:%S%.3f"))
    }
}

/// Initialize console logging, optionally mirrored to a file
///
/// Returns the worker guard for the non-blocking file writer; dropping it
/// flushes pending log lines. `level` is an env-filter directive string,
/// e.g. "info" or "edgemix=debug".
pub fn init(
    log_path: Option<&Path>,
    level: &str,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let console = tracing_subscriber::fmt::layer()
        .with_timer(CompactTimer)
        .with_writer(std::io::stdout)
        .with_filter(tracing_subscriber::EnvFilter::new(level));

    match log_path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_timer(CompactTimer)
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_filter(tracing_subscriber::EnvFilter::new(level)),
                )
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            Ok(None)
        }
    }
}
