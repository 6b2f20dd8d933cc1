use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the console and file log layers
///
/// * console: `RUST_LOG` if set, else INFO and above
/// * file: DEBUG and above, rotated daily under `./logs`
///
/// The returned guard owns the background file writer. Keep it alive for the
/// whole run (`let _guard = init_tracing();`), dropping it flushes the
/// buffered lines.
pub fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    // cliiink_backend.log.2026-10-19, cliiink_backend.log.2026-10-20, ...
    let file_appender = rolling::daily("./logs", "cliiink_backend.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Tracing initialized (console=RUST_LOG or INFO+, file=DEBUG+)");

    guard
}
