use std::fs;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
pub fn init(level: &str) {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Non-blocking file appender with daily rotation
    let file_appender = tracing_appender::rolling::daily("logs", "channel-adapter.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let directive = format!("channel_adapter={level}");
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap_or_else(|_| "info".parse().unwrap())),
        )
        .with(file_layer)
        .with(console_layer)
        .init();

    // The guard must stay alive so logs are flushed on exit.
    std::mem::forget(guard);
}
