//! Subscriber setup: console layer (pretty or JSON) on stderr plus an
//! optional JSON-lines file layer from `[logging]`.

use crate::cli::Cli;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Install the global subscriber. The returned guard flushes the file layer
/// when dropped, so keep it alive until the process is done logging.
pub fn init(cli: &Cli, logging: &rover_config::Logging) -> eyre::Result<Option<WorkerGuard>> {
    // RUST_LOG wins over --log-level.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    let console: Box<dyn Layer<Registry> + Send + Sync> = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let (file, guard) = match logging.file.as_deref() {
        Some(path) => {
            let level = logging.level.as_deref().unwrap_or("info");
            let (writer, guard) = file_writer(Path::new(path), logging.rotation.as_deref())?;
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::try_new(level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()?;
    Ok(guard)
}

fn file_writer(path: &Path, rotation: Option<&str>) -> eyre::Result<(NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let Some(name) = path.file_name() else {
        eyre::bail!("logging.file {path:?} has no file name");
    };
    let appender = match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    Ok(tracing_appender::non_blocking(appender))
}
