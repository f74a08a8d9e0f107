use std::io::Write;

use time::format_description::FormatItem;
use tracing::metadata::LevelFilter;
use tracing::{Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::{Context, Filter};
use tracing_subscriber::prelude::*;

use basalt_config::{Log, LogLevel};

/// Strips ANSI sequences before the bytes reach the file appender, so
/// file logs stay greppable. Just a decorator for the primary
/// [`Writer`].
///
/// [`Writer`]: std::io::Write
struct AnsiStripper<W: Write> {
    inner: W,
}

impl<W: Write> AnsiStripper<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
        }
    }
}

impl<W: Write> Write for AnsiStripper<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let stripped = strip_ansi_escapes::strip(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.inner.write_all(&stripped)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Drops events from dependency internals that would otherwise flood
/// TRACE-level output.
struct TargetFilter {
    ignore_targets: &'static [&'static str],
}

impl<S> Filter<S> for TargetFilter {
    fn enabled(&self, meta: &Metadata<'_>, _: &Context<'_, S>) -> bool {
        !self
            .ignore_targets
            .iter()
            .any(|target| meta.target().starts_with(target))
    }
}

fn ignore_targets_filter() -> TargetFilter {
    TargetFilter {
        ignore_targets: &[
            "want",
            "mio",
            "hyper",
            "reqwest::connect",
        ],
    }
}

pub fn configure_logger(config: &Log) -> Option<WorkerGuard> {
    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_timer(create_timer())
        .with_ansi(config.terminal.ansi)
        .with_filter(LevelFilter::from_level(convert_log_level(config.terminal.level)))
        .with_filter(ignore_targets_filter());

    let registry = tracing_subscriber::registry().with(terminal_layer);

    if config.file.enabled {
        let appender = AnsiStripper::new(tracing_appender::rolling::daily(
            config.file.path.clone(),
            config.file.file_prefix.clone(),
        ));
        let (file_writer, guard) = tracing_appender::non_blocking(appender);

        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_timer(create_timer())
                    .with_ansi(false)
                    .with_writer(file_writer)
                    .with_filter(LevelFilter::from_level(convert_log_level(config.file.level)))
                    .with_filter(ignore_targets_filter()),
            )
            .init();

        Some(guard)
    } else {
        registry.init();

        None
    }
}

fn convert_log_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

fn create_timer() -> OffsetTime<Vec<FormatItem<'static>>> {
    let timer = time::format_description::parse(
        "[year]-[month padding:zero]-[day padding:zero] [hour]:[minute]:[second]",
    )
    .unwrap();
    let time_offset =
        time::UtcOffset::current_local_offset().unwrap_or_else(|_| time::UtcOffset::UTC);

    OffsetTime::new(time_offset, timer)
}
