//! Log sinks for the crawler binaries.
//!
//! Subscribers are returned as a [`Dispatch`] and attached to the crawler
//! future with `WithSubscriber::with_subscriber`; nothing is installed
//! globally. Lines are written as `<timestamp> [<LEVEL>] <message>`.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use crate::error::CrawlerResult;
use crate::writer::RunStamp;

/// Event formatter producing `2024-01-05 09:00:01,123 [INFO] message`.
#[derive(Debug, Clone, Copy)]
pub struct LineFormat {
    offset: UtcOffset,
}

impl LineFormat {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let format = format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]"
        );
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        let timestamp = now.format(format).map_err(|_| fmt::Error)?;
        write!(writer, "{} [{}] ", timestamp, event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// The local offset, resolved once. Falls back to UTC where the platform
/// cannot report it.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn log_file_path(log_dir: &Path, stamp: &RunStamp) -> PathBuf {
    log_dir.join(format!("{}.log", stamp.date_label()))
}

/// Daily append-mode log file plus console output, filtered at INFO.
pub fn file_dispatch(
    log_dir: &Path,
    stamp: &RunStamp,
    offset: UtcOffset,
) -> CrawlerResult<Dispatch> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(log_dir, stamp))?;

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(LineFormat::new(offset))
                .with_writer(Mutex::new(file)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false));

    Ok(Dispatch::new(subscriber))
}

pub fn console_dispatch() -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_target(false)
        .finish();
    Dispatch::new(subscriber)
}

/// In-memory sink with the same line format as the log file; used to
/// inspect what a run logged.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self) -> Dispatch {
        let subscriber = tracing_subscriber::registry().with(LevelFilter::INFO).with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(LineFormat::new(UtcOffset::UTC))
                .with_writer(self.clone()),
        );
        Dispatch::new(subscriber)
    }

    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }

    /// Lines logged at `level` (`"INFO"`, `"WARN"`, `"ERROR"`).
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let tag = format!("[{level}]");
        self.contents()
            .lines()
            .filter(|line| line.contains(&tag))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for MemoryLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemoryLog {
    type Writer = MemoryLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
