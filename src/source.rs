//! Record sources feeding the intake loop

use std::io;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{
    incoming,
    record::{Levels, LogRecord},
};

/// A pull-based, finite, non-restartable sequence of log records.
///
/// Each call to [`next_record`](RecordSource::next_record) is a suspension
/// point. `None` ends the session.
#[async_trait]
pub trait RecordSource: Send {
    /// Pull the next record.
    async fn next_record(&mut self) -> Option<io::Result<LogRecord>>;

    /// Human readable label for a numeric severity.
    fn level_label(&self, level: u64) -> Option<&str>;
}

/// Adapts any stream of records into a [`RecordSource`].
pub struct StreamSource<S> {
    stream: S,
    levels: Levels,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = LogRecord> + Unpin + Send,
{
    pub const fn new(stream: S, levels: Levels) -> Self {
        Self { stream, levels }
    }
}

impl<I> StreamSource<futures_util::stream::Iter<I>>
where
    I: Iterator<Item = LogRecord> + Send,
{
    /// Source over an in-memory list of records, using pino's default levels.
    pub fn from_records(records: impl IntoIterator<IntoIter = I>) -> Self {
        Self::new(futures_util::stream::iter(records), Levels::default())
    }
}

#[async_trait]
impl<S> RecordSource for StreamSource<S>
where
    S: Stream<Item = LogRecord> + Unpin + Send,
{
    async fn next_record(&mut self) -> Option<io::Result<LogRecord>> {
        self.stream.next().await.map(Ok)
    }

    fn level_label(&self, level: u64) -> Option<&str> {
        self.levels.label(level)
    }
}

/// Reads newline-delimited JSON records, the format pino writes.
///
/// Blank lines are ignored. Lines that are not valid records are logged and
/// skipped rather than ending the stream.
pub struct NdjsonSource<R> {
    lines: Lines<R>,
    levels: Levels,
    min_level: Option<u64>,
    skipped: u64,
}

impl<R> NdjsonSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, levels: Levels) -> Self {
        Self {
            lines: reader.lines(),
            levels,
            min_level: None,
            skipped: 0,
        }
    }

    /// Drop records whose level is below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: Option<u64>) -> Self {
        self.min_level = level;
        self
    }

    /// Number of lines that could not be parsed so far.
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[async_trait]
impl<R> RecordSource for NdjsonSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_record(&mut self) -> Option<io::Result<LogRecord>> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    incoming!(
                        level = DEBUG,
                        skipped = self.skipped(),
                        "End of log stream"
                    );
                    return None;
                }
                Err(e) => return Some(Err(e)),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match LogRecord::parse(line) {
                Ok(record) if self.min_level.is_some_and(|min| record.level() < min) => {
                    incoming!("Dropping record below minimum level: {}", record.level());
                }
                Ok(record) => return Some(Ok(record)),
                Err(e) => {
                    self.skipped += 1;
                    incoming!(level = WARN, error = %e, "Skipping unusable log line");
                }
            }
        }
    }

    fn level_label(&self, level: u64) -> Option<&str> {
        self.levels.label(level)
    }
}
