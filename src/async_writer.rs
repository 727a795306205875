//! Buffered, leveled log delivery on a dedicated consumer thread.
//!
//! Producers format nothing but the message: they capture the cached
//! timestamp, push the record into a bounded queue and return. A single
//! consumer thread owns the sink, renders each line and writes it, so output
//! order is exactly enqueue order.
//!
//! ```text
//! [producers] --write()--> [bounded queue] --> [consumer thread] --> [Sink]
//!                 |                                  ^
//!             flush() enqueues an acknowledgement ---'
//! ```

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::WriterConfig;
use crate::efficient_clock::TimestampCache;
use crate::error::LogError;
use crate::formatter::{Formatter, PercentFormatter};
use crate::level::{Level, LogRecord};
use crate::sink::{FileSink, Sink, StdoutSink};

/// A record plus the timestamp captured when it was submitted.
struct Entry {
    prefix: Arc<Vec<u8>>,
    millis: &'static [u8],
    record: LogRecord,
}

impl Entry {
    /// `[YYYY/MM/DD hh:mm:ss.mmm] LEVEL message\n`
    fn render_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(self.millis);
        out.push(b' ');
        out.extend_from_slice(self.record.level().as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.record.message().as_bytes());
        out.push(b'\n');
    }

    /// `YYYY/MM/DD` part of the captured prefix.
    fn date(&self) -> &[u8] {
        let stamp = self.prefix.strip_prefix(b"[").unwrap_or(self.prefix.as_slice());
        stamp.split(|&b| b == b' ').next().unwrap_or(stamp)
    }
}

enum Command {
    Write(Entry),
    /// Acknowledged once everything queued ahead of it reached the sink.
    Flush(Sender<()>),
}

enum State {
    Idle,
    Running(Sender<Command>),
    Closed,
}

/// Asynchronous writer: `new` -> `start` -> `write`/`flush` -> `close`.
///
/// The writer is `Sync`; share it behind an `Arc` between producer threads.
/// Once the queue holds `buffer_size` records, producers block until the
/// consumer catches up. Records are never dropped while the writer runs.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use chronolog::{AsyncLogWriter, Level, TimestampCache, WriterConfig};
///
/// let cache = Arc::new(TimestampCache::system());
/// let _refresher = cache.spawn_refresher(std::time::Duration::from_secs(1)).unwrap();
///
/// let config = WriterConfig::new(Level::INFO).filename("app.log");
/// let writer = AsyncLogWriter::new(config, cache);
/// writer.start().unwrap();
///
/// writer.info("service started");
/// writer.info_fmt("listening on %s", &[&8080]);
/// writer.debug("filtered out");
///
/// writer.close();
/// ```
pub struct AsyncLogWriter {
    config: WriterConfig,
    level: AtomicI32,
    cache: Arc<TimestampCache>,
    formatter: Box<dyn Formatter>,
    sink: Mutex<Option<Box<dyn Sink>>>,
    state: RwLock<State>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

macro_rules! level_methods {
    ($($level:ident => $plain:ident, $formatted:ident;)*) => {
        $(
            #[doc = concat!("Submits `message` at `", stringify!($level), "`.")]
            pub fn $plain(&self, message: impl Into<String>) {
                self.log(Level::$level, message);
            }

            #[doc = concat!("Renders `template` with `args` and submits it at `", stringify!($level), "`.")]
            pub fn $formatted(&self, template: &str, args: &[&dyn fmt::Display]) {
                self.log_fmt(Level::$level, template, args);
            }
        )*
    };
}

impl AsyncLogWriter {
    /// Creates an inert writer. Nothing is allocated or spawned until
    /// [`start`](Self::start).
    pub fn new(config: WriterConfig, cache: Arc<TimestampCache>) -> Self {
        Self {
            level: AtomicI32::new(config.level.raw()),
            config,
            cache,
            formatter: Box::new(PercentFormatter),
            sink: Mutex::new(None),
            state: RwLock::new(State::Idle),
            consumer: Mutex::new(None),
        }
    }

    /// Uses `sink` instead of the configured file or standard output.
    pub fn with_sink(self, sink: impl Sink) -> Self {
        *self.sink.lock() = Some(Box::new(sink));
        self
    }

    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TimestampCache> {
        &self.cache
    }

    pub fn level(&self) -> Level {
        Level::from_raw(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) -> &Self {
        self.level.store(level.raw(), Ordering::Relaxed);
        self
    }

    /// Whether a record at `level` passes the threshold.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.read(), State::Running(_))
    }

    /// Validates the configuration, opens the sink and spawns the consumer.
    ///
    /// An out-of-range level is a fatal configuration error: the writer stays
    /// inert and no record can be written.
    pub fn start(&self) -> Result<(), LogError> {
        let mut state = self.state.write();
        match *state {
            State::Idle => {}
            State::Running(_) => return Err(LogError::AlreadyStarted),
            State::Closed => return Err(LogError::Closed),
        }

        let level = self.level();
        if !level.is_valid() {
            return Err(LogError::InvalidLevel(level.raw()));
        }

        let sink = self.open_sink()?;
        let capacity = self.config.effective_capacity();
        let (queue, receiver) = crossbeam_channel::bounded(capacity);
        let rotate = self.config.rotate;

        let handle = thread::Builder::new()
            .name("log-writer".into())
            .spawn(move || consume(receiver, sink, rotate))?;

        *self.consumer.lock() = Some(handle);
        *state = State::Running(queue);
        tracing::debug!(%level, capacity, rotate, "log writer started");
        Ok(())
    }

    fn open_sink(&self) -> Result<Box<dyn Sink>, LogError> {
        if let Some(sink) = self.sink.lock().take() {
            return Ok(sink);
        }
        match &self.config.filename {
            Some(path) => Ok(Box::new(FileSink::open(path)?)),
            None => Ok(Box::new(StdoutSink)),
        }
    }

    /// Queues `record` if its level passes the threshold.
    ///
    /// Blocks while the queue is full. Outside the running state the record
    /// is discarded.
    pub fn write(&self, record: LogRecord) {
        if !self.enabled(record.level()) {
            return;
        }
        let (prefix, millis) = self.cache.format();
        self.enqueue(Command::Write(Entry {
            prefix,
            millis,
            record,
        }));
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        if self.enabled(level) {
            self.write(LogRecord::new(level, message));
        }
    }

    pub fn log_fmt(&self, level: Level, template: &str, args: &[&dyn fmt::Display]) {
        if self.enabled(level) {
            self.write(LogRecord::new(level, self.formatter.render(template, args)));
        }
    }

    level_methods! {
        DEBUG => debug, debug_fmt;
        TRACE => trace, trace_fmt;
        INFO => info, info_fmt;
        WARNING => warning, warning_fmt;
        ERROR => error, error_fmt;
        CRITICAL => critical, critical_fmt;
    }

    fn enqueue(&self, command: Command) -> bool {
        let state = self.state.read();
        match &*state {
            State::Running(queue) => queue.send(command).is_ok(),
            _ => {
                tracing::trace!("log writer not running, record discarded");
                false
            }
        }
    }

    /// Blocks until every record submitted before this call has been written
    /// and the sink flushed. Returns immediately when the writer is not
    /// running.
    pub fn flush(&self) {
        let (ack, acked) = crossbeam_channel::bounded(1);
        if self.enqueue(Command::Flush(ack)) {
            // Disconnection means the consumer is gone, nothing left to wait on.
            let _ = acked.recv();
        }
    }

    /// Stops accepting records, lets the consumer drain the queue and waits
    /// for it to exit. Idempotent.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), State::Closed);
        if let State::Running(queue) = previous {
            drop(queue);
            tracing::debug!("log writer closing");
        }

        if let Some(consumer) = self.consumer.lock().take() {
            if consumer.join().is_err() {
                tracing::warn!("log writer consumer panicked");
            }
        }
    }
}

impl Drop for AsyncLogWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer loop: the only code that touches the sink.
///
/// Runs until every sender is gone and the queue is empty. With `rotate`, the
/// sink is rotated whenever a record's own timestamp falls on a different
/// date than the previous record's, so every line lands in the file of the
/// day it was stamped.
fn consume(queue: Receiver<Command>, mut sink: Box<dyn Sink>, rotate: bool) {
    let mut current_date: Option<Vec<u8>> = None;
    let mut line = Vec::with_capacity(256);

    for command in queue {
        match command {
            Command::Write(entry) => {
                if rotate {
                    let date = entry.date();
                    match current_date.as_deref() {
                        Some(current) if current == date => {}
                        _ => {
                            if let Some(previous) = current_date.replace(date.to_vec()) {
                                rotate_sink(sink.as_mut(), &previous);
                            }
                        }
                    }
                }

                line.clear();
                entry.render_into(&mut line);
                if let Err(err) = sink.write_line(&line) {
                    tracing::warn!(%err, "failed to write log record");
                }
            }
            Command::Flush(ack) => {
                if let Err(err) = sink.flush() {
                    tracing::warn!(%err, "failed to flush log sink");
                }
                let _ = ack.send(());
            }
        }
    }

    if let Err(err) = sink.flush() {
        tracing::warn!(%err, "failed to flush log sink");
    }
    tracing::debug!("log writer consumer exited");
}

/// Closes out the file of `date` (`YYYY/MM/DD`) under a `YYYY-MM-DD` suffix.
fn rotate_sink(sink: &mut dyn Sink, date: &[u8]) {
    let suffix = String::from_utf8_lossy(date).replace('/', "-");
    if let Err(err) = sink.rotate(&suffix) {
        tracing::warn!(%err, "failed to rotate log sink");
    }
}

/// Submits a `format!`-style message at `level`, skipping the formatting
/// entirely when the level is filtered out.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use chronolog::{log_record, AsyncLogWriter, Level, TimestampCache, WriterConfig};
/// # let writer = AsyncLogWriter::new(WriterConfig::default(), Arc::new(TimestampCache::system()));
/// # writer.start().unwrap();
/// log_record!(writer, Level::INFO, "Temperature: {} C", 25.5);
/// log_record!(writer, Level::WARNING, "Status: {}, Count: {}", true, 42);
/// ```
#[macro_export]
macro_rules! log_record {
    ($writer:expr, $level:expr, $($arg:tt)+) => {{
        let writer = &$writer;
        let level: $crate::Level = $level;
        if writer.enabled(level) {
            writer.write($crate::LogRecord::new(level, format!($($arg)+)));
        }
    }};
}
