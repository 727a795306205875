//! # Chronolog
//!
//! A process-local logging facility built for a cheap call site:
//!
//! * **Cached timestamps**: the textual `[YYYY/MM/DD hh:mm:ss` prefix is
//!   rendered at most once per second and shared lock-free; milliseconds come
//!   from a precomputed table.
//! * **Asynchronous output**: records go through a bounded queue to a single
//!   consumer thread that owns the sink, so callers never wait on I/O unless
//!   the queue is full.
//! * **Explicit lifecycle**: `start`, `flush` (a real barrier) and `close`
//!   on the writer; a stoppable refresher for the timestamp cache.
//!
//! ## Main Components
//!
//! * `TimestampCache`: second-granularity calendar state plus the lock-free
//!   `format` fast path
//! * `AsyncLogWriter`: leveled, buffered delivery to a `Sink`
//! * `WriterConfig`: level, queue capacity, output file and rotation
//! * `bridge`: plugs a writer into the `log` facade
//! * `diagnostics`: stderr `tracing` output for the logger's own events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use chronolog::{log_record, AsyncLogWriter, Level, TimestampCache, WriterConfig};
//!
//! let cache = Arc::new(TimestampCache::system());
//! let refresher = cache.spawn_refresher(Duration::from_secs(1)).unwrap();
//!
//! let writer = AsyncLogWriter::new(WriterConfig::new(Level::INFO).buffer_size(1024), cache);
//! writer.start().unwrap();
//!
//! writer.info("Hello, world!");
//! writer.warning_fmt("disk usage at %s%%", &[&93]);
//! log_record!(writer, Level::ERROR, "Status: {}, Count: {}", false, 42);
//!
//! writer.flush();
//! writer.close();
//! refresher.stop();
//! ```

pub mod async_writer;
pub mod bridge;
pub mod config;
pub mod diagnostics;
pub mod efficient_clock;
pub mod error;
pub mod formatter;
pub mod level;
pub mod sink;

pub use async_writer::AsyncLogWriter;
pub use config::{WriterConfig, DEFAULT_BUFFER_SIZE};
pub use efficient_clock::{Clock, ManualClock, Refresher, SystemClock, TimestampCache};
pub use error::LogError;
pub use formatter::{Formatter, PercentFormatter};
pub use level::{Level, LogRecord};
pub use sink::{FileSink, Sink, StdoutSink};
