use std::sync::Arc;

use crate::async_writer::AsyncLogWriter;
use crate::error::LogError;
use crate::level::{Level, LogRecord};

/// Routes records from the `log` facade into an [`AsyncLogWriter`].
pub struct LogBridge {
    writer: Arc<AsyncLogWriter>,
}

impl LogBridge {
    pub fn new(writer: Arc<AsyncLogWriter>) -> Self {
        Self { writer }
    }
}

pub fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Trace => Level::TRACE,
        log::Level::Debug => Level::DEBUG,
        log::Level::Info => Level::INFO,
        log::Level::Warn => Level::WARNING,
        log::Level::Error => Level::ERROR,
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.writer.enabled(map_level(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.writer
                .write(LogRecord::new(map_level(record.level()), record.args().to_string()));
        }
    }

    fn flush(&self) {
        self.writer.flush();
    }
}

/// Installs `writer` as the global `log` backend.
///
/// Threshold filtering stays with the writer, so the facade's max level is
/// opened fully.
pub fn install(writer: Arc<AsyncLogWriter>) -> Result<(), LogError> {
    log::set_boxed_logger(Box::new(LogBridge::new(writer)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
