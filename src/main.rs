use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chronolog::{bridge, diagnostics, AsyncLogWriter, LogError, TimestampCache, WriterConfig};

fn run() -> Result<(), LogError> {
    // Self-diagnostics of the logger go to stderr, controlled by RUST_LOG.
    diagnostics::init()?;

    let config = match env::args().nth(1) {
        Some(path) => WriterConfig::from_path(path)?,
        None => WriterConfig::default(),
    };

    let cache = Arc::new(TimestampCache::system());
    let refresher = cache.spawn_refresher(Duration::from_secs(1))?;

    let writer = Arc::new(AsyncLogWriter::new(config, cache));
    writer.start()?;
    bridge::install(Arc::clone(&writer))?;

    writer.info("chronolog started");
    writer.info_fmt("queue capacity %s", &[&writer.config().effective_capacity()]);
    log::warn!("records from the log facade land in the same sink");

    writer.flush();
    writer.close();
    refresher.stop();
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chronolog: {err}");
            ExitCode::FAILURE
        }
    }
}
