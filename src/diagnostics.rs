use tracing_subscriber::EnvFilter;

use crate::error::LogError;

/// Installs a stderr `tracing` subscriber for the logger's own lifecycle and
/// failure events, filtered by `RUST_LOG`.
///
/// Only the `tracing` dispatcher is claimed. The `log` facade stays free so
/// [`bridge::install`](crate::bridge::install) can still route it into a
/// writer.
pub fn init() -> Result<(), LogError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
