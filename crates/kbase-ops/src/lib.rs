//! Operational helpers: logging setup and request timing.

pub mod timer;

use kbase_types::{config::OpsConfig, KbaseError, Result};
use tracing_subscriber::{fmt, EnvFilter};

pub use timer::RequestTimer;

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| KbaseError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| KbaseError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}
