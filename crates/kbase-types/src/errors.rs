use thiserror::Error;

pub type Result<T, E = KbaseError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum KbaseError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("indexnow error: {0}")]
    IndexNow(String),
    #[error("geo error: {0}")]
    Geo(String),
    #[error("license error: {0}")]
    License(String),
    #[error("share api error ({status:?}): {message}")]
    Share {
        status: Option<u16>,
        message: String,
    },
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KbaseError {
    /// HTTP status attached to the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            KbaseError::Share { status, .. } => *status,
            _ => None,
        }
    }
}
