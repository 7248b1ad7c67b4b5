use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Name of the missing bridge, if this is a capability error.
    pub fn missing_capability(&self) -> Option<&str> {
        match self {
            Error::CapabilityMissing { capability, .. } => Some(capability),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
