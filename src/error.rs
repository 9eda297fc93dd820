use thiserror::Error;

/// Failures of the local key-value layer and the log kept inside it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored log under `{key}` is not a valid entry list: {reason}")]
    CorruptLog { key: String, reason: String },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Transport-level failure talking to the identity endpoint.
/// Never surfaces past the resolver; it only ends up as a diagnostic.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    Transport(String),

    #[error("malformed identity response: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::Transport(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tracking settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}
