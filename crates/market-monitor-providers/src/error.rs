use market_monitor_core::report::{FailureKind, Unavailable};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(_) | Self::Api { .. } => FailureKind::Network,
            Self::Parse(_) => FailureKind::Parse,
        }
    }
}

impl From<&ProviderError> for Unavailable {
    fn from(err: &ProviderError) -> Self {
        Unavailable::new(err.kind(), err.to_string())
    }
}
