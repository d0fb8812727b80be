use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid symbol '{0}': expected upper-case letters and digits")]
    InvalidSymbol(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
