use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid symbol '{0}': expected four digits followed by .KL")]
    InvalidSymbol(String),

    #[error("Invalid threshold for {symbol}: up={up}, down={down} (need up > down > 0)")]
    InvalidThreshold { symbol: String, up: f64, down: f64 },

    #[error("No price data available for {0}")]
    NoData(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{service} error: {reason}")]
    RemoteError { service: String, reason: String },

    #[error("SMTP error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error("Email build error: {0}")]
    EmailError(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    AddressError(#[from] lettre::address::AddressError),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Transient,
    Persistence,
    Fatal,
}

impl MonitorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            MonitorError::InvalidSymbol(_) | MonitorError::InvalidThreshold { .. } => {
                ErrorClass::Validation
            }
            MonitorError::NoData(_)
            | MonitorError::HttpError(_)
            | MonitorError::RemoteError { .. }
            | MonitorError::SmtpError(_) => ErrorClass::Transient,
            MonitorError::JsonError(_) | MonitorError::IoError(_) => ErrorClass::Persistence,
            MonitorError::EmailError(_)
            | MonitorError::AddressError(_)
            | MonitorError::ConfigError(_) => ErrorClass::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
