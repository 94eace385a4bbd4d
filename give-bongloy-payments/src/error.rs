//! Error types for remote API calls

use thiserror::Error;

/// Errors returned by the Bongloy and Plaid clients
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The remote API answered with an error body
    #[error("{provider} API error ({status}): {}", .message.as_deref().unwrap_or("request was invalid"))]
    Api {
        provider: &'static str,
        status: u16,
        message: Option<String>,
        code: Option<String>,
    },

    /// Requested object does not exist remotely
    #[error("Not found: {0}")]
    NotFound(String),

    /// Amount cannot be expressed in minor units
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid currency code
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected response shape
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing keys or credentials
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Provider supplied message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Provider supplied error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Serialization(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

/// Result type for remote API calls
pub type GatewayResult<T> = Result<T, GatewayError>;
