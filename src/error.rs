//! ==============================================================================
//! error.rs - client error taxonomy
//! ==============================================================================
//!
//! purpose:
//!     one closed set of failures that every workflow converts into a single
//!     user-facing notification. nothing here is retried.
//!
//! relationships:
//!     - produced by: api.rs, store.rs, sensor.rs, domain.rs (validation)
//!     - consumed by: workflow/* (mapped to Notification)
//!
//! ==============================================================================

use thiserror::Error;

/// fallback shown when a failed response carries no readable message
pub const SERVER_ERROR_FALLBACK: &str = "Erreur serveur";

/// result of any api client or workflow step
pub type ApiResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// required form fields missing, detected before any network call
    #[error("{0}")]
    Validation(String),

    /// a protected call was attempted with an empty credential store
    #[error("Utilisateur non authentifié")]
    Unauthenticated,

    /// transport-level failure (connect, timeout, dns)
    #[error("{0}")]
    Network(String),

    /// non-2xx response
    #[error("{message}")]
    Server { status: u16, message: String },

    /// response body did not have the expected shape
    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// client could not be set up (bad base url, tls init)
    #[error("{0}")]
    Config(String),

    /// key-value store could not be read or written
    #[error("{0}")]
    Storage(String),
}

impl ClientError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Parse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// battery sensor failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    #[error("Batterie indisponible : {0}")]
    Unavailable(String),

    #[error("Niveau de batterie invalide : {0}")]
    OutOfRange(f64),
}
