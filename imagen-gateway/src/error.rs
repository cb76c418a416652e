//! Error definitions for the gateway.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {source}")]
    HttpClient {
        #[from]
        source: reqwest::Error,
    },

    /// The model service rejected the call; the upstream message is
    /// propagated so callers can distinguish it from gateway validation.
    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// Required deployment configuration is absent. Every missing key is
    /// named so the deployment can be fixed from the error text alone.
    #[error("Missing configuration: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Auth error: {message}")]
    Auth { message: String },

    #[error("Upstream returned no images")]
    EmptyResponse,

    #[error("Image bytes not available in the response")]
    MissingImageData,

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
