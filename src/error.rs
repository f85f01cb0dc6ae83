//! Application error type
//!
//! Best-effort stages absorb provider failures internally: unresolved
//! coordinates, unassigned categories, and raw itinerary text are data,
//! not errors. What remains here are the failures that do cross a
//! boundary: rejected configuration, invalid request input, an upstream
//! call the pipeline cannot recover from, and store I/O.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventopiaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("upstream call failed: {0}")]
    Api(String),

    #[error("document store failure: {0}")]
    Store(String),
}

impl EventopiaError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api(message.into())
    }

    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store(message.into())
    }

    /// Message safe to hand to API consumers.
    ///
    /// Internal detail (URLs, keys, provider error text) stays out of the
    /// response body; validation messages describe the caller's own input
    /// and pass through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            EventopiaError::Config(_) => {
                "Server configuration is incomplete. Check the config file and API keys."
                    .to_string()
            }
            EventopiaError::Validation(message) => message.clone(),
            EventopiaError::Api(_) => {
                "An upstream service is not responding. Try again shortly.".to_string()
            }
            EventopiaError::Store(_) => {
                "The local document store failed. Clearing its data directory may help."
                    .to_string()
            }
        }
    }
}
