//! Error types and handling for `TourPlan`
//!
//! Upstream failures are split into retryable and terminal kinds so the
//! retry policy can decide without inspecting message text.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the `TourPlan` library
#[derive(Error, Debug)]
pub enum TourPlanError {
    /// Network failure, timeout, 5xx or 429 from an upstream service
    #[error("Transient upstream error: {message}")]
    Transient { message: String },

    /// Upstream answered with a body we could not interpret
    #[error("Malformed upstream response: {message}")]
    MalformedResponse { message: String },

    /// Upstream rejected the request with a non-retryable status
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Every attempt of a retried operation failed
    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<TourPlanError>,
    },

    /// No resolution tier produced coordinates
    #[error("Place not found: {query}")]
    GeocodeFailure { query: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TourPlanError {
    /// Create a new transient upstream error
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new geocode failure for the given query
    pub fn geocode_failure<S: Into<String>>(query: S) -> Self {
        Self::GeocodeFailure {
            query: query.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap the last failure of a retried operation
    #[must_use]
    pub fn retries_exhausted(attempts: u32, last: TourPlanError) -> Self {
        Self::RetriesExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    /// Classify a non-success HTTP status from an upstream service.
    #[must_use]
    pub fn from_status(status: StatusCode, service: &str) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Self::transient(format!("Rate limited by {service}"));
        }
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            return Self::transient(format!("{service} returned {status}"));
        }
        Self::Upstream {
            status: status.as_u16(),
            message: format!("{service} rejected the request"),
        }
    }

    /// Whether a retry policy should try the operation again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TourPlanError::Transient { .. } | TourPlanError::MalformedResponse { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TourPlanError::Transient { .. }
            | TourPlanError::MalformedResponse { .. }
            | TourPlanError::Upstream { .. }
            | TourPlanError::RetriesExhausted { .. } => {
                "An upstream service is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
            TourPlanError::GeocodeFailure { query } => format!(
                "I couldn't find '{query}' on the map. \
                 Please check the spelling or try a different location."
            ),
            TourPlanError::Validation { message } => format!("Invalid input: {message}"),
            TourPlanError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            TourPlanError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for TourPlanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::malformed(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_status(status, "upstream service");
        }
        Self::transient(err.to_string())
    }
}

impl From<serde_json::Error> for TourPlanError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
