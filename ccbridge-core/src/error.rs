// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Error types for the bridge
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.
//! Every variant is terminal for the call that produced it and collapses to result code `1`
//! at the host boundary; the detail survives only in the last-error message.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Inbound buffer missing or shorter than the count header
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Declared parameter count above the supported maximum
    #[error("Too many parameters: header declares {declared}, limit is {limit}")]
    TooManyParameters { declared: i64, limit: usize },

    /// A declared parameter record extends past the end of the inbound buffer
    #[error("Truncated buffer: parameter {index} needs {required} bytes, buffer holds {actual}")]
    TruncatedBuffer {
        index: usize,
        required: usize,
        actual: usize,
    },

    /// HTTP client or I/O runtime could not be set up
    #[error("Transport initialization failed: {0}")]
    TransportInitFailed(String),

    /// Connect, TLS, timeout or non-2xx status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Host supplied an outbound buffer smaller than one response record
    #[error("Output buffer too small: need {required} bytes, got {actual}")]
    OutputBufferTooSmall { required: usize, actual: usize },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable upper-snake name of the error class, used in log fields and messages
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::TooManyParameters { .. } => "TOO_MANY_PARAMETERS",
            Error::TruncatedBuffer { .. } => "TRUNCATED_BUFFER",
            Error::TransportInitFailed(_) => "TRANSPORT_INIT_FAILED",
            Error::RequestFailed(_) => "REQUEST_FAILED",
            Error::OutputBufferTooSmall { .. } => "OUTPUT_BUFFER_TOO_SMALL",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Result code reported to the host. Callers only ever see success or failure.
    pub fn result_code(&self) -> i32 {
        crate::RESULT_FAILURE
    }

    /// Check if error originated in the HTTP exchange
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::TransportInitFailed(_) | Error::RequestFailed(_)
        )
    }

    /// Check if error was caused by the inbound buffer layout
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::TooManyParameters { .. } | Error::TruncatedBuffer { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let cause = if e.is_timeout() {
            "timed out"
        } else if e.is_connect() {
            "connection failed"
        } else if e.is_redirect() {
            "too many redirects"
        } else if e.is_body() || e.is_decode() {
            "failed reading response body"
        } else {
            "transport error"
        };
        Error::RequestFailed(format!("{}: {}", cause, e))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<envy::Error> for Error {
    fn from(e: envy::Error) -> Self {
        Error::Config(format!("Failed to parse environment variables: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::InvalidInput("null".into()).kind(), "INVALID_INPUT");
        assert_eq!(
            Error::TooManyParameters { declared: 101, limit: 100 }.kind(),
            "TOO_MANY_PARAMETERS"
        );
        assert_eq!(
            Error::OutputBufferTooSmall { required: 162, actual: 10 }.kind(),
            "OUTPUT_BUFFER_TOO_SMALL"
        );
    }

    #[test]
    fn test_every_error_is_failure_code() {
        let errors = [
            Error::InvalidInput("x".into()),
            Error::TruncatedBuffer { index: 0, required: 162, actual: 2 },
            Error::TransportInitFailed("x".into()),
            Error::RequestFailed("x".into()),
            Error::Config("x".into()),
        ];
        for e in &errors {
            assert_eq!(e.result_code(), 1);
        }
    }

    #[test]
    fn test_classification() {
        assert!(Error::RequestFailed("HTTP 404".into()).is_transport());
        assert!(!Error::RequestFailed("HTTP 404".into()).is_decode());
        assert!(Error::TruncatedBuffer { index: 1, required: 322, actual: 200 }.is_decode());
    }

    #[test]
    fn test_display_carries_detail() {
        let e = Error::TooManyParameters { declared: 101, limit: 100 };
        assert!(e.to_string().contains("101"));
    }
}
