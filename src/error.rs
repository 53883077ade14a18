//! Error types for the three phases of a discovery call.
//!
//! Each phase (transport launch, discovery request, response parsing) has its
//! own error enum so callers can branch on what actually failed. `MoatError`
//! wraps all three for the top-level API.

use std::io;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Error launching the pluggable-transport helper process.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport output ended before the proxy was announced")]
    HandshakeNotFound,

    #[error("Invalid handshake line: {0}")]
    InvalidHandshake(String),

    #[error("Transport did not announce a proxy within {0:?}")]
    Timeout(Duration),

    #[error("Transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error performing the discovery request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Discovery service returned {0}")]
    HttpStatus(StatusCode),

    #[error("Invalid discovery URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Error parsing the discovery response body.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed JSON response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unexpected type for field: {0}")]
    WrongType(&'static str),
}

/// Top-level error for one bridge discovery call.
#[derive(Debug, Error)]
pub enum MoatError {
    #[error("Transport launch failed: {0}")]
    Launch(#[from] LaunchError),

    #[error("Discovery request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Failed to parse discovery response: {0}")]
    Parse(#[from] ParseError),
}
