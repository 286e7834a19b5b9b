//! Error types for the registry transport.
//!
//! One enum per concern, following the propagation policy of the core:
//!
//! - [`FactoryError`] / [`TlsError`]: construction time, always fatal. A
//!   factory that cannot build its TLS context does not exist.
//! - [`CodecError`]: malformed or incomplete payloads. Surfaced to the
//!   caller as a request failure; never retried here.
//! - [`TransportError`]: everything a produced client's request can fail
//!   with. 4xx responses are *not* in here: they reach the caller as normal
//!   responses.
//!
//! Malformed endpoint credentials are not an error at all; see
//! [`crate::credentials`].

use std::path::PathBuf;
use std::time::Duration;

use registry_model::RetryPolicy;
use reqwest::StatusCode;
use thiserror::Error;

/// Failures building a TLS context from configured material.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A PEM file could not be read or parsed.
    #[error("Failed to load PEM material from '{path}': {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: rustls_pki_types::pem::Error,
    },

    /// A trust store or certificate chain file parsed but held no certificates.
    #[error("'{path}' contains no certificates")]
    NoCertificates { path: PathBuf },

    /// Only one half of a client identity was configured.
    #[error("Client certificate and private key must be configured together")]
    IncompleteIdentity,

    /// rustls rejected the material (bad certificate, key mismatch, ...).
    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Failures encoding or decoding a wire payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The body was not valid JSON, or did not match the payload's structure
    /// (including a missing required instance identity field).
    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was not a JSON object, so it cannot carry a root wrapper.
    #[error("Expected a payload wrapped in '{expected}', got a non-object body")]
    MissingRoot { expected: &'static str },

    /// The body was an object, but not `{expected: ...}` alone.
    #[error("Expected a payload wrapped in '{expected}', found keys {found:?}")]
    RootMismatch {
        expected: &'static str,
        found: Vec<String>,
    },
}

/// Failures constructing a transport client factory.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("TLS context construction failed: {0}")]
    Tls(#[from] TlsError),

    /// The HTTP client could not be initialised with the given TLS context.
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Failures of a single request issued through a produced client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint the client is bound to could not be parsed as a base URL.
    #[error("Invalid registry endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Connection, TLS, timeout, or body-read failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request or response body did not match the wire format.
    #[error("Registry payload error: {0}")]
    Codec(#[from] CodecError),

    /// The response classifier marked the status as an error (5xx by default).
    #[error("Registry responded with {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
        retry_after: Option<Duration>,
    },
}

impl TransportError {
    /// Whether the caller may retry the request, and when.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Status {
                status,
                retry_after,
                ..
            } if status.is_server_error() => RetryPolicy::Retryable { after: *retry_after },
            Self::Http(err) if err.is_connect() || err.is_timeout() => RetryPolicy::Retryable { after: None },
            _ => RetryPolicy::NonRetryable,
        }
    }
}
