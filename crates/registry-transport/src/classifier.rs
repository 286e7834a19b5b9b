//! Response classification.
//!
//! Registry clients treat a 4xx as an answer, not a failure: a heartbeat
//! for an instance the server has forgotten returns 404, and the caller is
//! expected to re-register rather than see an error.

use std::fmt;

use reqwest::StatusCode;

/// Decides whether a response status is an error for the client.
pub trait ResponseClassifier: Send + Sync + fmt::Debug {
    fn has_error(&self, status: StatusCode) -> bool;
}

/// Every 4xx and 5xx status is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseClassifier;

impl ResponseClassifier for DefaultResponseClassifier {
    fn has_error(&self, status: StatusCode) -> bool {
        status.is_client_error() || status.is_server_error()
    }
}

/// Never classifies a 4xx as an error; everything else is decided by
/// `inner`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryResponseClassifier<D = DefaultResponseClassifier> {
    inner: D,
}

impl RegistryResponseClassifier {
    pub fn new() -> Self {
        Self {
            inner: DefaultResponseClassifier,
        }
    }
}

impl<D: ResponseClassifier> RegistryResponseClassifier<D> {
    pub fn wrapping(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: ResponseClassifier> ResponseClassifier for RegistryResponseClassifier<D> {
    fn has_error(&self, status: StatusCode) -> bool {
        if status.is_client_error() {
            return false;
        }
        self.inner.has_error(status)
    }
}
