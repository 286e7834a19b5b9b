//! Retry hints shared by every transport error type.
//!
//! The transport core never retries on its own. Errors carry a
//! [`RetryPolicy`] so the registry-protocol layer above can decide whether to
//! re-issue a request against the same or another endpoint.

use std::time::Duration;

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: server errors (5xx), connection failures, timeouts.
/// - `NonRetryable` errors: malformed payloads, invalid endpoints, any
///   response the classifier rejected that is not a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, typically taken from a
        /// `Retry-After` header. `None` means apply the caller's own schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried as-is.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}
