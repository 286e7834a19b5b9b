//! Transport layer for service-registry clients.
//!
//! Builds the HTTP clients a registry-protocol layer talks to its servers
//! through. One [`RegistryTransportFactory`] is created per process with a
//! fixed TLS configuration; it then hands out a client per registry
//! endpoint. Each client:
//!
//! - performs TLS handshakes with the factory's context, optionally with a
//!   caller-supplied hostname check;
//! - authenticates with HTTP Basic when the endpoint URL carries
//!   `user:password`, and sends no credentials otherwise;
//! - speaks the registry's JSON dialect (snake_case, root-wrapped, with a
//!   fixed instance-record layout) through a shared [`WireCodec`];
//! - returns 4xx responses to the caller instead of failing.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Implements transport concerns for the value types in
//! `registry-model`. No retries, timeouts, or protocol state (leases,
//! caches) live here; callers own those, guided by
//! [`TransportError::retry_policy`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`tls`] | TLS context loading, hostname verifiers, transport builder |
//! | [`credentials`] | Endpoint user-info extraction and the Basic-auth interceptor |
//! | [`codec`] | The registry JSON codec |
//! | [`classifier`] | Response classification (4xx pass-through) |
//! | [`client`] | The registry client trait and its HTTP implementation |
//! | [`factory`] | The transport-client factory |
//! | [`errors`] | Error types for each of the above |

pub mod classifier;
pub mod client;
pub mod codec;
pub mod credentials;
pub mod errors;
pub mod factory;
pub mod tls;

pub use classifier::{DefaultResponseClassifier, RegistryResponseClassifier, ResponseClassifier};
pub use client::{RegistryHttpClient, RegistryResponse, RestRegistryClient};
pub use codec::{FieldNaming, Mixin, WireCodec, WireCodecBuilder};
pub use credentials::{extract_credentials, BasicAuthInterceptor, Credentials, RequestInterceptor};
pub use errors::{CodecError, FactoryError, TlsError, TransportError};
pub use factory::{RegistryTransportFactory, TransportClientFactory};
pub use tls::{build_transport, AllowAllHostnames, HostnameVerifier, TlsContext, TlsProperties};
