//! The transport-client factory.
//!
//! A factory is built once per process with a fixed TLS configuration. All
//! the expensive and fallible work (loading TLS material, building the HTTP
//! transport, assembling the codec) happens in its constructors, so
//! [`TransportClientFactory::new_client`] cannot fail: it only binds the
//! shared pieces to an endpoint and attaches credentials found in it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use registry_model::RegistryEndpoint;
use tracing::{debug, info};

use crate::classifier::{RegistryResponseClassifier, ResponseClassifier};
use crate::client::{RegistryHttpClient, RestRegistryClient};
use crate::codec::WireCodec;
use crate::credentials::{extract_credentials, BasicAuthInterceptor};
use crate::errors::FactoryError;
use crate::tls::{build_transport, HostnameVerifier, TlsContext, TlsProperties};

/// Produces endpoint-bound registry clients.
pub trait TransportClientFactory: Send + Sync {
    /// A client for `endpoint`, authenticated with the endpoint's user-info
    /// when it carries a `user:password` pair.
    fn new_client(&self, endpoint: &RegistryEndpoint) -> Box<dyn RegistryHttpClient>;

    /// Releases factory-held resources. Idempotent; clients already produced
    /// keep working.
    fn shutdown(&self);
}

/// The HTTP implementation of [`TransportClientFactory`].
///
/// Every client it produces shares one `reqwest::Client` (and so one TLS
/// configuration and connection pool), one [`WireCodec`], and the registry
/// response classifier.
pub struct RegistryTransportFactory {
    http: reqwest::Client,
    codec: Arc<WireCodec>,
    classifier: Arc<dyn ResponseClassifier>,
    tls: Option<TlsContext>,
    shut_down: AtomicBool,
}

impl fmt::Debug for RegistryTransportFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryTransportFactory")
            .field("codec", &self.codec)
            .field("classifier", &self.classifier)
            .field("tls", &self.tls)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

impl RegistryTransportFactory {
    /// A factory without a TLS context: `https` endpoints use the bundled
    /// roots and standard hostname verification.
    pub fn new() -> Result<Self, FactoryError> {
        Self::build(None, None)
    }

    /// Loads TLS material described by `properties`. Any failure is returned
    /// here and no factory is created.
    pub fn from_tls_properties(properties: &TlsProperties) -> Result<Self, FactoryError> {
        let tls = TlsContext::from_properties(properties)?;
        let verifier = properties.hostname_verifier();
        Self::build(tls, verifier)
    }

    /// A factory around an already-built context. `hostname_verifier`, when
    /// given, replaces the default hostname check.
    pub fn with_tls(tls: TlsContext, hostname_verifier: Option<Arc<dyn HostnameVerifier>>) -> Result<Self, FactoryError> {
        Self::build(Some(tls), hostname_verifier)
    }

    fn build(tls: Option<TlsContext>, hostname_verifier: Option<Arc<dyn HostnameVerifier>>) -> Result<Self, FactoryError> {
        let http = build_transport(tls.as_ref(), hostname_verifier.as_ref())?;
        let factory = Self {
            http,
            codec: Arc::new(WireCodec::registry()),
            classifier: Arc::new(RegistryResponseClassifier::new()),
            tls,
            shut_down: AtomicBool::new(false),
        };

        info!(
            tls = factory.tls.is_some(),
            custom_hostname_verifier = hostname_verifier.is_some(),
            "Registry transport factory created"
        );
        Ok(factory)
    }

    /// The codec shared by every client this factory produces.
    pub fn codec(&self) -> &WireCodec {
        &self.codec
    }

    pub fn tls(&self) -> Option<&TlsContext> {
        self.tls.as_ref()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl TransportClientFactory for RegistryTransportFactory {
    fn new_client(&self, endpoint: &RegistryEndpoint) -> Box<dyn RegistryHttpClient> {
        let mut client = RestRegistryClient::new(
            self.http.clone(),
            endpoint,
            Arc::clone(&self.codec),
            Arc::clone(&self.classifier),
        );

        let authenticated = match extract_credentials(endpoint.as_str()) {
            Some(credentials) => {
                client = client.with_interceptor(Arc::new(BasicAuthInterceptor::new(credentials)));
                true
            }
            None => false,
        };

        debug!(endpoint = client.endpoint(), authenticated, "Created registry client");
        Box::new(client)
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Registry transport factory shut down");
    }
}
