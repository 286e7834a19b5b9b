//! Secure transport: TLS context construction and the HTTP client built on it.
//!
//! A [`TlsContext`] holds already-loaded trust roots, an optional client
//! identity for mutual TLS, and the crypto provider. It is built once, when
//! the factory is constructed, and shared read-only by every client after
//! that. [`build_transport`] turns an optional context plus an optional
//! [`HostnameVerifier`] into the `reqwest::Client` every registry client
//! issues requests through.
//!
//! ## Hostname verification
//!
//! Without a verifier the standard webpki check applies: the certificate
//! must chain to a trusted root *and* be valid for the requested name. A
//! supplied verifier replaces only the name check; chain validation against
//! the context's roots still happens.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::verify_server_cert_signed_by_trust_anchor;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::pem::{self, PemObject};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{FactoryError, TlsError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// TLS settings as they appear in configuration. Paths point at PEM files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TlsProperties {
    /// When `false` the remaining settings are ignored and no TLS context
    /// is built; `https` endpoints then use the default transport.
    pub enabled: bool,

    /// CA bundle to trust. `None` trusts the bundled webpki roots.
    pub trust_store: Option<PathBuf>,

    /// Client certificate chain for mutual TLS.
    pub certificate: Option<PathBuf>,

    /// Private key matching `certificate`.
    pub private_key: Option<PathBuf>,

    /// When `false`, server certificates are accepted for any hostname (the
    /// chain must still be trusted).
    pub verify_hostname: bool,
}

impl Default for TlsProperties {
    fn default() -> Self {
        Self {
            enabled: false,
            trust_store: None,
            certificate: None,
            private_key: None,
            verify_hostname: true,
        }
    }
}

impl TlsProperties {
    /// The hostname verifier these settings ask for, if any.
    pub fn hostname_verifier(&self) -> Option<Arc<dyn HostnameVerifier>> {
        if self.verify_hostname {
            None
        } else {
            Some(Arc::new(AllowAllHostnames))
        }
    }
}

// ---------------------------------------------------------------------------
// Hostname verification
// ---------------------------------------------------------------------------

/// Decides whether a trusted server certificate is acceptable for the
/// hostname the client connected to.
pub trait HostnameVerifier: Send + Sync + fmt::Debug {
    /// Returns `true` to accept `end_entity` for `hostname`.
    fn verify(&self, hostname: &str, end_entity: &CertificateDer<'_>) -> bool;
}

/// Accepts every hostname.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllHostnames;

impl HostnameVerifier for AllowAllHostnames {
    fn verify(&self, _hostname: &str, _end_entity: &CertificateDer<'_>) -> bool {
        true
    }
}

/// Full chain validation against `roots`, with the name check delegated to a
/// [`HostnameVerifier`].
#[derive(Debug)]
struct HostnameOverridingVerifier {
    roots: Arc<RootCertStore>,
    provider: Arc<CryptoProvider>,
    hostname_verifier: Arc<dyn HostnameVerifier>,
}

impl ServerCertVerifier for HostnameOverridingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;
        verify_server_cert_signed_by_trust_anchor(
            &cert,
            &self.roots,
            intermediates,
            now,
            self.provider.signature_verification_algorithms.all,
        )?;

        let hostname = server_name.to_str();
        if self.hostname_verifier.verify(&hostname, end_entity) {
            Ok(ServerCertVerified::assertion())
        } else {
            debug!(%hostname, "Hostname verifier rejected server certificate");
            Err(rustls::Error::InvalidCertificate(CertificateError::NotValidForName))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

// ---------------------------------------------------------------------------
// TLS context
// ---------------------------------------------------------------------------

struct ClientIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

/// Loaded TLS material. Cheap to clone; immutable once built.
#[derive(Clone)]
pub struct TlsContext {
    roots: Arc<RootCertStore>,
    identity: Option<Arc<ClientIdentity>>,
    provider: Arc<CryptoProvider>,
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("roots", &self.roots.len())
            .field("client_identity", &self.identity.is_some())
            .finish()
    }
}

impl TlsContext {
    /// A context trusting exactly `roots`, with no client identity.
    pub fn new(roots: RootCertStore) -> Self {
        Self {
            roots: Arc::new(roots),
            identity: None,
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }

    /// A context trusting the bundled webpki roots.
    pub fn with_webpki_roots() -> Self {
        Self::new(RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        })
    }

    /// Presents `chain`/`key` to servers that request a client certificate.
    pub fn with_client_identity(mut self, chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
        self.identity = Some(Arc::new(ClientIdentity { chain, key }));
        self
    }

    /// Loads a context from configuration. Returns `None` when TLS is disabled.
    pub fn from_properties(properties: &TlsProperties) -> Result<Option<Self>, TlsError> {
        if !properties.enabled {
            return Ok(None);
        }

        let context = match &properties.trust_store {
            Some(path) => Self::new(load_trust_store(path)?),
            None => Self::with_webpki_roots(),
        };
        let context = match (&properties.certificate, &properties.private_key) {
            (Some(certificate), Some(private_key)) => {
                context.with_client_identity(load_chain(certificate)?, load_private_key(private_key)?)
            }
            (None, None) => context,
            _ => return Err(TlsError::IncompleteIdentity),
        };

        info!(
            roots = context.roots.len(),
            client_identity = context.identity.is_some(),
            "Loaded TLS context"
        );
        Ok(Some(context))
    }

    /// Number of trusted roots.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn has_client_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Builds the rustls client configuration, optionally replacing the
    /// hostname check.
    pub(crate) fn client_config(
        &self,
        hostname_verifier: Option<&Arc<dyn HostnameVerifier>>,
    ) -> Result<ClientConfig, TlsError> {
        let builder = ClientConfig::builder_with_provider(Arc::clone(&self.provider))
            .with_safe_default_protocol_versions()?;

        let builder = match hostname_verifier {
            Some(verifier) => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(HostnameOverridingVerifier {
                    roots: Arc::clone(&self.roots),
                    provider: Arc::clone(&self.provider),
                    hostname_verifier: Arc::clone(verifier),
                })),
            None => builder.with_root_certificates(Arc::clone(&self.roots)),
        };

        let config = match &self.identity {
            Some(identity) => builder.with_client_auth_cert(identity.chain.clone(), identity.key.clone_key())?,
            None => builder.with_no_client_auth(),
        };
        Ok(config)
    }
}

fn load_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let pem_error = |source: pem::Error| TlsError::Pem {
        path: path.to_path_buf(),
        source,
    };
    let chain = CertificateDer::pem_file_iter(path)
        .map_err(pem_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_error)?;
    if chain.is_empty() {
        return Err(TlsError::NoCertificates {
            path: path.to_path_buf(),
        });
    }
    Ok(chain)
}

fn load_trust_store(path: &Path) -> Result<RootCertStore, TlsError> {
    let mut store = RootCertStore::empty();
    for cert in load_chain(path)? {
        store.add(cert)?;
    }
    Ok(store)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    PrivateKeyDer::from_pem_file(path).map_err(|source| TlsError::Pem {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Transport builder
// ---------------------------------------------------------------------------

/// Builds the HTTP transport for registry clients.
///
/// - No context: a default client with the bundled trust roots and standard
///   hostname verification. A verifier without a context is ignored.
/// - A context: a client performing its TLS handshakes with that context,
///   using `hostname_verifier` in place of the standard name check when given.
///
/// No timeouts or retries are configured here.
pub fn build_transport(
    tls: Option<&TlsContext>,
    hostname_verifier: Option<&Arc<dyn HostnameVerifier>>,
) -> Result<reqwest::Client, FactoryError> {
    let Some(context) = tls else {
        if hostname_verifier.is_some() {
            debug!("Ignoring hostname verifier: no TLS context configured");
        }
        return reqwest::Client::builder().build().map_err(FactoryError::ClientBuild);
    };

    let config = context.client_config(hostname_verifier)?;
    debug!(
        custom_hostname_verifier = hostname_verifier.is_some(),
        client_identity = context.has_client_identity(),
        "Building TLS transport"
    );
    reqwest::Client::builder()
        .use_preconfigured_tls(config)
        .build()
        .map_err(FactoryError::ClientBuild)
}
