//! Produced clients completing (or refusing) real TLS handshakes against a
//! local server holding a throwaway certificate for `localhost`.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rcgen::CertifiedKey;
use registry_model::RegistryEndpoint;
use registry_transport::{
    AllowAllHostnames, HostnameVerifier, RegistryHttpClient, RegistryTransportFactory, TlsContext,
    TransportClientFactory, TransportError,
};
use reqwest::StatusCode;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{RootCertStore, ServerConfig, ServerConnection, StreamOwned};

const NOT_FOUND: &[u8] = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Serves 404 to every request over TLS until the test process exits.
fn spawn_server(certified: &CertifiedKey) -> SocketAddr {
    let key = PrivateKeyDer::from(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));
    let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![certified.cert.der().clone()], key)
        .unwrap();
    let config = Arc::new(config);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for tcp in listener.incoming().flatten() {
            let _ = tcp.set_read_timeout(Some(Duration::from_secs(5)));
            let Ok(connection) = ServerConnection::new(Arc::clone(&config)) else {
                continue;
            };
            let mut stream = StreamOwned::new(connection, tcp);
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            let complete = loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break false,
                    Ok(n) => {
                        request.extend_from_slice(&buf[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            break true;
                        }
                    }
                }
            };
            if complete {
                let _ = stream.write_all(NOT_FOUND);
                stream.conn.send_close_notify();
                let _ = stream.flush();
            }
        }
    });
    addr
}

fn client_for(factory: &RegistryTransportFactory, url: String) -> Box<dyn RegistryHttpClient> {
    factory.new_client(&endpoint(url))
}

fn trusting(certified: &CertifiedKey) -> TlsContext {
    let mut roots = RootCertStore::empty();
    roots.add(certified.cert.der().clone()).unwrap();
    TlsContext::new(roots)
}

fn endpoint(url: String) -> RegistryEndpoint {
    RegistryEndpoint::new(url).unwrap()
}

#[tokio::test]
async fn matching_name_handshakes_with_default_verification() {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let addr = spawn_server(&certified);

    let factory = RegistryTransportFactory::with_tls(trusting(&certified), None).unwrap();
    let client = client_for(&factory, format!("https://localhost:{}/eureka/", addr.port()));
    let response = client.get_applications(&[]).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mismatched_name_fails_with_default_verification() {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let addr = spawn_server(&certified);

    let factory = RegistryTransportFactory::with_tls(trusting(&certified), None).unwrap();
    let client = client_for(&factory, format!("https://{addr}/eureka/"));
    let err = client.get_applications(&[]).await.unwrap_err();
    assert!(matches!(err, TransportError::Http(_)), "{err}");
}

#[tokio::test]
async fn hostname_verifier_accepts_mismatched_name() {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let addr = spawn_server(&certified);

    let verifier: Arc<dyn HostnameVerifier> = Arc::new(AllowAllHostnames);
    let factory = RegistryTransportFactory::with_tls(trusting(&certified), Some(verifier)).unwrap();
    let client = client_for(&factory, format!("https://{addr}/eureka/"));
    let response = client.get_applications(&[]).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hostname_verifier_still_requires_a_trusted_chain() {
    let served = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let trusted = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let addr = spawn_server(&served);

    let verifier: Arc<dyn HostnameVerifier> = Arc::new(AllowAllHostnames);
    let factory = RegistryTransportFactory::with_tls(trusting(&trusted), Some(verifier)).unwrap();
    let client = client_for(&factory, format!("https://{addr}/eureka/"));
    let err = client.get_applications(&[]).await.unwrap_err();
    assert!(matches!(err, TransportError::Http(_)), "{err}");
}
