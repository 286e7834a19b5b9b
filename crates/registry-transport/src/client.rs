//! Endpoint-bound registry clients.
//!
//! A [`RestRegistryClient`] issues the registry protocol's HTTP requests
//! against one endpoint, with one codec, one classifier, and the request
//! interceptors chosen for that endpoint when it was produced. It holds no
//! other state and can be shared across tasks freely.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use registry_model::{Application, Applications, InstanceInfo, InstanceStatus, RegistryEndpoint, WireEntity};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::classifier::ResponseClassifier;
use crate::codec::{self, WireCodec};
use crate::credentials::RequestInterceptor;
use crate::errors::TransportError;

/// Status, headers, and (for 2xx responses with a body) the decoded entity.
///
/// A 4xx is delivered as a `RegistryResponse` like any other non-error
/// status; inspect [`RegistryResponse::status`] to react to it.
#[derive(Debug, Clone)]
pub struct RegistryResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub entity: Option<T>,
}

impl<T> RegistryResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn into_entity(self) -> Option<T> {
        self.entity
    }
}

/// The registry protocol, as seen by the layer that registers, renews, and
/// queries instances.
///
/// Every operation returns `Ok` for statuses the client's classifier accepts
/// (including 4xx) and `Err` for transport failures, codec failures, and
/// statuses it rejects.
#[async_trait]
pub trait RegistryHttpClient: Send + Sync + fmt::Debug {
    /// The endpoint this client is bound to, without user-info.
    fn endpoint(&self) -> &str;

    async fn register(&self, instance: &InstanceInfo) -> Result<RegistryResponse<()>, TransportError>;

    async fn cancel(&self, app: &str, id: &str) -> Result<RegistryResponse<()>, TransportError>;

    /// Renews the lease of `id`. A 404 means the server no longer knows the
    /// instance and the caller should register again.
    async fn send_heartbeat(
        &self,
        app: &str,
        id: &str,
        instance: &InstanceInfo,
        overridden_status: Option<InstanceStatus>,
    ) -> Result<RegistryResponse<InstanceInfo>, TransportError>;

    async fn status_update(
        &self,
        app: &str,
        id: &str,
        status: InstanceStatus,
        instance: &InstanceInfo,
    ) -> Result<RegistryResponse<()>, TransportError>;

    async fn delete_status_override(
        &self,
        app: &str,
        id: &str,
        instance: &InstanceInfo,
    ) -> Result<RegistryResponse<()>, TransportError>;

    async fn get_applications(&self, regions: &[String]) -> Result<RegistryResponse<Applications>, TransportError>;

    async fn get_delta(&self, regions: &[String]) -> Result<RegistryResponse<Applications>, TransportError>;

    async fn get_vip(&self, vip: &str, regions: &[String]) -> Result<RegistryResponse<Applications>, TransportError>;

    async fn get_secure_vip(
        &self,
        svip: &str,
        regions: &[String],
    ) -> Result<RegistryResponse<Applications>, TransportError>;

    async fn get_application(&self, app: &str) -> Result<RegistryResponse<Application>, TransportError>;

    async fn get_instance(&self, id: &str) -> Result<RegistryResponse<InstanceInfo>, TransportError>;

    async fn get_instance_by_app(&self, app: &str, id: &str)
        -> Result<RegistryResponse<InstanceInfo>, TransportError>;

    /// Releases client resources. The HTTP transport owns its connections,
    /// so this does nothing and may be called any number of times.
    fn shutdown(&self);
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// A response whose status the classifier accepted, body not yet decoded.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

pub struct RestRegistryClient {
    http: reqwest::Client,
    endpoint: String,
    base: Result<Url, String>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    codec: Arc<WireCodec>,
    classifier: Arc<dyn ResponseClassifier>,
}

impl fmt::Debug for RestRegistryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRegistryClient")
            .field("endpoint", &self.endpoint)
            .field("interceptors", &self.interceptors.len())
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl RestRegistryClient {
    /// Binds a client to `endpoint`. Never fails: an endpoint that is not a
    /// usable base URL produces a client whose requests all fail with
    /// [`TransportError::InvalidEndpoint`].
    pub fn new(
        http: reqwest::Client,
        endpoint: &RegistryEndpoint,
        codec: Arc<WireCodec>,
        classifier: Arc<dyn ResponseClassifier>,
    ) -> Self {
        let base = parse_base(endpoint.as_str());
        let endpoint = match &base {
            Ok(url) => url.to_string(),
            Err(reason) => {
                warn!(reason = %reason, "Registry endpoint is not a usable base URL; requests will fail");
                endpoint.as_str().to_owned()
            }
        };

        Self {
            http,
            endpoint,
            base,
            interceptors: Vec::new(),
            codec,
            classifier,
        }
    }

    /// Appends an interceptor applied to every request, in insertion order.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: reason.to_owned(),
        };

        let mut url = self.base.clone().map_err(|reason| invalid(&reason))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }

    async fn execute(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<RawResponse, TransportError> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(ACCEPT, codec::CONTENT_TYPE);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, codec::CONTENT_TYPE).body(body);
        }
        for interceptor in &self.interceptors {
            request = interceptor.intercept(request);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!(%method, path = url.path(), status = status.as_u16(), "Registry request completed");

        if self.classifier.has_error(status) {
            let retry_after = retry_after(&headers);
            warn!(%method, path = url.path(), status = status.as_u16(), "Registry request failed");
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
                retry_after,
            });
        }

        Ok(RawResponse { status, headers, body })
    }

    async fn request_entity<T: WireEntity>(
        &self,
        method: Method,
        url: Url,
    ) -> Result<RegistryResponse<T>, TransportError> {
        let raw = self.execute(method, url, None).await?;
        let entity = if raw.status.is_success() && !raw.body.is_empty() {
            Some(self.codec.decode(&raw.body)?)
        } else {
            None
        };
        Ok(RegistryResponse {
            status: raw.status,
            headers: raw.headers,
            entity,
        })
    }

    async fn request_empty(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<RegistryResponse<()>, TransportError> {
        let raw = self.execute(method, url, body).await?;
        Ok(RegistryResponse {
            status: raw.status,
            headers: raw.headers,
            entity: None,
        })
    }
}

fn parse_base(endpoint: &str) -> Result<Url, String> {
    let mut url = Url::parse(endpoint).map_err(|err| err.to_string())?;
    if url.cannot_be_a_base() {
        return Err("cannot be a base URL".to_owned());
    }
    // Authentication comes from interceptors only.
    url.set_username("")
        .and_then(|()| url.set_password(None))
        .map_err(|()| "URL has no host to send requests to".to_owned())?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn regions_query(regions: &[String]) -> Vec<(&'static str, String)> {
    if regions.is_empty() {
        Vec::new()
    } else {
        vec![("regions", regions.join(","))]
    }
}

#[async_trait]
impl RegistryHttpClient for RestRegistryClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn register(&self, instance: &InstanceInfo) -> Result<RegistryResponse<()>, TransportError> {
        let url = self.url(&["apps", instance.app.as_str()], &[])?;
        let body = self.codec.encode(instance)?;
        self.request_empty(Method::POST, url, Some(body)).await
    }

    async fn cancel(&self, app: &str, id: &str) -> Result<RegistryResponse<()>, TransportError> {
        let url = self.url(&["apps", app, id], &[])?;
        self.request_empty(Method::DELETE, url, None).await
    }

    async fn send_heartbeat(
        &self,
        app: &str,
        id: &str,
        instance: &InstanceInfo,
        overridden_status: Option<InstanceStatus>,
    ) -> Result<RegistryResponse<InstanceInfo>, TransportError> {
        let mut query = vec![
            ("status", instance.status.as_str().to_owned()),
            ("lastDirtyTimestamp", instance.last_dirty_timestamp.to_string()),
        ];
        if let Some(overridden) = overridden_status {
            query.push(("overriddenstatus", overridden.as_str().to_owned()));
        }
        let url = self.url(&["apps", app, id], &query)?;
        self.request_entity(Method::PUT, url).await
    }

    async fn status_update(
        &self,
        app: &str,
        id: &str,
        status: InstanceStatus,
        instance: &InstanceInfo,
    ) -> Result<RegistryResponse<()>, TransportError> {
        let query = [
            ("value", status.as_str().to_owned()),
            ("lastDirtyTimestamp", instance.last_dirty_timestamp.to_string()),
        ];
        let url = self.url(&["apps", app, id, "status"], &query)?;
        self.request_empty(Method::PUT, url, None).await
    }

    async fn delete_status_override(
        &self,
        app: &str,
        id: &str,
        instance: &InstanceInfo,
    ) -> Result<RegistryResponse<()>, TransportError> {
        let query = [("lastDirtyTimestamp", instance.last_dirty_timestamp.to_string())];
        let url = self.url(&["apps", app, id, "status"], &query)?;
        self.request_empty(Method::DELETE, url, None).await
    }

    async fn get_applications(&self, regions: &[String]) -> Result<RegistryResponse<Applications>, TransportError> {
        let url = self.url(&["apps", ""], &regions_query(regions))?;
        self.request_entity(Method::GET, url).await
    }

    async fn get_delta(&self, regions: &[String]) -> Result<RegistryResponse<Applications>, TransportError> {
        let url = self.url(&["apps", "delta"], &regions_query(regions))?;
        self.request_entity(Method::GET, url).await
    }

    async fn get_vip(&self, vip: &str, regions: &[String]) -> Result<RegistryResponse<Applications>, TransportError> {
        let url = self.url(&["vips", vip], &regions_query(regions))?;
        self.request_entity(Method::GET, url).await
    }

    async fn get_secure_vip(
        &self,
        svip: &str,
        regions: &[String],
    ) -> Result<RegistryResponse<Applications>, TransportError> {
        let url = self.url(&["svips", svip], &regions_query(regions))?;
        self.request_entity(Method::GET, url).await
    }

    async fn get_application(&self, app: &str) -> Result<RegistryResponse<Application>, TransportError> {
        let url = self.url(&["apps", app], &[])?;
        self.request_entity(Method::GET, url).await
    }

    async fn get_instance(&self, id: &str) -> Result<RegistryResponse<InstanceInfo>, TransportError> {
        let url = self.url(&["instances", id], &[])?;
        self.request_entity(Method::GET, url).await
    }

    async fn get_instance_by_app(
        &self,
        app: &str,
        id: &str,
    ) -> Result<RegistryResponse<InstanceInfo>, TransportError> {
        let url = self.url(&["apps", app, id], &[])?;
        self.request_entity(Method::GET, url).await
    }

    fn shutdown(&self) {
        debug!(endpoint = %self.endpoint, "Registry client shut down");
    }
}
