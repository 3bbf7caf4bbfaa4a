use crate::credentials::{keys, Credentials};
use crate::error::{AuthError, TransportError};
use crate::Provider;
use async_trait::async_trait;
use http::header::{HeaderValue, AUTHORIZATION};
use log::debug;
use std::sync::Arc;

/// Performs a single HTTP round-trip.
///
/// Every outbound provider call goes through a `Tripper`, which makes it the
/// one place to substitute a fake network in tests.
#[async_trait]
pub trait Tripper: Send + Sync {
    /// Send `request` and return the full response, whatever its status.
    async fn round_trip(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, TransportError>;
}

/// Creates the [`Tripper`] a provider uses for a call.
///
/// `creds` are the credentials the call is made on behalf of, if any, so the
/// tripper can authenticate requests.
pub trait TripperFactory: Send + Sync {
    /// Create a tripper for one call made by `provider`.
    fn new_tripper(
        &self,
        creds: Option<&Credentials>,
        provider: &dyn Provider,
    ) -> Result<Arc<dyn Tripper>, AuthError>;
}

/// Default factory backed by a shared [`reqwest::Client`].
///
/// Build the client yourself to apply timeouts, proxies or TLS settings to
/// every provider at once.
#[derive(Debug, Clone, Default)]
pub struct HttpTripperFactory {
    client: reqwest::Client,
}

impl HttpTripperFactory {
    /// Create a factory with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory around a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl TripperFactory for HttpTripperFactory {
    fn new_tripper(
        &self,
        creds: Option<&Credentials>,
        provider: &dyn Provider,
    ) -> Result<Arc<dyn Tripper>, AuthError> {
        let authorization = creds
            .and_then(|creds| creds.access_token().map(|token| (creds, token)))
            .map(|(creds, token)| {
                let scheme = match creds.get(keys::TOKEN_TYPE) {
                    Some(kind) if !kind.eq_ignore_ascii_case("bearer") => kind,
                    _ => "Bearer",
                };
                HeaderValue::from_str(&format!("{scheme} {token}")).map_err(|_| {
                    AuthError::MalformedProviderResponse(format!(
                        "{} issued an access token that is not a valid header value",
                        provider.name()
                    ))
                })
            })
            .transpose()?;

        Ok(Arc::new(HttpTripper {
            client: self.client.clone(),
            authorization,
        }))
    }
}

/// [`Tripper`] over reqwest that adds the access token when it has one.
///
/// The scheme is the credentials' `token_type`, `Bearer` when absent.
#[derive(Debug, Clone)]
pub struct HttpTripper {
    client: reqwest::Client,
    authorization: Option<HeaderValue>,
}

#[async_trait]
impl Tripper for HttpTripper {
    async fn round_trip(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, TransportError> {
        let (mut parts, body) = request.into_parts();
        if let Some(authorization) = &self.authorization {
            if !parts.headers.contains_key(AUTHORIZATION) {
                parts.headers.insert(AUTHORIZATION, authorization.clone());
            }
        }

        debug!("{} {}", parts.method, parts.uri);
        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
