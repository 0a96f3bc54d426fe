//! Raw request execution. No business logic lives here: a non-2xx response is
//! data, not an error, so callers can classify it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::error::{Error, sanitize_message};

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Json(Value),
    /// Already `application/x-www-form-urlencoded`.
    Form(String),
}

#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn bearer(mut self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::validation(format!("bearer token is not a valid header value: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::validation(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::validation(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(header, value);
        Ok(self)
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    #[must_use]
    pub fn form(mut self, encoded: String) -> Self {
        self.body = Some(Body::Form(encoded));
        self
    }

    /// Path without query string, safe to put in errors and logs.
    #[must_use]
    pub fn path(&self) -> String {
        self.url.path().to_owned()
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn new<B: Into<Vec<u8>>>(status: StatusCode, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Typed, sanitized error describing this response.
    #[must_use]
    pub fn to_error(&self, method: &Method, path: &str) -> Error {
        Error::status(
            self.status,
            method.clone(),
            path.to_owned(),
            sanitize_message(&String::from_utf8_lossy(&self.body)),
        )
    }

    /// Decodes a successful JSON body. An empty body decodes as `{}`.
    pub fn into_json(self, method: &Method, path: &str) -> Result<Value> {
        if !self.is_success() {
            return Err(self.to_error(method, path));
        }
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::internal(format!(
                "invalid JSON response from {method} {path}: {e}"
            ))
        })
    }
}

/// Executes one HTTP exchange and hands back status and body untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse>;
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Clone, Debug)]
#[expect(clippy::module_name_repetitions, reason = "distinguishes the reqwest transport from test transports")]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %method, path = %url.path(), "sending API request");

        let mut builder = self.client.request(method, url).headers(headers);
        builder = match body {
            Some(Body::Json(value)) => builder.json(&value),
            Some(Body::Form(encoded)) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        #[cfg(feature = "tracing")]
        tracing::debug!(status = %status, bytes = body.len(), "received API response");

        Ok(RawResponse { status, body })
    }
}

/// Authenticated access to API resources, as seen by the fetcher, the invoker
/// and the report pipeline.
///
/// `target` is relative to the API base (`campaigns?offset=0`) or an absolute
/// URL. Implementations attach credentials and organization context.
#[async_trait]
pub trait Requester: Send + Sync {
    async fn request(
        &self,
        method: Method,
        target: &str,
        body: Option<Value>,
    ) -> Result<RawResponse>;

    /// [`Requester::request`] followed by [`RawResponse::into_json`].
    async fn request_json(
        &self,
        method: Method,
        target: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let response = self.request(method.clone(), target, body).await?;
        response.into_json(&method, display_path(target))
    }
}

/// `target` without its query string.
#[must_use]
pub fn display_path(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

/// Sends `request` unless `cancel` fires first.
pub async fn dispatch(
    transport: &dyn Transport,
    request: ApiRequest,
    cancel: &CancellationToken,
) -> Result<RawResponse> {
    if cancel.is_cancelled() {
        return Err(Error::cancelled());
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::cancelled()),
        response = transport.send(request) => response,
    }
}
