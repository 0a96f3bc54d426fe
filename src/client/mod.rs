//! The authenticated API surface.
//!
//! [`Client`] owns the token cache, the transport and the cancellation token
//! every call observes. Entity operations live in the submodules, grouped by
//! resource.
#![expect(
    clippy::multiple_inherent_impl,
    reason = "operations are split into one `impl Client` block per resource module"
)]

mod ad_groups;
mod ads;
mod apps;
mod campaigns;
mod catalog;
mod creatives;
mod keywords;
mod negatives;
mod reports;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bon::bon;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret as _;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use self::ad_groups::NewAdGroup;
pub use self::campaigns::NewCampaign;
pub use self::keywords::NewKeyword;
pub use self::negatives::NewNegativeKeyword;
pub use self::reports::ImpressionShareRequest;
use crate::auth::TokenManager;
use crate::config::{ClientConfig, Endpoints};
use crate::credentials::CredentialSource;
use crate::error::Error;
use crate::invoker::MultiPathInvoker;
use crate::normalize::{extract_data_items, extract_data_object};
use crate::pagination::PaginatedFetcher;
use crate::transport::{ApiRequest, HttpTransport, RawResponse, Requester, Transport, dispatch};
use crate::types::Identified;
use crate::{ORG_CONTEXT_HEADER, Result};

/// Search Ads API client. Cheap to clone; clones share the token cache.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
    tokens: TokenManager,
    cancel: CancellationToken,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_base", &self.inner.endpoints.api_base.as_str())
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

#[bon]
impl Client {
    /// Validates `config` and wires the client together. Without an explicit
    /// `transport`, requests go through [`HttpTransport`] with the configured
    /// timeout.
    #[builder]
    pub fn new(
        #[builder(default)] config: ClientConfig,
        credentials: Arc<dyn CredentialSource>,
        transport: Option<Arc<dyn Transport>>,
        #[builder(default)] cancel: CancellationToken,
    ) -> Result<Self> {
        let endpoints = config.validate()?;
        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(config.request_timeout)?),
        };
        let tokens = TokenManager::new(credentials, Arc::clone(&transport), &config, &endpoints)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                endpoints,
                transport,
                tokens,
                cancel,
            }),
        })
    }
}

impl Client {
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Token that aborts in-flight and future calls of this client and its clones.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Authenticates and returns the organization the credential acts for.
    pub async fn validate_credentials(&self) -> Result<String> {
        let context = self.inner.tokens.authenticate(&self.inner.cancel).await?;
        Ok(context.org_id)
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub(crate) fn fetcher(&self) -> PaginatedFetcher<'_, Self> {
        PaginatedFetcher::new(self, self.inner.config.page_size)
    }

    pub(crate) fn invoker(&self) -> MultiPathInvoker<'_, Self> {
        MultiPathInvoker::new(self)
    }

    pub(crate) async fn get(&self, target: &str) -> Result<Value> {
        self.request_json(Method::GET, target, None).await
    }

    pub(crate) async fn post(&self, target: &str, body: Value) -> Result<Value> {
        self.request_json(Method::POST, target, Some(body)).await
    }

    pub(crate) async fn put(&self, target: &str, body: Value) -> Result<Value> {
        self.request_json(Method::PUT, target, Some(body)).await
    }

    pub(crate) async fn delete(&self, target: &str) -> Result<Value> {
        self.request_json(Method::DELETE, target, None).await
    }

    /// Sends `request` with only the bearer header; used for report downloads,
    /// which live outside the versioned API base.
    pub(crate) async fn send_bearer_only(&self, request: ApiRequest) -> Result<RawResponse> {
        let context = self.inner.tokens.authenticate(&self.inner.cancel).await?;
        let request = request.bearer(context.bearer_token.expose_secret())?;
        self.send_checked(request).await
    }

    async fn send_checked(&self, request: ApiRequest) -> Result<RawResponse> {
        #[cfg(feature = "tracing")]
        let (method, path) = (request.method.clone(), request.path());

        let response = dispatch(self.inner.transport.as_ref(), request, &self.inner.cancel).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            self.inner.tokens.invalidate();
        }

        #[cfg(feature = "tracing")]
        {
            if !response.is_success() {
                tracing::warn!(%method, path, status = %response.status, "API request failed");
            }
        }

        Ok(response)
    }
}

#[async_trait]
impl Requester for Client {
    async fn request(
        &self,
        method: Method,
        target: &str,
        body: Option<Value>,
    ) -> Result<RawResponse> {
        let context = self.inner.tokens.authenticate(&self.inner.cancel).await?;
        let url = self.inner.endpoints.api_base.join(target)?;

        let mut request = ApiRequest::new(method, url)
            .bearer(context.bearer_token.expose_secret())?
            .header(ORG_CONTEXT_HEADER, &format!("orgId={}", context.org_id))?;
        if let Some(body) = body {
            request = request.json(body);
        }

        self.send_checked(request).await
    }
}

/// Rows of a list response that parse into `T`, first occurrence of each
/// identity kept.
pub(crate) fn parse_rows<T, P>(payload: &Value, parse: P) -> Vec<T>
where
    T: Identified,
    P: Fn(&Value) -> Option<T>,
{
    let mut seen = HashSet::new();
    extract_data_items(payload)
        .into_iter()
        .filter_map(parse)
        .filter(|row| seen.insert(row.identity()))
        .collect()
}

/// The single entity of a response, which must parse into `T`.
pub(crate) fn parse_object<T, P>(payload: &Value, entity: &str, parse: P) -> Result<T>
where
    P: Fn(&Value) -> Option<T>,
{
    parse(extract_data_object(payload))
        .ok_or_else(|| Error::internal(format!("invalid {entity} response payload")))
}

/// Sorts `records` by a copied key.
pub(crate) fn sorted_by<T, K: Ord, F: FnMut(&T) -> K>(mut records: Vec<T>, key: F) -> Vec<T> {
    records.sort_by_key(key);
    records
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::TEST_PRIVATE_KEY;
    use crate::credentials::Credential;

    #[test]
    fn builder_rejects_invalid_config() {
        let credential = Credential::new("SEARCHADS.c", "SEARCHADS.t", "k", TEST_PRIVATE_KEY);
        let err = Client::builder()
            .config(ClientConfig::builder().api_base("not a url").build())
            .credentials(Arc::new(credential))
            .build()
            .expect_err("invalid base");
        assert_eq!(err.kind(), crate::error::Kind::Validation);
    }

    #[test]
    fn sorted_by_orders_records() {
        let rows = vec![json!(3), json!(1), json!(2)];
        let sorted = sorted_by(rows, |v| v.as_i64().unwrap_or_default());
        assert_eq!(sorted, vec![json!(1), json!(2), json!(3)]);
    }
}
