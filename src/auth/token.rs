use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::auth::assertion::{AssertionClaims, sign_assertion};
use crate::config::{ClientConfig, Endpoints};
use crate::credentials::{Credential, CredentialSource};
use crate::error::{AuthFailure, Error};
use crate::normalize::{float_from, text};
use crate::transport::{ApiRequest, Transport, dispatch};

const DEFAULT_TOKEN_TTL_SECS: f64 = 3600.0;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Used when the issued lifetime is shorter than the safety margin.
const FALLBACK_LIFETIME: Duration = Duration::from_secs(55 * 60);

/// A bearer token bound to the organization it acts for.
#[non_exhaustive]
#[derive(Clone)]
pub struct AuthContext {
    pub bearer_token: SecretString,
    pub org_id: String,
    pub expires_at: Instant,
    /// Fingerprint of the credential the token was derived from.
    pub credential_hash: String,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("bearer_token", &"[REDACTED]")
            .field("org_id", &self.org_id)
            .field("expires_at", &self.expires_at)
            .field("credential_hash", &self.credential_hash)
            .finish()
    }
}

impl AuthContext {
    fn is_usable_for(&self, credential_hash: &str, now: Instant) -> bool {
        self.credential_hash == credential_hash && now < self.expires_at
    }
}

#[derive(Serialize)]
struct TokenForm<'form> {
    grant_type: &'static str,
    client_id: &'form str,
    client_secret: &'form str,
    scope: &'form str,
}

/// Derives bearer tokens from the current credential and caches the result.
///
/// Refreshes are not collapsed: concurrent callers that miss the cache each run
/// a full exchange and the last one to finish wins the slot.
pub struct TokenManager {
    source: Arc<dyn CredentialSource>,
    transport: Arc<dyn Transport>,
    token_url: Url,
    me_url: Url,
    audience: String,
    scope: String,
    cache: Mutex<Option<AuthContext>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url.as_str())
            .field("audience", &self.audience)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        endpoints: &Endpoints,
    ) -> Result<Self> {
        Ok(Self {
            source,
            transport,
            token_url: endpoints.token_url.clone(),
            me_url: endpoints.api_base.join("me")?,
            audience: config.audience.clone(),
            scope: config.scope.clone(),
            cache: Mutex::new(None),
        })
    }

    /// Returns the cached context when it is still valid for the current
    /// credential, otherwise performs a full token exchange.
    pub async fn authenticate(&self, cancel: &CancellationToken) -> Result<AuthContext> {
        let credential = self
            .source
            .load()?
            .filter(Credential::is_complete)
            .ok_or_else(|| Error::auth(AuthFailure::MissingCredentials))?;
        let credential_hash = credential.fingerprint();

        if let Some(cached) = self.cached(&credential_hash) {
            return Ok(cached);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(key_id = %credential.key_id, "exchanging client assertion for bearer token");

        let (bearer_token, lifetime) = self.exchange(&credential, cancel).await?;
        let org_id = self.resolve_org_id(&bearer_token, cancel).await?;

        #[cfg(feature = "tracing")]
        {
            if let Some(configured) = credential.org_id.as_deref().map(str::trim)
                && configured != org_id
            {
                tracing::debug!(configured, resolved = %org_id, "configured org id differs from /me");
            }
        }

        let context = AuthContext {
            bearer_token,
            org_id,
            expires_at: expiry_from(Instant::now(), lifetime),
            credential_hash,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(org_id = %context.org_id, "bearer token cached");

        self.store(context.clone());
        Ok(context)
    }

    /// Drops the cached context so the next call performs a fresh exchange.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn cached(&self, credential_hash: &str) -> Option<AuthContext> {
        let guard = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|ctx| ctx.is_usable_for(credential_hash, Instant::now()))
            .cloned()
    }

    fn store(&self, context: AuthContext) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(context);
    }

    async fn exchange(
        &self,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<(SecretString, Duration)> {
        let assertion = sign_assertion(
            AssertionClaims {
                client_id: &credential.client_id,
                team_id: &credential.team_id,
                key_id: &credential.key_id,
                audience: &self.audience,
                issued_at: Utc::now().timestamp(),
            },
            &credential.private_key,
        )?;

        let form = serde_html_form::to_string(TokenForm {
            grant_type: "client_credentials",
            client_id: &credential.client_id,
            client_secret: &assertion,
            scope: &self.scope,
        })?;

        let request = ApiRequest::new(Method::POST, self.token_url.clone()).form(form);
        let path = request.path();
        let payload = dispatch(self.transport.as_ref(), request, cancel)
            .await?
            .into_json(&Method::POST, &path)?;

        let access_token = text(&payload["access_token"]);
        if access_token.is_empty() {
            return Err(Error::auth(AuthFailure::MissingAccessToken));
        }

        let mut ttl = float_from(&payload["expires_in"]);
        if ttl <= 0.0 {
            ttl = DEFAULT_TOKEN_TTL_SECS;
        }
        let lifetime = Duration::try_from_secs_f64(ttl)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TOKEN_TTL_SECS));

        Ok((SecretString::from(access_token), lifetime))
    }

    async fn resolve_org_id(
        &self,
        bearer_token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request =
            ApiRequest::new(Method::GET, self.me_url.clone()).bearer(bearer_token.expose_secret())?;
        let path = request.path();
        let payload = dispatch(self.transport.as_ref(), request, cancel)
            .await?
            .into_json(&Method::GET, &path)?;

        let org_id = text(&payload["data"]["parentOrgId"]);
        if org_id.is_empty() {
            return Err(Error::auth(AuthFailure::MissingOrgId));
        }
        Ok(org_id)
    }
}

fn expiry_from(now: Instant, lifetime: Duration) -> Instant {
    match lifetime.checked_sub(EXPIRY_MARGIN) {
        Some(usable) if !usable.is_zero() => now.checked_add(usable),
        _ => None,
    }
    .unwrap_or(now + FALLBACK_LIFETIME)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::auth::TEST_PRIVATE_KEY;
    use crate::transport::{Body, RawResponse};

    struct Upstream {
        expires_in: Value,
        parent_org_id: Value,
        calls: AtomicUsize,
        me_calls: AtomicUsize,
    }

    impl Upstream {
        fn new(expires_in: Value) -> Arc<Self> {
            Self::with_org(expires_in, json!(4242))
        }

        fn with_org(expires_in: Value, parent_org_id: Value) -> Arc<Self> {
            Arc::new(Self {
                expires_in,
                parent_org_id,
                calls: AtomicUsize::new(0),
                me_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for Upstream {
        async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = if request.url.path().ends_with("/me") {
                self.me_calls.fetch_add(1, Ordering::SeqCst);
                json!({"data": {"parentOrgId": self.parent_org_id}})
            } else {
                let Some(Body::Form(form)) = &request.body else {
                    return Ok(RawResponse::new(StatusCode::BAD_REQUEST, "missing form"));
                };
                assert!(form.contains("grant_type=client_credentials"), "{form}");
                assert!(form.contains("scope=searchadsorg"), "{form}");
                json!({"access_token": "tok", "expires_in": self.expires_in})
            };
            Ok(RawResponse::new(StatusCode::OK, body.to_string()))
        }
    }

    struct Rotating(Mutex<Credential>);

    impl CredentialSource for Rotating {
        fn load(&self) -> Result<Option<Credential>> {
            Ok(Some(self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()))
        }
    }

    fn credential() -> Credential {
        Credential::new("client", "team", "key", TEST_PRIVATE_KEY)
    }

    fn manager(source: Arc<dyn CredentialSource>, upstream: Arc<Upstream>) -> TokenManager {
        let config = ClientConfig::default();
        let endpoints = config.validate().expect("default config");
        TokenManager::new(source, upstream, &config, &endpoints).expect("manager")
    }

    #[tokio::test]
    async fn cache_hit_performs_no_network_calls() {
        let upstream = Upstream::new(json!(3600));
        let tokens = manager(Arc::new(credential()), Arc::clone(&upstream));
        let cancel = CancellationToken::new();

        let first = tokens.authenticate(&cancel).await.expect("first");
        assert_eq!(first.org_id, "4242");
        assert_eq!(first.bearer_token.expose_secret(), "tok");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2, "token + /me");

        let second = tokens.authenticate(&cancel).await.expect("second");
        assert_eq!(second.credential_hash, first.credential_hash);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2, "served from cache");
    }

    #[tokio::test]
    async fn changed_credential_forces_refresh() {
        let upstream = Upstream::new(json!(3600));
        let source = Arc::new(Rotating(Mutex::new(credential())));
        let tokens = manager(Arc::clone(&source) as Arc<dyn CredentialSource>, Arc::clone(&upstream));
        let cancel = CancellationToken::new();

        let first = tokens.authenticate(&cancel).await.expect("first");
        *source.0.lock().expect("lock") = Credential::new("client", "team", "key-2", TEST_PRIVATE_KEY);
        let second = tokens.authenticate(&cancel).await.expect("second");

        assert_ne!(first.credential_hash, second.credential_hash);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 4, "two full exchanges");
    }

    #[tokio::test]
    async fn org_id_always_comes_from_me_lookup() {
        let upstream = Upstream::new(json!("1800"));
        let tokens = manager(
            Arc::new(credential().with_org_id("77")),
            Arc::clone(&upstream),
        );

        let context = tokens
            .authenticate(&CancellationToken::new())
            .await
            .expect("auth");
        assert_eq!(context.org_id, "4242");
        assert_eq!(upstream.me_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_parent_org_id_is_an_auth_error() {
        let upstream = Upstream::with_org(json!(3600), json!(""));
        let tokens = manager(Arc::new(credential()), Arc::clone(&upstream));

        let err = tokens
            .authenticate(&CancellationToken::new())
            .await
            .expect_err("no org");
        assert_eq!(
            err.downcast_ref::<crate::error::Auth>().map(|a| &a.reason),
            Some(&AuthFailure::MissingOrgId)
        );
        assert_eq!(upstream.me_calls.load(Ordering::SeqCst), 1);

        // nothing was cached, so the next call exchanges again
        tokens
            .authenticate(&CancellationToken::new())
            .await
            .expect_err("still no org");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_keeps_a_sixty_second_margin() {
        let upstream = Upstream::new(json!(120));
        let tokens = manager(Arc::new(credential()), Arc::clone(&upstream));
        let cancel = CancellationToken::new();

        tokens.authenticate(&cancel).await.expect("first");
        tokio::time::advance(Duration::from_secs(59)).await;
        tokens.authenticate(&cancel).await.expect("still cached");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        tokens.authenticate(&cancel).await.expect("refreshed");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn short_lifetimes_fall_back_to_fifty_five_minutes() {
        let now = Instant::now();
        assert_eq!(expiry_from(now, Duration::from_secs(30)), now + FALLBACK_LIFETIME);
        assert_eq!(expiry_from(now, Duration::from_secs(60)), now + FALLBACK_LIFETIME);
        assert_eq!(
            expiry_from(now, Duration::from_secs(3600)),
            now + Duration::from_secs(3540)
        );
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_call() {
        struct Empty;
        impl CredentialSource for Empty {
            fn load(&self) -> Result<Option<Credential>> {
                Ok(None)
            }
        }

        let upstream = Upstream::new(json!(3600));
        let tokens = manager(Arc::new(Empty), Arc::clone(&upstream));
        let err = tokens
            .authenticate(&CancellationToken::new())
            .await
            .expect_err("no credential");

        assert_eq!(err.kind(), crate::error::Kind::Auth);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_access_token_is_an_auth_error() {
        struct NoToken;

        #[async_trait]
        impl Transport for NoToken {
            async fn send(&self, _request: ApiRequest) -> Result<RawResponse> {
                Ok(RawResponse::new(StatusCode::OK, r#"{"token_type":"Bearer"}"#))
            }
        }

        let config = ClientConfig::default();
        let endpoints = config.validate().expect("config");
        let tokens =
            TokenManager::new(Arc::new(credential()), Arc::new(NoToken), &config, &endpoints)
                .expect("manager");

        let err = tokens
            .authenticate(&CancellationToken::new())
            .await
            .expect_err("missing token");
        assert_eq!(
            err.downcast_ref::<crate::error::Auth>().map(|a| &a.reason),
            Some(&AuthFailure::MissingAccessToken)
        );
    }
}
