use std::time::Duration;

use bon::Builder;
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::{
    DEFAULT_API_BASE, DEFAULT_AUDIENCE, DEFAULT_SCOPE, DEFAULT_TOKEN_URL, DEFAULT_TRUSTED_ROOT,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
const DEFAULT_PAGE_SIZE: usize = 200;

/// Timing and retry policy for asynchronous custom reports.
#[non_exhaustive]
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
pub struct ReportPolicy {
    #[builder(default = Duration::from_secs(4))]
    pub poll_interval: Duration,
    /// Wall-clock budget for a report to reach a terminal state after creation.
    #[builder(default = Duration::from_secs(120))]
    pub poll_deadline: Duration,
    /// Attempts for create and download when the upstream answers 429.
    #[builder(default = 4)]
    pub max_attempts: usize,
    #[builder(default = vec![
        Duration::from_secs(2),
        Duration::from_secs(5),
        Duration::from_secs(10),
        Duration::from_secs(15),
    ])]
    pub backoff: Vec<Duration>,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ReportPolicy {
    /// Delay after the given zero-based failed attempt. The last step repeats.
    #[must_use]
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        self.backoff
            .get(attempt)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::validation("report max_attempts must be at least 1"));
        }
        if self.backoff.is_empty() {
            return Err(Error::validation("report backoff schedule must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::validation("report poll_interval must be positive"));
        }
        Ok(())
    }
}

/// Client configuration. Every field has a production default.
#[non_exhaustive]
#[derive(Builder, Clone, Debug)]
#[expect(clippy::module_name_repetitions, reason = "re-exported at the crate root where `Config` would be ambiguous")]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_API_BASE.to_owned())]
    pub api_base: String,
    #[builder(into, default = DEFAULT_TOKEN_URL.to_owned())]
    pub token_url: String,
    /// `aud` claim of the client assertion.
    #[builder(into, default = DEFAULT_AUDIENCE.to_owned())]
    pub audience: String,
    #[builder(into, default = DEFAULT_SCOPE.to_owned())]
    pub scope: String,
    /// Registrable domain that report download links must belong to.
    #[builder(into, default = DEFAULT_TRUSTED_ROOT.to_owned())]
    pub trusted_root: String,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    #[builder(default = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
    #[builder(default)]
    pub report: ReportPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parsed, validated endpoints derived from a [`ClientConfig`].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: Url,
    pub token_url: Url,
    pub trusted_root: String,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<Endpoints> {
        if self.page_size == 0 {
            return Err(Error::validation("page_size must be at least 1"));
        }
        self.report.validate()?;

        let mut base = self.api_base.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base)
            .map_err(|e| Error::validation(format!("invalid api_base `{base}`: {e}")))?;
        if api_base.host_str().is_none() {
            return Err(Error::validation(format!("api_base `{base}` has no host")));
        }
        let token_url = Url::parse(self.token_url.trim()).map_err(|e| {
            Error::validation(format!("invalid token_url `{}`: {e}", self.token_url))
        })?;

        let trusted_root = self
            .trusted_root
            .trim()
            .trim_start_matches('.')
            .to_ascii_lowercase();
        if trusted_root.is_empty() {
            return Err(Error::validation("trusted_root must not be empty"));
        }

        Ok(Endpoints {
            api_base,
            token_url,
            trusted_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_values() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(45));
        assert_eq!(config.page_size, 200);
        assert_eq!(config.report.poll_interval, Duration::from_secs(4));
        assert_eq!(config.report.poll_deadline, Duration::from_secs(120));

        let endpoints = config.validate().expect("defaults are valid");
        assert_eq!(
            endpoints.api_base.as_str(),
            "https://api.searchads.apple.com/api/v5/"
        );
        assert_eq!(endpoints.trusted_root, "apple.com");
    }

    #[test]
    fn api_base_gets_trailing_slash() {
        let config = ClientConfig::builder()
            .api_base("http://127.0.0.1:9000/api/v5")
            .build();
        let endpoints = config.validate().expect("valid");
        assert_eq!(
            endpoints.api_base.join("campaigns").expect("join").as_str(),
            "http://127.0.0.1:9000/api/v5/campaigns"
        );
    }

    #[test]
    fn rejects_zero_page_size_and_empty_backoff() {
        let config = ClientConfig::builder().page_size(0).build();
        assert!(config.validate().is_err(), "zero page size");

        let policy = ReportPolicy::builder().backoff(vec![]).build();
        assert!(policy.validate().is_err(), "empty backoff");
    }

    #[test]
    fn backoff_schedule_escalates_then_repeats() {
        let policy = ReportPolicy::default();
        let delays: Vec<u64> = (0..6).map(|a| policy.backoff_for(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 5, 10, 15, 15, 15]);
    }
}
