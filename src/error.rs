use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Method, StatusCode};

const REDACTED: &str = "[REDACTED]";

static BEARER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*").ok());

/// Secret-looking `name=value` pairs, including prefixed names such as
/// `api_key` or `x_token`. Group 1 is the preceding separator.
static SECRET_PARAM_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[^a-z0-9_])((?:[a-z0-9]+_)*(?:access_token|refresh_token|id_token|client_secret|token|signature|sig|key|code))=[^&\s,;]+",
    )
    .ok()
});

#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Credentials are missing, incomplete or unusable, or the token exchange produced no usable context
    Auth,
    /// Error related to a non-successful HTTP response from the API
    Status,
    /// Malformed input or an untrusted download location
    Validation,
    /// A request or polling deadline elapsed
    Timeout,
    /// The caller's cancellation token fired before the operation finished
    Cancelled,
    /// Every fallback route and payload variant was tried without success
    Exhausted,
    /// Transport, decoding and other internal failures
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    /// HTTP status of the upstream response, when this error came from one.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        self.downcast_ref::<Status>().map(|s| s.status_code)
    }

    /// Whether the upstream asked us to slow down. This is the only retry signal
    /// the report pipeline acts on.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn auth(reason: AuthFailure) -> Self {
        Auth { reason }.into()
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        message: S,
    ) -> Self {
        Status {
            status_code,
            method,
            path,
            message: message.into(),
        }
        .into()
    }

    pub fn timeout<S: Into<String>>(operation: S, elapsed: Duration) -> Self {
        Timeout {
            operation: operation.into(),
            elapsed,
        }
        .into()
    }

    pub fn exhausted<S: Into<String>>(operation: S, attempts: usize) -> Self {
        Exhausted {
            operation: operation.into(),
            attempts,
        }
        .into()
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Self::with_source(Kind::Cancelled, Cancelled)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::with_source(
            Kind::Internal,
            Internal {
                message: message.into(),
            },
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthFailure {
    MissingCredentials,
    MissingOrgId,
    MissingAccessToken,
    InvalidKey(String),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::MissingCredentials => f.write_str("credentials are missing or incomplete"),
            AuthFailure::MissingOrgId => f.write_str("organization id could not be resolved"),
            AuthFailure::MissingAccessToken => f.write_str("token response missing access_token"),
            AuthFailure::InvalidKey(reason) => write!(f, "private key is invalid: {reason}"),
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Auth {
    pub reason: AuthFailure,
}

impl fmt::Display for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed: {}", self.reason)
    }
}

impl StdError for Auth {}

/// Non-successful upstream response. `message` is already sanitized.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error({}) making {} call to {} with {}",
            self.status_code.as_u16(),
            self.method,
            self.path,
            self.message
        )
    }
}

impl StdError for Status {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeout {
    pub operation: String,
    pub elapsed: Duration,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} did not finish within {}s",
            self.operation,
            self.elapsed.as_secs()
        )
    }
}

impl StdError for Timeout {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exhausted {
    pub operation: String,
    pub attempts: usize,
}

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unable to {} after trying {} supported route and payload variants",
            self.operation, self.attempts
        )
    }
}

impl StdError for Exhausted {}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl StdError for Cancelled {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Internal {
    pub message: String,
}

impl fmt::Display for Internal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Internal {}

impl From<Auth> for Error {
    fn from(err: Auth) -> Self {
        Error::with_source(Kind::Auth, err)
    }
}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<Timeout> for Error {
    fn from(err: Timeout) -> Self {
        Error::with_source(Kind::Timeout, err)
    }
}

impl From<Exhausted> for Error {
    fn from(err: Exhausted) -> Self {
        Error::with_source(Kind::Exhausted, err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // reqwest embeds the full request URL; keep only what is safe to show
        let err = err.without_url();
        if err.is_timeout() {
            Error::with_source(Kind::Timeout, err)
        } else {
            Error::with_source(Kind::Internal, err)
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

impl From<serde_html_form::ser::Error> for Error {
    fn from(err: serde_html_form::ser::Error) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

/// Strips bearer tokens and secret-bearing query parameters from upstream text.
#[must_use]
pub fn sanitize_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Unknown error".to_owned();
    }

    let mut text = trimmed.to_owned();
    if let Some(pattern) = BEARER_PATTERN.as_ref() {
        text = pattern
            .replace_all(&text, format!("Bearer {REDACTED}").as_str())
            .into_owned();
    }
    if let Some(pattern) = SECRET_PARAM_PATTERN.as_ref() {
        text = pattern
            .replace_all(&text, format!("${{1}}${{2}}={REDACTED}").as_str())
            .into_owned();
    }
    text
}

/// Drops query string and fragment so signed download links are safe to display.
#[must_use]
pub fn safe_display_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_owned(),
    }
}
