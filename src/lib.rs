#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod invoker;
pub mod normalize;
pub mod pagination;
pub mod report;
pub mod transport;
pub mod types;

use std::result::Result as StdResult;

pub use client::{
    Client, ImpressionShareRequest, NewAdGroup, NewCampaign, NewKeyword, NewNegativeKeyword,
};
pub use config::{ClientConfig, ReportPolicy};
pub use credentials::{Credential, CredentialSource, EnvCredentials};
pub use error::Error;
pub use report::{ReportPipeline, SovOutcome};

pub type Result<T> = StdResult<T, Error>;

/// Seconds since the UNIX epoch.
pub type Timestamp = i64;

pub const DEFAULT_API_BASE: &str = "https://api.searchads.apple.com/api/v5/";
pub const DEFAULT_TOKEN_URL: &str = "https://appleid.apple.com/auth/oauth2/token";
pub const DEFAULT_AUDIENCE: &str = "https://appleid.apple.com";
pub const DEFAULT_SCOPE: &str = "searchadsorg";
pub const DEFAULT_TRUSTED_ROOT: &str = "apple.com";

/// Header carrying the organization context on every resource call.
pub const ORG_CONTEXT_HEADER: &str = "X-AP-Context";
