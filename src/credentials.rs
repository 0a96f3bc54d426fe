//! Signing credentials and the boundary through which they are supplied.
//!
//! How credentials are stored is the caller's business. The client only asks a
//! [`CredentialSource`] for the current value on every authentication, which is
//! what lets a rotated key invalidate the cached token.

use std::fmt;

use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use sha2::{Digest as _, Sha256};

use crate::Result;
use crate::error::{AuthFailure, Error};

const ENV_CREDENTIALS_JSON: &str = "OE_ADS_CREDENTIALS_JSON";
const ENV_CLIENT_ID: &str = "OE_ADS_CLIENT_ID";
const ENV_TEAM_ID: &str = "OE_ADS_TEAM_ID";
const ENV_KEY_ID: &str = "OE_ADS_KEY_ID";
const ENV_PRIVATE_KEY: &str = "OE_ADS_PRIVATE_KEY";
const ENV_ORG_ID: &str = "OE_ADS_ORG_ID";

/// Long-lived asymmetric credential from which bearer tokens are derived.
#[non_exhaustive]
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub client_id: String,
    pub team_id: String,
    pub key_id: String,
    pub private_key: SecretString,
    /// Organization the caller expects to act for. Informational: the
    /// organization context is always taken from `/me`.
    #[serde(default)]
    pub org_id: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("private_key", &"[REDACTED]")
            .field("org_id", &self.org_id)
            .finish()
    }
}

impl Credential {
    #[must_use]
    pub fn new<C, T, K, P>(client_id: C, team_id: T, key_id: K, private_key: P) -> Self
    where
        C: Into<String>,
        T: Into<String>,
        K: Into<String>,
        P: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            team_id: team_id.into(),
            key_id: key_id.into(),
            private_key: SecretString::from(private_key.into()),
            org_id: None,
        }
    }

    #[must_use]
    pub fn with_org_id<S: Into<String>>(mut self, org_id: S) -> Self {
        let org_id = org_id.into();
        self.org_id = (!org_id.trim().is_empty()).then_some(org_id);
        self
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty()
            && !self.team_id.trim().is_empty()
            && !self.key_id.trim().is_empty()
            && !self.private_key.expose_secret().trim().is_empty()
    }

    /// SHA-256 over the four required fields; the token cache key.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let joined = [
            self.client_id.as_str(),
            self.team_id.as_str(),
            self.key_id.as_str(),
            self.private_key.expose_secret(),
        ]
        .join("|");
        format!("{:x}", Sha256::digest(joined.as_bytes()))
    }

    /// Parses the JSON blob form (`clientId`, `teamId`, `keyId`, `privateKey`, `orgId?`).
    pub fn from_json(raw: &str) -> Result<Self> {
        let credential: Credential = serde_json::from_str(raw)
            .map_err(|e| Error::validation(format!("invalid credentials JSON: {e}")))?;
        if !credential.is_complete() {
            return Err(Error::auth(AuthFailure::MissingCredentials));
        }
        Ok(credential)
    }
}

/// External collaborator supplying the current credential.
///
/// Returning `Ok(None)` means "no credential configured" and surfaces as
/// [`AuthFailure::MissingCredentials`].
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
}

impl CredentialSource for Credential {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(Some(self.clone()))
    }
}

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Reads credentials from the process environment, either as a JSON blob in
/// `OE_ADS_CREDENTIALS_JSON` or from the discrete `OE_ADS_*` variables.
#[expect(clippy::module_name_repetitions, reason = "named after its source, alongside the other credential sources")]
pub struct EnvCredentials {
    lookup: Box<Lookup>,
}

impl fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentials").finish_non_exhaustive()
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvCredentials {
    #[must_use]
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Uses `lookup` instead of the process environment.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str) -> String {
        (self.lookup)(key)
            .map(|v| v.trim().to_owned())
            .unwrap_or_default()
    }
}

impl CredentialSource for EnvCredentials {
    fn load(&self) -> Result<Option<Credential>> {
        let blob = self.var(ENV_CREDENTIALS_JSON);
        if !blob.is_empty() {
            return Credential::from_json(&blob).map(Some);
        }

        let client_id = self.var(ENV_CLIENT_ID);
        let team_id = self.var(ENV_TEAM_ID);
        let key_id = self.var(ENV_KEY_ID);
        let private_key = self.var(ENV_PRIVATE_KEY);
        if client_id.is_empty() || team_id.is_empty() || key_id.is_empty() || private_key.is_empty()
        {
            return Ok(None);
        }

        Ok(Some(
            Credential::new(client_id, team_id, key_id, private_key)
                .with_org_id(self.var(ENV_ORG_ID)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn sample() -> Credential {
        Credential::new("client", "team", "key", "pem")
    }

    #[test]
    fn fingerprint_changes_with_every_required_field() {
        let base = sample().fingerprint();
        assert_eq!(base, sample().fingerprint(), "stable for equal input");
        assert_eq!(base.len(), 64, "hex sha256");

        let variants = [
            Credential::new("client2", "team", "key", "pem"),
            Credential::new("client", "team2", "key", "pem"),
            Credential::new("client", "team", "key2", "pem"),
            Credential::new("client", "team", "key", "pem2"),
        ];
        for variant in variants {
            assert_ne!(base, variant.fingerprint(), "{variant:?}");
        }

        let with_org = sample().with_org_id("123");
        assert_eq!(base, with_org.fingerprint(), "org id is not part of the key");
    }

    #[test]
    fn debug_never_prints_private_key() {
        let rendered = format!("{:?}", Credential::new("c", "t", "k", "super-secret-pem"));
        assert!(!rendered.contains("super-secret-pem"), "{rendered}");
    }

    #[test]
    fn json_blob_requires_all_fields() {
        let ok = Credential::from_json(
            r#"{"clientId":"c","teamId":"t","keyId":"k","privateKey":"p","orgId":"42"}"#,
        )
        .expect("complete");
        assert_eq!(ok.org_id.as_deref(), Some("42"));

        let err = Credential::from_json(r#"{"clientId":"c","teamId":"t","keyId":"k","privateKey":" "}"#)
            .expect_err("blank key");
        assert_eq!(err.kind(), crate::error::Kind::Auth);
    }

    #[test]
    fn env_source_reads_discrete_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_CLIENT_ID, "c"),
            (ENV_TEAM_ID, "t"),
            (ENV_KEY_ID, "k"),
            (ENV_PRIVATE_KEY, "p"),
            (ENV_ORG_ID, " "),
        ]);
        let source = EnvCredentials::with_lookup(move |k| vars.get(k).map(|v| (*v).to_owned()));
        let credential = source.load().expect("load").expect("present");
        assert_eq!(credential.client_id, "c");
        assert_eq!(credential.org_id, None);

        let empty = EnvCredentials::with_lookup(|_| None);
        assert!(empty.load().expect("load").is_none(), "nothing configured");
    }
}
