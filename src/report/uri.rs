use url::Url;

use crate::Result;
use crate::error::{Error, safe_display_url};

/// Strips JSON-style quoting and escaped slashes some responses leave in place.
fn unwrap_raw(raw: &str) -> String {
    let mut text = raw.trim().to_owned();
    if text.starts_with('"')
        && let Ok(unquoted) = serde_json::from_str::<String>(&text)
    {
        text = unquoted.trim().to_owned();
    }
    text.trim_matches(['"', '\''])
        .replace("\\/", "/")
        .trim()
        .to_owned()
}

fn resolve(text: &str, api_base: &Url) -> Result<Url> {
    let invalid = |e: url::ParseError| {
        Error::validation(format!(
            "report download URI {} is invalid: {e}",
            safe_display_url(text)
        ))
    };

    match Url::parse(text) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) if text.starts_with('/') => {
            api_base.join(text).map_err(invalid)
        }
        // host without a scheme
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{text}")).map_err(invalid)
        }
        Err(e) => Err(invalid(e)),
    }
}

/// Checks a report download link before any bearer token is attached to it.
///
/// Accepts absolute, host-only, root-relative and scheme-relative forms. The
/// relative ones resolve against `api_base`. `http` is upgraded to `https`;
/// any other scheme is rejected. The host must be the API host, `trusted_root`
/// itself, or a subdomain of it.
pub fn validate_download_uri(raw: &str, api_base: &Url, trusted_root: &str) -> Result<Url> {
    let text = unwrap_raw(raw);
    if text.is_empty() {
        return Err(Error::validation("report download URI is empty"));
    }

    let mut url = resolve(&text, api_base)?;
    if url.scheme() == "http" && url.set_scheme("https").is_err() {
        return Err(Error::validation(format!(
            "report download URI {} cannot be upgraded to https",
            safe_display_url(&text)
        )));
    }
    if url.scheme() != "https" {
        return Err(Error::validation(format!(
            "report download URI {} must use https",
            safe_display_url(&text)
        )));
    }

    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return Err(Error::validation(format!(
            "report download URI {} has no host",
            safe_display_url(&text)
        )));
    };
    let root = trusted_root.trim().trim_start_matches('.').to_ascii_lowercase();
    let api_host = api_base.host_str().map(str::to_ascii_lowercase);
    let trusted = host == root
        || host.ends_with(&format!(".{root}"))
        || api_host.as_deref() == Some(host.as_str());
    if !trusted {
        return Err(Error::validation(format!(
            "report download host {host} is not trusted"
        )));
    }

    Ok(url)
}
