//! Return-address helpers.
//!
//! Adapters either take their response endpoint from configuration or
//! rebuild it from the origin of the request that started the exchange
//! (`scheme://host:port`) plus a configured path.

use crate::error::{ProtocolError, ProtocolResult};

/// Resolves the endpoint a response must be delivered to.
///
/// A configured absolute URL wins. Otherwise `origin` and `path` are joined.
pub fn resolve_endpoint(
    configured: Option<&str>,
    path: Option<&str>,
    origin: Option<&str>,
    what: &str,
) -> ProtocolResult<String> {
    if let Some(url) = configured {
        return Ok(url.to_string());
    }

    match (origin, path) {
        (Some(origin), Some(path)) => {
            let origin = origin.trim_end_matches('/');
            if path.starts_with('/') {
                Ok(format!("{origin}{path}"))
            } else {
                Ok(format!("{origin}/{path}"))
            }
        }
        (None, Some(_)) => Err(ProtocolError::Configuration(format!(
            "{what} path is configured but the request origin is unknown"
        ))),
        _ => Err(ProtocolError::Configuration(format!(
            "neither {what} URL nor {what} path is configured"
        ))),
    }
}

/// Returns `scheme://host:port` of a URL, with an explicit port.
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let port = parsed.port_or_known_default()?;
    Some(format!("{}://{host}:{port}", parsed.scheme()))
}

/// Appends URL-encoded query parameters to a base URL.
#[must_use]
pub fn append_query(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = base.to_string();
    let mut separator = if base.contains('?') { '&' } else { '?' };

    for (name, value) in params {
        url.push(separator);
        url.push_str(&urlencoding::encode(name));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
        separator = '&';
    }

    url
}

/// Returns the URL without its query string and fragment.
#[must_use]
pub fn without_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_url_wins() {
        let url = resolve_endpoint(
            Some("https://sp.example.com/acs"),
            Some("/other"),
            Some("https://ignored:443"),
            "ACS",
        )
        .unwrap();
        assert_eq!(url, "https://sp.example.com/acs");
    }

    #[test]
    fn path_is_joined_to_origin() {
        let url = resolve_endpoint(None, Some("saml/acs"), Some("https://sp.example.com:8443/"), "ACS")
            .unwrap();
        assert_eq!(url, "https://sp.example.com:8443/saml/acs");
    }

    #[test]
    fn missing_origin_is_configuration_error() {
        assert!(resolve_endpoint(None, Some("/acs"), None, "ACS").is_err());
        assert!(resolve_endpoint(None, None, Some("https://sp"), "ACS").is_err());
    }

    #[test]
    fn origin_has_explicit_port() {
        assert_eq!(
            origin_of("https://rp.example.com/login?next=1").as_deref(),
            Some("https://rp.example.com:443")
        );
        assert_eq!(
            origin_of("http://localhost:8080/x").as_deref(),
            Some("http://localhost:8080")
        );
        assert!(origin_of("not a url").is_none());
    }

    #[test]
    fn query_is_appended_and_encoded() {
        let url = append_query("https://op.example.com/auth", &[("a", "1 2"), ("b", "x&y")]);
        assert_eq!(url, "https://op.example.com/auth?a=1%202&b=x%26y");

        let url = append_query("https://sts.example.com/?tenant=t", &[("wa", "wsignin1.0")]);
        assert_eq!(url, "https://sts.example.com/?tenant=t&wa=wsignin1.0");
    }

    #[test]
    fn query_is_stripped() {
        assert_eq!(without_query("https://rp/return?x=1#f"), "https://rp/return");
        assert_eq!(without_query("https://rp/return"), "https://rp/return");
    }
}
