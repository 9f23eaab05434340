//! Scheme guard.
//!
//! The only access control the relay performs: the target must be an
//! absolute URL using the same scheme as the inbound request. There is no
//! host allow-list; deployments exposed to untrusted callers need one in
//! front of this component.

use crate::proxy::error::ProxyError;
use crate::proxy::url::UrlDescriptor;

/// Validate a caller-supplied target against the inbound scheme.
///
/// `raw` is `None` when no target was supplied at all. An unparsable target
/// is treated the same as a scheme mismatch.
pub fn validate_target(inbound_scheme: &str, raw: Option<&str>) -> Result<UrlDescriptor, ProxyError> {
    let raw = raw.ok_or(ProxyError::MissingParameter)?;
    let descriptor = UrlDescriptor::parse(raw).map_err(|e| {
        tracing::debug!(target_url = %raw, error = %e, "Rejecting unparsable target");
        ProxyError::SchemeMismatch
    })?;
    check_scheme(inbound_scheme, descriptor)
}

/// Reject a parsed target whose scheme differs from the inbound one.
pub fn check_scheme(inbound_scheme: &str, descriptor: UrlDescriptor) -> Result<UrlDescriptor, ProxyError> {
    if descriptor.scheme.eq_ignore_ascii_case(inbound_scheme) {
        Ok(descriptor)
    } else {
        Err(ProxyError::SchemeMismatch)
    }
}

/// Extract the first `url` query parameter, percent-decoded.
pub fn url_parameter(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_is_missing_parameter() {
        assert!(matches!(validate_target("http", None), Err(ProxyError::MissingParameter)));
    }

    #[test]
    fn scheme_must_match() {
        assert!(matches!(
            validate_target("https", Some("http://example.org/wms")),
            Err(ProxyError::SchemeMismatch)
        ));
        assert!(matches!(
            validate_target("http", Some("https://example.org/wms")),
            Err(ProxyError::SchemeMismatch)
        ));
        let ok = validate_target("HTTPS", Some("https://example.org/wms")).unwrap();
        assert_eq!(ok.host, "example.org");
    }

    #[test]
    fn unparsable_is_scheme_mismatch() {
        assert!(matches!(validate_target("http", Some("/relative/path")), Err(ProxyError::SchemeMismatch)));
        assert!(matches!(validate_target("http", Some("")), Err(ProxyError::SchemeMismatch)));
    }

    #[test]
    fn url_parameter_is_decoded() {
        let q = "foo=1&url=http%3A%2F%2Fexample.org%2Fwms%3Fservice%3DWMS%26request%3DGetCapabilities";
        assert_eq!(
            url_parameter(Some(q)).as_deref(),
            Some("http://example.org/wms?service=WMS&request=GetCapabilities")
        );
    }

    #[test]
    fn url_parameter_absent() {
        assert_eq!(url_parameter(None), None);
        assert_eq!(url_parameter(Some("uri=http://x")), None);
        assert_eq!(url_parameter(Some("url=")).as_deref(), Some(""));
    }
}
