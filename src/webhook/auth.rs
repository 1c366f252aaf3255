//! Shared-secret authentication for inbound webhooks.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Why a request failed authentication. Only the reason is ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Missing,
    Mismatch,
    /// No secret is configured; every request is refused.
    Unconfigured,
}

impl AuthFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::Missing => "missing",
            AuthFailure::Mismatch => "mismatch",
            AuthFailure::Unconfigured => "unconfigured",
        }
    }
}

/// Compare the secret header against the configured secret.
pub fn verify_secret(
    headers: &HeaderMap,
    header_name: &str,
    configured: Option<&str>,
) -> Result<(), AuthFailure> {
    let Some(expected) = configured.filter(|s| !s.is_empty()) else {
        return Err(AuthFailure::Unconfigured);
    };
    let Some(presented) = headers.get(header_name) else {
        return Err(AuthFailure::Missing);
    };

    // ct_eq rejects a length mismatch up front, then compares every byte.
    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthFailure::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "x-webhook-secret";

    fn headers_with(secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER, secret.parse().unwrap());
        headers
    }

    #[test]
    fn test_matching_secret_passes() {
        assert_eq!(verify_secret(&headers_with("s3cret"), HEADER, Some("s3cret")), Ok(()));
    }

    #[test]
    fn test_wrong_length_and_wrong_value_both_mismatch() {
        assert_eq!(
            verify_secret(&headers_with("short"), HEADER, Some("s3cret")),
            Err(AuthFailure::Mismatch)
        );
        assert_eq!(
            verify_secret(&headers_with("s3creT"), HEADER, Some("s3cret")),
            Err(AuthFailure::Mismatch)
        );
    }

    #[test]
    fn test_prefix_and_extension_of_secret_mismatch() {
        for presented in ["s3cre", "s3cret-and-more", ""] {
            assert_eq!(
                verify_secret(&headers_with(presented), HEADER, Some("s3cret")),
                Err(AuthFailure::Mismatch),
                "{presented:?} must not authenticate"
            );
        }
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            verify_secret(&HeaderMap::new(), HEADER, Some("s3cret")),
            Err(AuthFailure::Missing)
        );
    }

    #[test]
    fn test_no_configured_secret_rejects() {
        assert_eq!(
            verify_secret(&headers_with("anything"), HEADER, None),
            Err(AuthFailure::Unconfigured)
        );
        assert_eq!(
            verify_secret(&headers_with(""), HEADER, Some("")),
            Err(AuthFailure::Unconfigured)
        );
        assert_eq!(AuthFailure::Unconfigured.reason(), "unconfigured");
    }
}
