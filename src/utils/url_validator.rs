//! Original URL validation and short URL composition.

use serde_json::json;
use url::Url;

use crate::error::AppError;

/// Errors that can occur while validating an original URL.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must contain a host")]
    MissingHost,

    #[error("URL must not have leading or trailing whitespace")]
    SurroundingWhitespace,
}

/// Checks that `input` is a non-empty absolute HTTP(S) URL with a host.
///
/// The URL is not rewritten: deduplication works on the exact string the
/// caller submitted, so that string must already be trimmed.
///
/// # Errors
///
/// See [`UrlValidationError`].
pub fn check_url(input: &str) -> Result<(), UrlValidationError> {
    if input.trim().is_empty() {
        return Err(UrlValidationError::Empty);
    }

    if input.trim() != input {
        return Err(UrlValidationError::SurroundingWhitespace);
    }

    let url = Url::parse(input).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(())
}

/// Same as [`check_url`], mapped into [`AppError::Validation`].
pub fn validate_original_url(input: &str) -> Result<(), AppError> {
    check_url(input).map_err(|e| {
        AppError::bad_request(
            "Invalid URL",
            json!({ "url": input, "reason": e.to_string() }),
        )
    })
}

/// Joins the public base URL and a short ID with exactly one slash.
pub fn join_short_url(base_url: &str, short_id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), short_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(check_url("http://example.com").is_ok());
        assert!(check_url("https://example.com/a?b=c#d").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(check_url(""), Err(UrlValidationError::Empty));
        assert_eq!(check_url("   "), Err(UrlValidationError::Empty));
    }

    #[test]
    fn test_rejects_untrimmed() {
        assert_eq!(
            check_url(" https://example.com"),
            Err(UrlValidationError::SurroundingWhitespace)
        );
        assert_eq!(
            check_url("https://example.com\n"),
            Err(UrlValidationError::SurroundingWhitespace)
        );
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(
            check_url("/just/a/path"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            check_url("not-a-url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_dangerous_schemes() {
        assert_eq!(
            check_url("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedProtocol)
        );
        assert_eq!(
            check_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedProtocol)
        );
    }

    #[test]
    fn test_validate_maps_to_validation_error() {
        let err = validate_original_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_join_short_url() {
        assert_eq!(
            join_short_url("http://localhost:8080", "abcd1234"),
            "http://localhost:8080/abcd1234"
        );
        assert_eq!(
            join_short_url("http://localhost:8080/", "abcd1234"),
            "http://localhost:8080/abcd1234"
        );
    }
}
