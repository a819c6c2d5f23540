//! KuFlow client errors.

use thiserror::Error;

use crate::models::DefaultError;

/// Error returned by every [`KuFlowRestClient`](crate::KuFlowRestClient)
/// operation.
#[derive(Error, Debug)]
pub enum KuFlowError {
    /// The API answered with a non-2xx status.
    #[error("KuFlow API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Request to KuFlow failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response or webhook payload is not the expected JSON.
    #[error("Failed to decode KuFlow payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client was built with missing or invalid settings.
    #[error("Invalid KuFlow client configuration: {0}")]
    Configuration(String),
}

/// Result type alias for KuFlow operations.
pub type KuFlowResult<T> = Result<T, KuFlowError>;

impl KuFlowError {
    /// Build an API error from a failed response, using the vendor error
    /// document when the body carries one.
    pub(crate) fn from_response(status: reqwest::StatusCode, body: &[u8]) -> Self {
        let document = serde_json::from_slice::<DefaultError>(body).ok();
        let message = document
            .as_ref()
            .and_then(|d| d.message.clone())
            .or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Self::Api {
            status: status.as_u16(),
            code: document.and_then(|d| d.code),
            message,
        }
    }

    /// HTTP status of API errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::Configuration(_) => None,
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Client errors (4xx) are final except 408 and 429. Decode and
    /// configuration errors are final too.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Decode(_) | Self::Configuration(_) => false,
            _ => match self.status() {
                Some(408 | 429) | None => true,
                Some(status) => !(400..500).contains(&status),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_api_error_reads_vendor_document() {
        let body = br#"{"status":403,"code":"ACCESS_DENIED","message":"Forbidden resource"}"#;
        let err = KuFlowError::from_response(StatusCode::FORBIDDEN, body);

        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "KuFlow API error 403: Forbidden resource");
        match err {
            KuFlowError::Api { code, .. } => assert_eq!(code.as_deref(), Some("ACCESS_DENIED")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_reason() {
        let err = KuFlowError::from_response(StatusCode::CONFLICT, b"");
        assert_eq!(err.to_string(), "KuFlow API error 409: Conflict");

        let err = KuFlowError::from_response(StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(err.to_string(), "KuFlow API error 502: upstream down");
    }

    #[test]
    fn test_retry_classification() {
        let api = |status| KuFlowError::Api {
            status,
            code: None,
            message: String::new(),
        };
        assert!(!api(400).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(api(408).is_retryable());
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!KuFlowError::Configuration("x".to_string()).is_retryable());
    }
}
