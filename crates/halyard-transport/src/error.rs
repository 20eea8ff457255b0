use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("conflict on {url}: {message}")]
    Conflict { url: String, message: String },

    #[error("HTTP {status} from {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TransportError::Conflict { .. })
    }

    /// Failures worth retrying at the transport level: server errors, rate
    /// limiting, and connection-level failures.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status >= 500 || *status == 429,
            TransportError::Request(_) => true,
            _ => false,
        }
    }
}

/// Map a non-2xx response to a typed error. Returns `None` for success.
///
/// Google APIs wrap failures as `{"error": {"code": .., "message": ..}}`;
/// the message is extracted when present, otherwise the raw body is kept.
pub fn error_for_status(status: u16, url: &str, body: &[u8]) -> Option<TransportError> {
    if (200..300).contains(&status) {
        return None;
    }
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    let url = url.to_string();
    Some(match status {
        404 => TransportError::NotFound { url },
        409 => TransportError::Conflict { url, message },
        _ => TransportError::Status {
            status,
            url,
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_no_error() {
        assert!(error_for_status(200, "u", b"{}").is_none());
        assert!(error_for_status(204, "u", b"").is_none());
    }

    #[test]
    fn google_error_message_is_extracted() {
        let body = br#"{"error":{"code":409,"message":"resource is being modified"}}"#;
        let err = error_for_status(409, "u", body).unwrap();
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "conflict on u: resource is being modified");
    }

    #[test]
    fn transient_classification() {
        assert!(error_for_status(503, "u", b"").unwrap().is_transient());
        assert!(error_for_status(429, "u", b"").unwrap().is_transient());
        assert!(!error_for_status(400, "u", b"bad").unwrap().is_transient());
        assert!(!error_for_status(409, "u", b"").unwrap().is_transient());
        assert!(error_for_status(404, "u", b"").unwrap().is_not_found());
    }
}
