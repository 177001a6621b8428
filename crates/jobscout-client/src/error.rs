use thiserror::Error;

/// Errors returned by the job-search API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The credential was rejected, either by HTTP status (401/403/404) or by
    /// an in-band GraphQL error describing an invalid or expired session.
    #[error("authentication rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// Any other non-2xx HTTP status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// In-band GraphQL error unrelated to authentication.
    #[error("API error: {0}")]
    Api(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    /// Returns `true` when the failure means the credential is no longer
    /// accepted and polling should be suspended.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Auth { .. })
    }

    /// The HTTP status the failure arrived with, when there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth { status, .. } | ClientError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// HTTP statuses treated as a rejected credential. The upstream answers 404
/// for unknown sessions, so it counts alongside 401 and 403.
#[must_use]
pub fn is_auth_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 404)
}

/// Classifies an in-band GraphQL error as auth-class by its type or message.
#[must_use]
pub fn is_auth_message(error_type: Option<&str>, message: Option<&str>) -> bool {
    const MARKERS: &[&str] = &[
        "unauthorized",
        "unauthenticated",
        "not authorized",
        "forbidden",
        "expired",
        "invalid token",
        "invalid session",
    ];
    [error_type, message]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .any(|text| MARKERS.iter().any(|m| text.contains(m)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_are_401_403_404() {
        assert!(is_auth_status(401));
        assert!(is_auth_status(403));
        assert!(is_auth_status(404));
        assert!(!is_auth_status(429));
        assert!(!is_auth_status(500));
        assert!(!is_auth_status(200));
    }

    #[test]
    fn appsync_unauthorized_exception_is_auth() {
        assert!(is_auth_message(
            Some("UnauthorizedException"),
            Some("You are not authorized to make this call.")
        ));
    }

    #[test]
    fn expired_token_message_is_auth() {
        assert!(is_auth_message(None, Some("Token has expired")));
    }

    #[test]
    fn validation_error_is_not_auth() {
        assert!(!is_auth_message(
            Some("ValidationError"),
            Some("Variable 'pageSize' has an invalid value")
        ));
        assert!(!is_auth_message(None, None));
    }

    #[test]
    fn status_is_carried_by_auth_and_http_failures_only() {
        let auth = ClientError::Auth {
            status: 200,
            message: "Token has expired".to_owned(),
        };
        assert_eq!(auth.status(), Some(200));
        let http = ClientError::UnexpectedStatus {
            status: 503,
            url: "https://api.example.com/graphql".to_owned(),
        };
        assert_eq!(http.status(), Some(503));
        assert_eq!(ClientError::Api("bad".to_owned()).status(), None);
    }

    #[test]
    fn only_auth_variant_is_auth_failure() {
        assert!(ClientError::Auth {
            status: 401,
            message: "nope".to_owned()
        }
        .is_auth_failure());
        assert!(!ClientError::UnexpectedStatus {
            status: 500,
            url: "https://example.com".to_owned()
        }
        .is_auth_failure());
        assert!(!ClientError::Api("bad".to_owned()).is_auth_failure());
    }
}
