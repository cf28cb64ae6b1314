use thiserror::Error;

/// Errors surfaced by the HTTP adapter and the domain façades.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never completed (connection refused, DNS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The response was not JSON, or lacked the fields we need.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("authentication required")]
    AuthenticationRequired,

    /// Session token could not be decoded. Never escapes session restore.
    #[error("could not decode token: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Network unreachable or non-2xx status.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http { .. } | ClientError::Network(_))
    }

    /// HTTP status, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn malformed(what: impl std::fmt::Display) -> Self {
        ClientError::MalformedResponse(what.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ClientError::Http { status: status.as_u16(), message: err.to_string() },
            None => ClientError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        let http = ClientError::Http { status: 500, message: "boom".into() };
        assert!(http.is_transport());
        assert_eq!(http.status(), Some(500));

        assert!(ClientError::Network("refused".into()).is_transport());
        assert!(!ClientError::AuthenticationRequired.is_transport());
        assert!(!ClientError::malformed("missing field").is_transport());
        assert_eq!(ClientError::Cancelled.status(), None);
    }

    #[test]
    fn json_errors_are_malformed_responses() {
        let err: ClientError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }
}
