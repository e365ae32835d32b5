use keyward_core::{KeywardError, Provider};

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failures from a provider call. Messages are built from status codes and
/// endpoint paths only, never from request headers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("transport error{}: {message}", fmt_status(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("unexpected response shape: {0}")]
    UnexpectedResponseShape(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AdapterError {
    pub fn transport(message: impl Into<String>) -> Self {
        AdapterError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        AdapterError::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AdapterError::Transport { status, .. } => *status,
            AdapterError::UnexpectedResponseShape(_) => None,
        }
    }

    /// Attach the provider for surfacing at the operation boundary.
    pub fn into_keyward(self, provider: Provider) -> KeywardError {
        match self {
            AdapterError::Transport { status, message } => KeywardError::Transport {
                provider,
                status,
                message,
            },
            AdapterError::UnexpectedResponseShape(detail) => {
                KeywardError::UnexpectedResponseShape { provider, detail }
            }
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        // The URL carries no credentials, but drop it anyway to keep messages short
        let message = err.without_url().to_string();
        AdapterError::Transport { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display() {
        let err = AdapterError::http_status(503, "GET /models");
        assert_eq!(err.to_string(), "transport error (HTTP 503): GET /models");
        assert_eq!(AdapterError::transport("timed out").to_string(), "transport error: timed out");
    }

    #[test]
    fn converts_with_provider() {
        let err = AdapterError::http_status(500, "boom").into_keyward(Provider::Xai);
        assert!(matches!(
            err,
            KeywardError::Transport {
                provider: Provider::Xai,
                status: Some(500),
                ..
            }
        ));
        assert_eq!(err.audit_status(), 500);

        let err = AdapterError::UnexpectedResponseShape("no data".into())
            .into_keyward(Provider::Gemini);
        assert_eq!(err.to_string(), "unexpected response from Google Gemini: no data");
    }
}
