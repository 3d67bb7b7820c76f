use thiserror::Error;

pub type VcsResult<T> = Result<T, VcsError>;

/// Failure of a single call to the parent repository's VCS API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VcsError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("request rejected as invalid: {message}")]
    Validation { message: String },

    #[error("transport failure{}: {message}", http_status_suffix(.status))]
    Transport { status: Option<u16>, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

fn http_status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl VcsError {
    /// Map a non-success HTTP status to an error kind.
    pub fn from_status(status: u16, resource: &str, message: String) -> Self {
        match status {
            401 | 403 => Self::Auth { status, message },
            404 => Self::NotFound { resource: resource.to_string() },
            400 | 422 => Self::Validation { message },
            _ => Self::Transport { status: Some(status), message },
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { status: None, message: message.into() }
    }

    /// Short machine-readable label, used as a structured log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Auth { .. } => "auth",
            Self::Validation { .. } => "validation",
            Self::Transport { .. } => "transport",
            Self::Decode(_) => "decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VcsError;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            VcsError::from_status(401, "branch", "bad creds".into()),
            VcsError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            VcsError::from_status(403, "branch", "forbidden".into()),
            VcsError::Auth { status: 403, .. }
        ));
        assert_eq!(
            VcsError::from_status(404, "branch app:main", "Not Found".into()),
            VcsError::NotFound { resource: "branch app:main".into() }
        );
        assert!(matches!(
            VcsError::from_status(422, "tree", "bad mode".into()),
            VcsError::Validation { .. }
        ));
        assert_eq!(
            VcsError::from_status(502, "tree", "bad gateway".into()),
            VcsError::Transport { status: Some(502), message: "bad gateway".into() }
        );
    }

    #[test]
    fn transport_display_includes_status_when_known() {
        let with_status = VcsError::Transport { status: Some(503), message: "down".into() };
        assert_eq!(with_status.to_string(), "transport failure (HTTP 503): down");
        assert_eq!(VcsError::transport("timed out").to_string(), "transport failure: timed out");
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(VcsError::Decode("x".into()).kind(), "decode");
        assert_eq!(VcsError::transport("x").kind(), "transport");
    }
}
