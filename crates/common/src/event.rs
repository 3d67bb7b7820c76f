// Webhook event kinds, as carried in the `X-GitHub-Event` header.

use std::fmt;

/// Classification of an inbound delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push,
    /// Sent once when a webhook is created.
    Ping,
    Other(String),
}

impl EventKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "push" => Self::Push,
            "ping" => Self::Ping,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::Ping => "ping",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Self::Push)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
