//! Pending-input session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single text value a session is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwaitedField {
    Recipient,
}

impl AwaitedField {
    pub fn name(&self) -> &'static str {
        match self {
            AwaitedField::Recipient => "recipient",
        }
    }
}

/// A conversation parked until the user replies with one text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInputSession {
    pub user_id: String,
    /// Workflow name the reply feeds into
    pub workflow: String,
    pub awaited: AwaitedField,
    pub created_at: DateTime<Utc>,
}

impl PendingInputSession {
    pub fn new(
        user_id: impl Into<String>,
        workflow: impl Into<String>,
        awaited: AwaitedField,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            workflow: workflow.into(),
            awaited,
            created_at: Utc::now(),
        }
    }

    /// Whether the session outlived `ttl` at instant `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let session =
            PendingInputSession::new("42", "confidential_transfer", AwaitedField::Recipient);
        let ttl = Duration::seconds(300);

        assert!(!session.is_expired(session.created_at + Duration::seconds(299), ttl));
        assert!(session.is_expired(session.created_at + Duration::seconds(301), ttl));
    }
}
