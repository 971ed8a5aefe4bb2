//! Pending-input conversation for confidential transfers
//!
//! `Idle -> AwaitingRecipient -> Idle`. The trigger parks a session and
//! prompts for a recipient; the next text message from that user is
//! validated and, once accepted, runs the confidential transfer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::domain::result::Result;
use crate::domain::workflow::CONFIDENTIAL_TRANSFER;
use crate::domain::{ActionMenu, AwaitedField, PendingInputSession, Recipient, WorkflowKind};
use crate::ports::Notifier;

use super::logging::{events, LogEvent, LoggingService};
use super::workflow::{WorkflowEngine, WorkflowReport};

pub const RECIPIENT_PROMPT: &str =
    "Please enter the recipient's Solana public key for the confidential transfer:";
pub const INVALID_RECIPIENT: &str =
    "❌ Invalid public key. Please enter a valid Solana public key.";
pub const SESSION_EXPIRED: &str =
    "⌛ The transfer request timed out. Pick an action to start again.";

/// At most one pending session per user
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, PendingInputSession>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, PendingInputSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Park a session, replacing any earlier one for the same user
    pub fn open(&self, session: PendingInputSession) {
        self.sessions().insert(session.user_id.clone(), session);
    }

    pub fn get(&self, user_id: &str) -> Option<PendingInputSession> {
        self.sessions().get(user_id).cloned()
    }

    pub fn close(&self, user_id: &str) -> Option<PendingInputSession> {
        self.sessions().remove(user_id)
    }

    /// Drop every session that outlived the ttl at `now` and return them
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Vec<PendingInputSession> {
        let ttl = self.ttl;
        let mut sessions = self.sessions();
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| s.is_expired(now, ttl))
            .map(|s| s.user_id.clone())
            .collect();
        expired.iter().filter_map(|id| sessions.remove(id)).collect()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened to a text message
#[derive(Debug)]
pub enum InputOutcome {
    /// No session was waiting for this user
    Ignored,
    /// The session had timed out and was dropped
    Expired,
    /// The recipient was accepted and the transfer ran
    Executed(WorkflowReport),
}

/// Drives the recipient conversation on top of the workflow engine
pub struct TransferConversation {
    engine: Arc<WorkflowEngine>,
    sessions: SessionRegistry,
    logger: Option<Arc<LoggingService>>,
}

impl TransferConversation {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        ttl: Duration,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            engine,
            sessions: SessionRegistry::new(ttl),
            logger,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }

    /// Sweep expired sessions; true if `user_id` had one of them
    fn expire_sessions(&self, now: DateTime<Utc>, user_id: &str) -> bool {
        let mut own = false;
        for session in self.sessions.purge_expired(now) {
            own |= session.user_id == user_id;
            self.log(
                LogEvent::new(events::SESSION_EXPIRED)
                    .with_user(session.user_id)
                    .with_workflow(session.workflow),
            );
        }
        own
    }

    /// Enter `AwaitingRecipient` and prompt the user
    pub fn begin(&self, user_id: &str, notifier: &dyn Notifier) -> PendingInputSession {
        self.expire_sessions(Utc::now(), user_id);
        let session = PendingInputSession::new(
            user_id,
            CONFIDENTIAL_TRANSFER,
            AwaitedField::Recipient,
        );
        self.sessions.open(session.clone());
        notifier.deliver(user_id, RECIPIENT_PROMPT, None);
        session
    }

    /// Feed one text message from `user_id`
    pub fn handle_text(
        &self,
        user_id: &str,
        text: &str,
        notifier: &dyn Notifier,
    ) -> Result<InputOutcome> {
        self.handle_text_at(user_id, text, Utc::now(), notifier)
    }

    /// Same as [`TransferConversation::handle_text`] with an explicit clock
    pub fn handle_text_at(
        &self,
        user_id: &str,
        text: &str,
        now: DateTime<Utc>,
        notifier: &dyn Notifier,
    ) -> Result<InputOutcome> {
        if self.expire_sessions(now, user_id) {
            notifier.deliver(user_id, SESSION_EXPIRED, Some(&ActionMenu::main()));
            return Ok(InputOutcome::Expired);
        }

        let Some(session) = self.sessions.get(user_id) else {
            return Ok(InputOutcome::Ignored);
        };

        let recipient = match Recipient::parse(text) {
            Ok(recipient) => recipient,
            Err(e) => {
                self.log(
                    LogEvent::new(events::RECIPIENT_REJECTED)
                        .with_user(user_id)
                        .with_workflow(session.workflow)
                        .with_error(e.to_string()),
                );
                notifier.deliver(user_id, INVALID_RECIPIENT, None);
                return Err(e);
            }
        };

        // Accepted: the session ends whatever the transfer does
        self.sessions.close(user_id);
        let report = self
            .engine
            .run(user_id, &WorkflowKind::ConfidentialTransfer(recipient), notifier)?;
        Ok(InputOutcome::Executed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::DemoLedger;
    use crate::domain::result::Error;
    use crate::domain::{AssetMints, Signer};
    use crate::ports::RecordingNotifier;
    use crate::services::account::AccountStore;
    use tempfile::tempdir;

    const VALID: &str = "ErEBS6qJqRBmF8Brot77LyrGnGJgRijX1LudBjwN6EAs";

    fn conversation(dir: &std::path::Path) -> TransferConversation {
        let accounts = AccountStore::new(dir).unwrap();
        let mints = AssetMints {
            stable: "S".to_string(),
            shielded: "C".to_string(),
        };
        let engine = WorkflowEngine::new(
            accounts,
            Arc::new(DemoLedger::new()),
            mints,
            Signer::new(VALID, dir.join("bot.json")),
            None,
        );
        TransferConversation::new(Arc::new(engine), Duration::seconds(300), None)
    }

    #[test]
    fn test_text_without_session_is_ignored() {
        let dir = tempdir().unwrap();
        let conversation = conversation(dir.path());
        let notifier = RecordingNotifier::new();

        let outcome = conversation.handle_text("u1", VALID, &notifier).unwrap();

        assert!(matches!(outcome, InputOutcome::Ignored));
        assert!(notifier.deliveries().is_empty());
    }

    #[test]
    fn test_invalid_input_keeps_session() {
        let dir = tempdir().unwrap();
        let conversation = conversation(dir.path());
        let notifier = RecordingNotifier::new();
        conversation.begin("u1", &notifier);

        let err = conversation.handle_text("u1", "abc", &notifier).unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(conversation.sessions().get("u1").is_some());
        assert_eq!(
            notifier.texts(),
            vec![RECIPIENT_PROMPT.to_string(), INVALID_RECIPIENT.to_string()]
        );
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let dir = tempdir().unwrap();
        let conversation = conversation(dir.path());
        let notifier = RecordingNotifier::new();
        let session = conversation.begin("u1", &notifier);

        let later = session.created_at + Duration::seconds(301);
        let outcome = conversation.handle_text_at("u1", VALID, later, &notifier).unwrap();

        assert!(matches!(outcome, InputOutcome::Expired));
        assert!(conversation.sessions().is_empty());
        assert_eq!(notifier.texts().last().map(String::as_str), Some(SESSION_EXPIRED));
    }

    #[test]
    fn test_other_users_traffic_sweeps_abandoned_sessions() {
        let dir = tempdir().unwrap();
        let conversation = conversation(dir.path());
        let notifier = RecordingNotifier::new();
        let first = conversation.begin("u0", &notifier);
        for i in 1..1000 {
            conversation.begin(&format!("u{}", i), &notifier);
        }
        assert_eq!(conversation.sessions().len(), 1000);

        let later = first.created_at + Duration::days(30);
        let outcome = conversation
            .handle_text_at("someone_else", "hello", later, &notifier)
            .unwrap();

        assert!(matches!(outcome, InputOutcome::Ignored));
        assert!(conversation.sessions().is_empty());
    }

    #[test]
    fn test_purge_keeps_fresh_sessions() {
        let registry = SessionRegistry::new(Duration::seconds(300));
        let stale = PendingInputSession::new("old", CONFIDENTIAL_TRANSFER, AwaitedField::Recipient);
        let now = stale.created_at + Duration::seconds(301);
        let mut fresh =
            PendingInputSession::new("new", CONFIDENTIAL_TRANSFER, AwaitedField::Recipient);
        fresh.created_at = now;
        registry.open(stale);
        registry.open(fresh);

        let purged = registry.purge_expired(now);

        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].user_id, "old");
        assert!(registry.get("new").is_some());
    }

    #[test]
    fn test_retrigger_replaces_session() {
        let dir = tempdir().unwrap();
        let conversation = conversation(dir.path());
        let notifier = RecordingNotifier::new();
        let first = conversation.begin("u1", &notifier);
        let second = conversation.begin("u1", &notifier);

        assert_eq!(conversation.sessions().len(), 1);
        assert!(conversation.sessions().get("u1").unwrap().created_at >= first.created_at);
        assert_eq!(conversation.sessions().get("u1"), Some(second));
    }

    #[test]
    fn test_accepted_recipient_closes_session_even_on_failure() {
        let dir = tempdir().unwrap();
        let conversation = conversation(dir.path());
        let notifier = RecordingNotifier::new();
        conversation.begin("u1", &notifier);

        // no wallet for u1: the run fails before any step
        let result = conversation.handle_text("u1", &format!("  {}  ", VALID), &notifier);

        assert!(matches!(result, Err(Error::NoWallet)));
        assert!(conversation.sessions().is_empty());
    }
}
