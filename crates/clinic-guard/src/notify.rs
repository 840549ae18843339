//! Lockout notifications.
//!
//! The guard never talks to a mail server. It hands a [`Notification`] to a
//! [`Mailer`]; [`OutboxMailer`] queues them for a delivery worker.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NoticeConfig;
use crate::error::{GuardError, GuardResult};

/// An email to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Sender display name.
    pub sender: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

impl Notification {
    /// Build the lockout notice for `to` from configured text.
    #[must_use]
    pub fn lockout(notice: &NoticeConfig, to: impl Into<String>) -> Self {
        Self {
            sender: notice.sender.clone(),
            to: to.into(),
            subject: notice.subject.clone(),
            body: notice.body.clone(),
        }
    }
}

/// Accepts notifications for delivery.
pub trait Mailer: Send + Sync {
    /// Hand off one notification.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Notification`] if the notification cannot be
    /// accepted.
    fn send(&self, notification: Notification) -> GuardResult<()>;
}

/// Mailer that queues notifications in memory.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    queue: Mutex<VecDeque<Notification>>,
    capacity: Option<usize>,
}

impl OutboxMailer {
    /// Create an unbounded outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an outbox that refuses notifications once `capacity` are queued.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: Some(capacity),
        }
    }

    /// Remove and return every queued notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.queue.lock().drain(..).collect()
    }

    /// Number of queued notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the outbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, notification: Notification) -> GuardResult<()> {
        let mut queue = self.queue.lock();
        if self.capacity.is_some_and(|cap| queue.len() >= cap) {
            return Err(GuardError::Notification {
                to: notification.to,
                reason: "outbox full".into(),
            });
        }
        debug!(to = %notification.to, queued = queue.len() + 1, "notification queued");
        queue.push_back(notification);
        Ok(())
    }
}

/// Mailer that accepts and drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMailer;

impl Mailer for NoopMailer {
    fn send(&self, _notification: Notification) -> GuardResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(to: &str) -> Notification {
        Notification::lockout(&NoticeConfig::default(), to)
    }

    #[test]
    fn test_lockout_notice_text() {
        let n = notice("alice@example.org");
        assert_eq!(n.sender, "iTrust2 System");
        assert_eq!(n.to, "alice@example.org");
        assert_eq!(n.subject, "iTrust2: Your account has been locked out");
        assert!(n.body.contains("too many failed log in attempts"));
    }

    #[test]
    fn test_outbox_drain_in_order() {
        let outbox = OutboxMailer::new();
        outbox.send(notice("a@example.org")).unwrap();
        outbox.send(notice("b@example.org")).unwrap();
        assert_eq!(outbox.len(), 2);

        let sent: Vec<String> = outbox.drain().into_iter().map(|n| n.to).collect();
        assert_eq!(sent, vec!["a@example.org", "b@example.org"]);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_bounded_outbox_refuses_when_full() {
        let outbox = OutboxMailer::bounded(1);
        outbox.send(notice("a@example.org")).unwrap();

        let err = outbox.send(notice("b@example.org")).unwrap_err();
        assert!(matches!(err, GuardError::Notification { ref to, .. } if to == "b@example.org"));
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_noop_mailer() {
        assert!(NoopMailer.send(notice("a@example.org")).is_ok());
    }
}
