//! Audit trail for state changes.
//!
//! Services push [`AuditEvent`]s onto a bounded queue and carry on; a single
//! worker task drains the queue into the `audit_events` table. Delivery is
//! at-most-once: when the queue is full or the worker has stopped, the event
//! is dropped with a warning and the business operation still succeeds.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::db::{audit, ScheduleDb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Scan,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Scan => "scan",
        }
    }

    fn resource_type(&self) -> &'static str {
        match self {
            AuditAction::Scan => "presence",
            _ => "course",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub resource_type: &'static str,
    pub resource_id: Option<i64>,
    pub description: String,
}

impl AuditEvent {
    pub fn new(action: AuditAction, resource_id: i64, description: impl Into<String>) -> Self {
        Self {
            action,
            resource_type: action.resource_type(),
            resource_id: Some(resource_id),
            description: description.into(),
        }
    }
}

/// Sending half of the audit queue. Cheap to clone.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

impl AuditSink {
    /// Creates a queue holding at most `capacity` pending events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues `event` without waiting. Never fails the caller.
    pub fn record(&self, event: AuditEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(
                action = event.action.as_str(),
                resource_id = event.resource_id,
                "Audit queue full, dropping event"
            ),
            Err(TrySendError::Closed(event)) => warn!(
                action = event.action.as_str(),
                resource_id = event.resource_id,
                "Audit worker stopped, dropping event"
            ),
        }
    }
}

/// Spawns the task that writes queued events to storage.
///
/// The task ends once every [`AuditSink`] has been dropped and the queue is
/// drained.
pub fn spawn_audit_worker(
    db: Arc<ScheduleDb>,
    mut rx: mpsc::Receiver<AuditEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let written = db.read(|conn| {
                audit::insert(
                    conn,
                    event.action.as_str(),
                    event.resource_type,
                    event.resource_id,
                    &event.description,
                )
            });
            match written {
                Ok(id) => debug!(audit_id = id, action = event.action.as_str(), "Audit event stored"),
                Err(e) => error!(error = %e, action = event.action.as_str(), "Failed to store audit event"),
            }
        }
        debug!("Audit queue closed, worker exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let (sink, mut rx) = AuditSink::channel(1);
        sink.record(AuditEvent::new(AuditAction::Create, 1, "first"));
        sink.record(AuditEvent::new(AuditAction::Create, 2, "second"));

        assert_eq!(rx.try_recv().unwrap().resource_id, Some(1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_queue_is_ignored() {
        let (sink, rx) = AuditSink::channel(4);
        drop(rx);
        sink.record(AuditEvent::new(AuditAction::Delete, 7, "gone"));
    }

    #[tokio::test]
    async fn test_worker_persists_events() {
        let db = Arc::new(ScheduleDb::open_in_memory().unwrap());
        let (sink, rx) = AuditSink::channel(8);
        let worker = spawn_audit_worker(db.clone(), rx);

        sink.record(AuditEvent::new(AuditAction::Create, 3, "created course 'Algebra'"));
        sink.record(AuditEvent::new(AuditAction::Scan, 11, "student 4 scanned course 3"));
        drop(sink);
        worker.await.unwrap();

        let stored = db.read(|conn| audit::recent(conn, 10)).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].action, "scan");
        assert_eq!(stored[0].resource_type, "presence");
        assert_eq!(stored[1].resource_id, Some(3));
    }
}
