//! Real-time events emitted by the workflow on every successful mutation.
//!
//! The workflow only knows the [`Publisher`] seam. Transports (a websocket
//! fan-out, a log sink) live behind it and are injected at construction.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{CallSession, Checklist, Worker};

/// A structured event as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrlEvent {
    /// Monotonic per-publisher sequence number. Consumers can detect gaps.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    CallInitiated {
        call: CallSession,
        worker: Worker,
    },
    CallUpdated {
        call: CallSession,
        worker: Worker,
    },
    ChecklistCompleted {
        checklist: Checklist,
        worker: Worker,
    },
}

impl EventKind {
    /// Channel name the dashboard subscribes to.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CallInitiated { .. } => "prl:call:initiated",
            EventKind::CallUpdated { .. } => "prl:call:updated",
            EventKind::ChecklistCompleted { .. } => "prl:checklist:completed",
        }
    }
}

/// Sink for workflow events.
///
/// Called after the owning mutation has committed. Implementations must not
/// block and must not fail the mutation: delivery is best effort.
pub trait Publisher: Send + Sync {
    fn publish(&self, kind: EventKind);
}

/// In-process fan-out over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; they see the gap through
/// [`PrlEvent::seq`].
pub struct BroadcastPublisher {
    tx: broadcast::Sender<PrlEvent>,
    seq: AtomicU64,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrlEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, kind: EventKind) {
        let event = PrlEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            kind,
        };
        let name = event.kind.name();
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "event published"),
            // No subscribers right now; nothing to deliver.
            Err(_) => tracing::debug!(event = name, "event dropped, no subscribers"),
        }
    }
}
