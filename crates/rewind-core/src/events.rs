//! Notification channel
//!
//! The snapshot store announces every state change to an `EventSink`.
//! Publishing is fire-and-forget: a sink cannot fail an operation, and
//! whether it delivers synchronously is its own business.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rewind_core_types::OwnerKey;

use crate::snapshot::Snapshot;

/// Lifecycle notifications
#[derive(Debug, Clone, PartialEq)]
pub enum RewindEvent {
    SnapshotCreated { owner: OwnerKey, snapshot: Snapshot },
    SnapshotRetrieved { owner: OwnerKey, snapshot: Snapshot },
    SnapshotDeleted { owner: OwnerKey, snapshot_id: i64 },
    SnapshotsCleared { owner: OwnerKey, includes_kept: bool },
    SnapshotsPruned { owner: OwnerKey, includes_kept: bool },
    /// Published by callers after applying a snapshot to a live record; the
    /// store itself never emits it
    RecordRestored { owner: OwnerKey },
}

impl RewindEvent {
    /// Stable name, used as the log message field
    pub fn name(&self) -> &'static str {
        match self {
            RewindEvent::SnapshotCreated { .. } => "snapshot_created",
            RewindEvent::SnapshotRetrieved { .. } => "snapshot_retrieved",
            RewindEvent::SnapshotDeleted { .. } => "snapshot_deleted",
            RewindEvent::SnapshotsCleared { .. } => "snapshots_cleared",
            RewindEvent::SnapshotsPruned { .. } => "snapshots_pruned",
            RewindEvent::RecordRestored { .. } => "record_restored",
        }
    }

    pub fn owner(&self) -> &OwnerKey {
        match self {
            RewindEvent::SnapshotCreated { owner, .. }
            | RewindEvent::SnapshotRetrieved { owner, .. }
            | RewindEvent::SnapshotDeleted { owner, .. }
            | RewindEvent::SnapshotsCleared { owner, .. }
            | RewindEvent::SnapshotsPruned { owner, .. }
            | RewindEvent::RecordRestored { owner } => owner,
        }
    }

    /// Snapshot id the event is about, if it concerns a single row
    pub fn snapshot_id(&self) -> Option<i64> {
        match self {
            RewindEvent::SnapshotCreated { snapshot, .. }
            | RewindEvent::SnapshotRetrieved { snapshot, .. } => Some(snapshot.id),
            RewindEvent::SnapshotDeleted { snapshot_id, .. } => Some(*snapshot_id),
            _ => None,
        }
    }
}

/// Subscriber for lifecycle notifications
pub trait EventSink {
    fn publish(&self, event: &RewindEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, event: &RewindEvent) {
        (**self).publish(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &RewindEvent) {}
}

/// Emits each event as one structured `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &RewindEvent) {
        let owner = event.owner();
        tracing::debug!(
            notification = event.name(),
            owner_type = owner.owner_type(),
            owner_id = owner.owner_id(),
            snapshot_id = event.snapshot_id(),
            "rewind notification"
        );
    }
}

/// Keeps every published event; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<RewindEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RewindEvent> {
        self.buffer().clone()
    }

    /// Names of the recorded events, in publish order
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(RewindEvent::name).collect()
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<RewindEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &RewindEvent) {
        self.buffer().push(event.clone());
    }
}

/// Forwards each event to several sinks, in registration order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanoutSink {
    fn publish(&self, event: &RewindEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted(id: i64) -> RewindEvent {
        RewindEvent::SnapshotDeleted {
            owner: OwnerKey::new("article", "1"),
            snapshot_id: id,
        }
    }

    #[test]
    fn test_recording_sink_clones_share_buffer() {
        let sink = RecordingSink::new();
        let handle = sink.clone();
        sink.publish(&deleted(4));

        assert_eq!(handle.events(), vec![deleted(4)]);
        handle.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_recording_sink_keeps_events_after_poisoned_lock() {
        let sink = RecordingSink::new();
        sink.publish(&deleted(1));
        let shared = sink.clone();
        let _ = std::thread::spawn(move || {
            let _held = shared.events.lock().unwrap();
            panic!("sink holder panicked");
        })
        .join();

        sink.publish(&deleted(2));
        assert_eq!(sink.events(), vec![deleted(1), deleted(2)]);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = RecordingSink::new();
        let b = RecordingSink::new();
        let fanout = FanoutSink::new().with(a.clone()).with(NullSink).with(b.clone());

        fanout.publish(&deleted(1));

        assert_eq!(a.names(), vec!["snapshot_deleted"]);
        assert_eq!(b.names(), vec!["snapshot_deleted"]);
    }

    #[test]
    fn test_event_accessors() {
        let event = RewindEvent::SnapshotsPruned {
            owner: OwnerKey::new("article", "9"),
            includes_kept: true,
        };
        assert_eq!(event.name(), "snapshots_pruned");
        assert_eq!(event.owner().owner_id(), "9");
        assert_eq!(event.snapshot_id(), None);
        assert_eq!(deleted(3).snapshot_id(), Some(3));
    }
}
