//! Rewind Core - versioned record snapshots with retention
//!
//! This crate provides the snapshot lifecycle and retention engine:
//! - Retention policies and their canonical limits
//! - The in-window scope applied to every read and used by prune
//! - The `Rewindable` record contract and the owner registry
//! - The `SnapshotRepository` contract with an in-memory implementation
//! - The `Rewind` snapshot store and the lifecycle hooks
//! - Fire-and-forget notifications and the suspendable capture gate
//!
//! Persistence beyond memory lives in `rewind-store`.

pub mod context;
pub mod errors;
pub mod events;
pub mod hooks;
pub mod limits;
pub mod logging_facility;
pub mod memory;
pub mod record;
pub mod repository;
pub mod rewind;
pub mod scope;
pub mod snapshot;

// Re-export commonly used types
pub use context::{CaptureGate, Clock, ManualClock, RewindContext, SystemClock};
pub use errors::{ExError, ExErrorKind, Result, RewindError};
pub use events::{EventSink, FanoutSink, NullSink, RecordingSink, RewindEvent, TracingSink};
pub use hooks::{on_created, on_updated};
pub use limits::{RetentionLimits, RetentionPolicy};
pub use memory::MemoryRepository;
pub use record::{DynRecord, OwnerRegistry, RawAttributes, Rewindable};
pub use repository::{DeleteScope, SnapshotRepository};
pub use rewind::Rewind;
pub use rewind_core_types::OwnerKey;
pub use scope::{Direction, SnapshotFilter, SnapshotQuery};
pub use snapshot::{AttributeMap, NewSnapshot, Only, Snapshot};
