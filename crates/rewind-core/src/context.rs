//! Call context shared by snapshot operations
//!
//! Bundles what every operation needs besides the record and the repository:
//! where notifications go, what time it is, and whether capturing is
//! currently suspended.
//!
//! The suspend flag lives here rather than in process-wide state. A context
//! is `!Sync`, so one context cannot be toggled from two threads at once;
//! each thread or unit of work builds its own.

use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::events::{EventSink, RewindEvent, TracingSink};
use crate::record::Rewindable;

/// Source of capture timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to; clones share the same time
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.time() = at;
    }

    pub fn advance(&self, by: Duration) {
        *self.time() += by;
    }

    fn time(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time()
    }
}

/// Whether captures made through a context are written
///
/// Enabled by default.
#[derive(Debug)]
pub struct CaptureGate {
    enabled: Cell<bool>,
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self {
            enabled: Cell::new(true),
        }
    }
}

impl CaptureGate {
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Run `f` with capturing disabled
    ///
    /// The gate is re-enabled when `f` finishes, returns an error or panics.
    /// A nested call re-enables it on exit too, so the remainder of an outer
    /// block runs with capturing on.
    pub fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        self.enabled.set(false);
        let _reenable = Reenable(&self.enabled);
        f()
    }
}

struct Reenable<'a>(&'a Cell<bool>);

impl Drop for Reenable<'_> {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

/// Sink, clock and capture gate for a unit of work
pub struct RewindContext {
    sink: Box<dyn EventSink>,
    clock: Box<dyn Clock>,
    gate: CaptureGate,
}

impl Default for RewindContext {
    fn default() -> Self {
        Self {
            sink: Box::new(TracingSink),
            clock: Box::new(SystemClock),
            gate: CaptureGate::default(),
        }
    }
}

impl RewindContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn publish(&self, event: RewindEvent) {
        self.sink.publish(&event);
    }

    pub fn gate(&self) -> &CaptureGate {
        &self.gate
    }

    pub fn capturing_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Run `f` without writing any snapshot through this context
    ///
    /// Applies to every record handled with this context while `f` runs, not
    /// just one. Errors and panics from `f` propagate unchanged.
    pub fn without_creating_snapshots<T>(&self, f: impl FnOnce() -> T) -> T {
        self.gate.suspend(f)
    }

    /// Announce that a snapshot was applied onto a live record
    pub fn notify_restored<R: Rewindable>(&self, record: &R) {
        self.publish(RewindEvent::RecordRestored {
            owner: record.owner_key(),
        });
    }
}

impl std::fmt::Debug for RewindContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewindContext")
            .field("capturing_enabled", &self.capturing_enabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_gate_restored_after_block() {
        let ctx = RewindContext::new();
        let seen = ctx.without_creating_snapshots(|| ctx.capturing_enabled());
        assert!(!seen);
        assert!(ctx.capturing_enabled());
    }

    #[test]
    fn test_gate_restored_after_error() {
        let ctx = RewindContext::new();
        let result: Result<(), &str> = ctx.without_creating_snapshots(|| Err("boom"));
        assert_eq!(result, Err("boom"));
        assert!(ctx.capturing_enabled());
    }

    #[test]
    fn test_gate_restored_after_panic() {
        let ctx = RewindContext::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.without_creating_snapshots(|| panic!("inside suspended block"))
        }));
        assert!(outcome.is_err());
        assert!(ctx.capturing_enabled());
    }

    #[test]
    fn test_nested_suspend_reenables_on_inner_exit() {
        let gate = CaptureGate::default();
        let after_inner = gate.suspend(|| {
            gate.suspend(|| assert!(!gate.is_enabled()));
            gate.is_enabled()
        });
        assert!(after_inner);
        assert!(gate.is_enabled());
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let handle = clock.clone();
        handle.advance(Duration::days(2));
        assert_eq!(clock.now(), start + Duration::days(2));
        handle.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_manual_clock_keeps_time_after_poisoned_lock() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();
        let _ = std::thread::spawn(move || {
            let _held = shared.now.lock().unwrap();
            panic!("clock holder panicked");
        })
        .join();

        assert!(clock.now.is_poisoned());
        assert_eq!(clock.now(), start);
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start + Duration::hours(3));
    }
}
