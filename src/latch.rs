/*
 * Getting a button press from interrupt context into a task.
 *
 * The interrupt side does one thing: it arms the latch. That is a single
 * critical section around a flag, never blocks and never touches the bus.
 * The task side takes the latch when it gets around to it, and only then
 * decides whether the edge counts.
 *
 * That decision is the debouncer's. A mechanical button makes and breaks
 * contact several times per press. The first edge is accepted and starts a
 * quiet window; any edge inside the window is dropped without effect. Because
 * this runs in the task, it is free to read the clock and keep state.
 */

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Instant};

/// Occurrence-only signal, set from interrupts and cleared by the task that takes it.
pub struct EventLatch {
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl EventLatch {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Arm the latch. Safe to call from interrupt context. Arming an armed
    /// latch is a no-op: edges are not counted.
    pub fn signal(&self) {
        self.signal.signal(());
    }

    /// Disarm the latch without waiting. Returns whether it was armed.
    pub fn try_take(&self) -> bool {
        self.signal.try_take().is_some()
    }

    /// Wait until the latch is armed, then disarm it.
    pub async fn wait(&self) {
        self.signal.wait().await
    }

    pub fn is_armed(&self) -> bool {
        self.signal.signaled()
    }
}

impl Default for EventLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    last_accepted: Option<Instant>,
    min_interval: Duration,
}

impl Debouncer {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_accepted: None,
            min_interval,
        }
    }

    /// Decide whether an edge seen at `now` is a new press. Rejected edges
    /// leave the state untouched, so the window is measured from the last
    /// accepted edge rather than the last bounce.
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            match now.checked_duration_since(last) {
                Some(elapsed) if elapsed >= self.min_interval => {}
                _ => return false,
            }
        }

        self.last_accepted = Some(now);
        true
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
