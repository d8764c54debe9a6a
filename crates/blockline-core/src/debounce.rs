#![forbid(unsafe_code)]

//! Debouncing of host change notifications.
//!
//! Dragging a block or importing a workspace makes the host emit a storm of
//! change events. Rebuilding the linear view for each one would saturate the
//! UI thread, so [`ChangeDebouncer`] collapses every burst into a single
//! render that uses the *last* event of the burst.
//!
//! # Design
//!
//! Each [`notify`](ChangeDebouncer::notify) records the event as the single
//! pending event, bumps a monotonically increasing generation, and returns a
//! [`ScheduledRender`] the caller hands to its timer. When a timer fires, the
//! callback passes its generation to [`fire`](ChangeDebouncer::fire):
//!
//! - generation is the latest issued: the pending event is returned once;
//! - anything else is stale and is a silent no-op.
//!
//! There is no explicit timer cancellation; superseded callbacks still fire
//! and find themselves stale. Hosts driven by a polling loop can call
//! [`poll`](ChangeDebouncer::poll) instead of keeping timers.
//!
//! # Usage
//!
//! ```
//! use blockline_core::debounce::ChangeDebouncer;
//! use blockline_core::event::ChangeEvent;
//! use blockline_core::ast::BlockId;
//! use web_time::{Duration, Instant};
//!
//! let mut debouncer = ChangeDebouncer::new(Duration::from_millis(100));
//! let now = Instant::now();
//!
//! let first = debouncer.notify(ChangeEvent::BlockMove { block: BlockId(1) }, now);
//! let last = debouncer.notify(ChangeEvent::BlockMove { block: BlockId(2) }, now);
//!
//! // The superseded callback fires and does nothing.
//! assert!(debouncer.fire(first.generation).is_none());
//! // The latest callback gets the last event of the burst.
//! assert_eq!(
//!     debouncer.fire(last.generation),
//!     Some(ChangeEvent::BlockMove { block: BlockId(2) })
//! );
//! ```

use crate::event::ChangeEvent;
use web_time::{Duration, Instant};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Handle returned by [`ChangeDebouncer::notify`] for the caller's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRender {
    /// Generation to pass back to [`ChangeDebouncer::fire`].
    pub generation: u64,
    /// When the render should run.
    pub due: Instant,
}

#[derive(Debug, Clone)]
struct Pending {
    generation: u64,
    event: ChangeEvent,
    due: Instant,
}

/// Coalesces bursts of change events into one render trigger.
///
/// # Thread Safety
///
/// Not thread-safe. It belongs to the single UI thread that renders.
#[derive(Debug, Clone)]
pub struct ChangeDebouncer {
    window: Duration,
    generation: u64,
    pending: Option<Pending>,
}

impl Default for ChangeDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

impl ChangeDebouncer {
    /// Create a debouncer with the given delay window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: 0,
            pending: None,
        }
    }

    /// The delay window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Latest generation issued (0 before the first notify).
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record `event` as the latest pending event and schedule a render.
    ///
    /// Any previously scheduled render becomes stale.
    pub fn notify(&mut self, event: ChangeEvent, now: Instant) -> ScheduledRender {
        self.generation = self.generation.wrapping_add(1);
        let due = now + self.window;
        #[cfg(feature = "tracing")]
        tracing::trace!(
            generation = self.generation,
            category = event.category().as_str(),
            superseded = self.pending.is_some(),
            "debounce.notify"
        );
        self.pending = Some(Pending {
            generation: self.generation,
            event,
            due,
        });
        ScheduledRender {
            generation: self.generation,
            due,
        }
    }

    /// Timer callback entry point.
    ///
    /// Returns the pending event if `generation` is the latest one issued and
    /// it has not fired yet. Stale or repeated fires return `None`.
    pub fn fire(&mut self, generation: u64) -> Option<ChangeEvent> {
        match &self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending.take().map(|pending| pending.event)
            }
            _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    generation,
                    latest = self.generation,
                    "debounce.stale_fire"
                );
                None
            }
        }
    }

    /// Loop-driven alternative to [`fire`](Self::fire): returns the pending
    /// event once its window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<ChangeEvent> {
        if self.pending.as_ref().is_some_and(|pending| now >= pending.due) {
            self.pending.take().map(|pending| pending.event)
        } else {
            None
        }
    }

    /// Take the pending event immediately, ignoring the window.
    pub fn flush(&mut self) -> Option<ChangeEvent> {
        self.pending.take().map(|pending| pending.event)
    }

    /// When the pending render is due, if any.
    #[must_use]
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    /// Whether a render is scheduled.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending event without rendering.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BlockId;

    fn moved(id: u32) -> ChangeEvent {
        ChangeEvent::BlockMove { block: BlockId(id) }
    }

    #[test]
    fn new_debouncer_has_nothing_pending() {
        let debouncer = ChangeDebouncer::default();
        assert!(!debouncer.has_pending());
        assert_eq!(debouncer.generation(), 0);
        assert_eq!(debouncer.window(), Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    }

    #[test]
    fn fire_delivers_latest_event_once() {
        let mut debouncer = ChangeDebouncer::default();
        let now = Instant::now();
        let ticket = debouncer.notify(moved(1), now);
        assert_eq!(debouncer.fire(ticket.generation), Some(moved(1)));
        assert_eq!(debouncer.fire(ticket.generation), None);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn superseded_ticket_is_stale() {
        let mut debouncer = ChangeDebouncer::default();
        let now = Instant::now();
        let stale = debouncer.notify(moved(1), now);
        let fresh = debouncer.notify(moved(2), now);
        assert!(fresh.generation > stale.generation);
        assert_eq!(debouncer.fire(stale.generation), None);
        assert!(debouncer.has_pending(), "stale fire must not consume");
        assert_eq!(debouncer.fire(fresh.generation), Some(moved(2)));
    }

    #[test]
    fn notify_reschedules_against_new_event() {
        let mut debouncer = ChangeDebouncer::new(Duration::from_millis(100));
        let start = Instant::now();
        let first = debouncer.notify(moved(1), start);
        let later = start + Duration::from_millis(60);
        let second = debouncer.notify(moved(2), later);
        assert_eq!(second.due, later + Duration::from_millis(100));
        assert!(second.due > first.due);
        assert_eq!(debouncer.poll(first.due), None);
        assert_eq!(debouncer.poll(second.due), Some(moved(2)));
    }

    #[test]
    fn poll_before_window_returns_nothing() {
        let mut debouncer = ChangeDebouncer::new(Duration::from_millis(100));
        let start = Instant::now();
        debouncer.notify(ChangeEvent::Ui, start);
        assert_eq!(debouncer.poll(start + Duration::from_millis(99)), None);
        assert!(debouncer.has_pending());
    }

    #[test]
    fn clear_and_flush() {
        let mut debouncer = ChangeDebouncer::default();
        let now = Instant::now();
        debouncer.notify(moved(3), now);
        assert_eq!(debouncer.flush(), Some(moved(3)));
        let ticket = debouncer.notify(moved(4), now);
        debouncer.clear();
        assert_eq!(debouncer.fire(ticket.generation), None);
        assert_eq!(debouncer.due(), None);
    }
}
