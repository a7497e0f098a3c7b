//! Lifecycle scheduler - one-shot cancellable timers
//!
//! Two kinds of deferred action exist: request expiry and the delay between
//! acceptance and the teleport. Both fire once after a delay and can be
//! cancelled before firing.
//!
//! The scheduler does not read the clock. Callers pass `now` when arming
//! and when polling, which keeps the whole lifecycle deterministic in tests
//! and lets the host drive it from whatever loop it already has.
//!
//! # Handles
//!
//! Each arm returns a fresh `TimerId`. Expiry timers are also indexed by the
//! `RequestId` they belong to, so the store can revoke a request's timer
//! without holding the handle itself. A timer is released exactly once:
//! either `poll_due` hands it out, or `cancel` drops it. Cancelled entries
//! stay in the heap until their deadline and are skipped when popped.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::constants::MAX_TIMER_DELAY;
use super::types::{ActorId, PendingRequest, RequestId};

// =============================================================================
// TIMER TYPES
// =============================================================================

/// Handle to an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What to do when a timer fires
#[derive(Debug, Clone, PartialEq)]
pub enum TimerKind {
    /// Expire this exact request if it is still pending
    Expiry(PendingRequest),
    /// Teleport `requester` to `target` if both are still reachable
    TeleportDelay { requester: ActorId, target: ActorId },
}

/// A timer released by `poll_due`
#[derive(Debug, Clone, PartialEq)]
pub struct FiredTimer {
    pub id: TimerId,
    pub kind: TimerKind,
}

/// Heap entry; ordering is by deadline, then by arm order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
    at: Instant,
    id: TimerId,
}

// =============================================================================
// LIFECYCLE SCHEDULER
// =============================================================================

pub struct LifecycleScheduler {
    queue: BinaryHeap<Reverse<Deadline>>,
    armed: HashMap<TimerId, TimerKind>,
    /// Cancel tokens for expiry timers, keyed by request generation
    expiry_by_request: HashMap<RequestId, TimerId>,
    next_id: u64,
}

impl LifecycleScheduler {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            armed: HashMap::new(),
            expiry_by_request: HashMap::new(),
            next_id: 1,
        }
    }

    // =========================================================================
    // Arming
    // =========================================================================

    /// Arm the expiry timer of a freshly created request.
    ///
    /// A request has at most one expiry timer; arming again replaces the
    /// previous one.
    pub fn arm_expiry(&mut self, request: &PendingRequest, delay: Duration, now: Instant) -> TimerId {
        self.cancel_expiry(request.id);
        let id = self.arm(TimerKind::Expiry(request.clone()), deadline_after(now, delay));
        self.expiry_by_request.insert(request.id, id);
        debug!(
            request = %request.id,
            timer = id.0,
            delay_ms = delay.as_millis() as u64,
            "[scheduler] Expiry armed"
        );
        id
    }

    /// Arm the post-acceptance teleport delay for a pair of actors
    pub fn arm_teleport(
        &mut self,
        requester: ActorId,
        target: ActorId,
        delay: Duration,
        now: Instant,
    ) -> TimerId {
        let id = self.arm(
            TimerKind::TeleportDelay { requester, target },
            deadline_after(now, delay),
        );
        debug!(
            %requester,
            %target,
            timer = id.0,
            delay_ms = delay.as_millis() as u64,
            "[scheduler] Teleport delay armed"
        );
        id
    }

    fn arm(&mut self, kind: TimerKind, at: Instant) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.armed.insert(id, kind);
        self.queue.push(Reverse(Deadline { at, id }));
        id
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Cancel a timer.
    ///
    /// Returns false if the timer already fired or was already cancelled;
    /// calling it again is harmless.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.armed.remove(&id) {
            Some(TimerKind::Expiry(request)) => {
                self.expiry_by_request.remove(&request.id);
                trace!(timer = id.0, request = %request.id, "[scheduler] Expiry cancelled");
                true
            }
            Some(TimerKind::TeleportDelay { .. }) => {
                trace!(timer = id.0, "[scheduler] Teleport delay cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel the expiry timer belonging to a request, if one is armed
    pub fn cancel_expiry(&mut self, request: RequestId) -> bool {
        match self.expiry_by_request.remove(&request) {
            Some(id) => self.armed.remove(&id).is_some(),
            None => false,
        }
    }

    /// Release every outstanding timer. Returns how many were armed.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.armed.len();
        self.armed.clear();
        self.expiry_by_request.clear();
        self.queue.clear();
        if count > 0 {
            debug!(count, "[scheduler] All timers cancelled");
        }
        count
    }

    // =========================================================================
    // Firing
    // =========================================================================

    /// Release every timer whose deadline is at or before `now`.
    ///
    /// Timers come out in deadline order; timers with the same deadline come
    /// out in the order they were armed.
    pub fn poll_due(&mut self, now: Instant) -> Vec<FiredTimer> {
        let mut fired = Vec::new();

        while let Some(Reverse(next)) = self.queue.peek().copied() {
            if next.at > now {
                break;
            }
            self.queue.pop();

            // Cancelled entries are skipped here
            let Some(kind) = self.armed.remove(&next.id) else {
                continue;
            };
            if let TimerKind::Expiry(request) = &kind {
                self.expiry_by_request.remove(&request.id);
            }
            fired.push(FiredTimer { id: next.id, kind });
        }

        fired
    }

    /// Earliest deadline among armed timers
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse(next)) = self.queue.peek().copied() {
            if self.armed.contains_key(&next.id) {
                return Some(next.at);
            }
            self.queue.pop();
        }
        None
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.contains_key(&id)
    }

    /// Whether the request still has a live expiry timer
    pub fn has_expiry(&self, request: RequestId) -> bool {
        self.expiry_by_request.contains_key(&request)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

/// `now + delay`, with the delay clamped so the addition cannot overflow
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    if delay > MAX_TIMER_DELAY {
        warn!(
            delay_secs = delay.as_secs(),
            max_secs = MAX_TIMER_DELAY.as_secs(),
            "[scheduler] Delay too long, clamping"
        );
    }
    now.checked_add(delay.min(MAX_TIMER_DELAY)).unwrap_or(now)
}

impl Default for LifecycleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn actor(n: u128) -> ActorId {
        ActorId::new(Uuid::from_u128(n))
    }

    fn request(id: u64) -> PendingRequest {
        PendingRequest {
            id: RequestId::new(id),
            requester_id: actor(1),
            requester_name: "Alice".to_string(),
            target_id: actor(2),
            target_name: "Bob".to_string(),
        }
    }

    #[test]
    fn test_timer_fires_once_after_delay() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let id = scheduler.arm_expiry(&request(1), Duration::from_secs(60), start);

        assert!(scheduler.poll_due(start + Duration::from_secs(59)).is_empty());
        assert!(scheduler.is_armed(id));

        let fired = scheduler.poll_due(start + Duration::from_secs(60));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);
        assert!(matches!(&fired[0].kind, TimerKind::Expiry(r) if r.id == RequestId::new(1)));

        // Released: no second fire, handle gone
        assert!(scheduler.poll_due(start + Duration::from_secs(120)).is_empty());
        assert!(!scheduler.is_armed(id));
        assert!(!scheduler.has_expiry(RequestId::new(1)));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let id = scheduler.arm_teleport(actor(1), actor(2), Duration::from_secs(5), start);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(scheduler.poll_due(start + Duration::from_secs(10)).is_empty());
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let id = scheduler.arm_expiry(&request(3), Duration::from_secs(1), start);

        assert_eq!(scheduler.poll_due(start + Duration::from_secs(1)).len(), 1);
        assert!(!scheduler.cancel(id));
        assert!(!scheduler.cancel_expiry(RequestId::new(3)));
    }

    #[test]
    fn test_cancel_expiry_by_request() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let id = scheduler.arm_expiry(&request(4), Duration::from_secs(1), start);

        assert!(scheduler.has_expiry(RequestId::new(4)));
        assert!(scheduler.cancel_expiry(RequestId::new(4)));
        assert!(!scheduler.is_armed(id));
        assert!(!scheduler.cancel_expiry(RequestId::new(4)));
    }

    #[test]
    fn test_rearming_expiry_replaces_previous_timer() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let first = scheduler.arm_expiry(&request(5), Duration::from_secs(1), start);
        let second = scheduler.arm_expiry(&request(5), Duration::from_secs(10), start);

        assert!(!scheduler.is_armed(first));
        assert!(scheduler.is_armed(second));
        assert!(scheduler.poll_due(start + Duration::from_secs(5)).is_empty());
        assert_eq!(scheduler.poll_due(start + Duration::from_secs(10)).len(), 1);
    }

    #[test]
    fn test_fire_order_by_deadline_then_arm_order() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let late = scheduler.arm_teleport(actor(1), actor(2), Duration::from_secs(3), start);
        let early_a = scheduler.arm_teleport(actor(3), actor(4), Duration::from_secs(1), start);
        let early_b = scheduler.arm_teleport(actor(5), actor(6), Duration::from_secs(1), start);

        let fired: Vec<_> = scheduler
            .poll_due(start + Duration::from_secs(3))
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(fired, vec![early_a, early_b, late]);
    }

    #[test]
    fn test_next_deadline_skips_cancelled() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let first = scheduler.arm_teleport(actor(1), actor(2), Duration::from_secs(1), start);
        scheduler.arm_teleport(actor(1), actor(2), Duration::from_secs(4), start);

        assert_eq!(scheduler.next_deadline(), Some(start + Duration::from_secs(1)));
        scheduler.cancel(first);
        assert_eq!(scheduler.next_deadline(), Some(start + Duration::from_secs(4)));
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        scheduler.arm_expiry(&request(1), Duration::from_secs(1), start);
        scheduler.arm_teleport(actor(1), actor(2), Duration::from_secs(1), start);

        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.armed_count(), 0);
        assert!(scheduler.next_deadline().is_none());
        assert!(scheduler.poll_due(start + Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn test_huge_delay_is_clamped() {
        let mut scheduler = LifecycleScheduler::new();
        let start = Instant::now();
        let expiry = scheduler.arm_expiry(&request(1), Duration::MAX, start);
        let teleport = scheduler.arm_teleport(actor(1), actor(2), Duration::MAX, start);

        assert!(scheduler.is_armed(expiry));
        assert!(scheduler.is_armed(teleport));
        assert!(scheduler
            .poll_due(start + Duration::from_secs(86_400))
            .is_empty());
        assert_eq!(scheduler.next_deadline(), Some(start + MAX_TIMER_DELAY));
    }
}
