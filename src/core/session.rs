//! Teleport session - orchestrates the request store with its timers
//!
//! TpaSession glues RequestStore and LifecycleScheduler together and talks
//! to the host through the collaborator traits. Every handler mirrors one
//! trigger of the request lifecycle:
//!
//! 1. `send` - create a request (possibly replacing the previous one)
//! 2. `accept` / `deny` - the target resolves an incoming request
//! 3. `disconnect` - cancel everything the actor is part of
//! 4. `tick` - fire due expiry and teleport-delay timers
//!
//! Timer callbacks go through the same `RequestStore::remove` as user
//! actions, so a request is resolved at most once and the losers stay
//! silent.

use std::time::Instant;

use tracing::{debug, info};

use crate::core::messages::{
    MessageKey, PH_PLAYER, PH_REQUESTER, PH_REQUESTERS, PH_SECONDS, PH_TARGET,
};
use crate::core::scheduler::{LifecycleScheduler, TimerId, TimerKind};
use crate::core::store::{CreateResult, IncomingLookup, RequestStore};
use crate::core::traits::{ActorDirectory, Host};
use crate::core::types::{ActorId, PendingRequest, TimingSettings};

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of `TpaSession::send`
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// No reachable actor has this name
    TargetNotOnline(String),
    /// Requester and target are the same actor
    SelfRequest,
    /// A request to this target is already pending
    AlreadyRequested(PendingRequest),
    /// The request is pending and its expiry timer armed
    Sent {
        request: PendingRequest,
        replaced: Option<PendingRequest>,
    },
}

/// Why an accept/deny did not resolve to a request
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveFailure {
    NoPending,
    Ambiguous(Vec<String>),
    NotFound(String),
    /// Found, but someone else resolved it first
    NoLongerAvailable,
}

/// Result of `TpaSession::accept`
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    Unresolved(ResolveFailure),
    /// Request consumed, but the requester is gone; no teleport scheduled
    RequesterOffline(PendingRequest),
    Accepted {
        request: PendingRequest,
        teleport_timer: TimerId,
    },
}

/// Result of `TpaSession::deny`
#[derive(Debug, Clone, PartialEq)]
pub enum DenyOutcome {
    Unresolved(ResolveFailure),
    Denied(PendingRequest),
}

/// Requests cancelled because an actor disconnected
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisconnectOutcome {
    pub outgoing: Option<PendingRequest>,
    pub incoming: Vec<PendingRequest>,
}

impl DisconnectOutcome {
    pub fn canceled_count(&self) -> usize {
        self.incoming.len() + usize::from(self.outgoing.is_some())
    }
}

/// Transitions caused by timers during `tick`
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    Expired(PendingRequest),
    Teleported { requester: ActorId, target: ActorId },
    TeleportCanceled { requester: ActorId, target: ActorId },
}

// =============================================================================
// TPA SESSION
// =============================================================================

/// Owns all pending requests and their timers.
///
/// Constructed explicitly on enable and torn down with `shutdown` on
/// disable; nothing survives a restart.
pub struct TpaSession {
    store: RequestStore,
    scheduler: LifecycleScheduler,
    timings: TimingSettings,
}

impl TpaSession {
    pub fn new(timings: TimingSettings) -> Self {
        Self {
            store: RequestStore::new(),
            scheduler: LifecycleScheduler::new(),
            timings,
        }
    }

    pub fn timings(&self) -> TimingSettings {
        self.timings
    }

    /// Replace the timing settings. Already-armed timers keep their deadline.
    pub fn set_timings(&mut self, timings: TimingSettings) {
        self.timings = timings;
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    pub fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    /// Earliest instant at which `tick` has something to do
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Pending requester names for completion of accept/deny arguments
    pub fn incoming_requester_names(&self, target: ActorId, prefix: &str) -> Vec<String> {
        self.store.incoming_requester_names(target, prefix)
    }

    // =========================================================================
    // Send
    // =========================================================================

    pub fn send<H: Host>(
        &mut self,
        host: &H,
        requester: ActorId,
        target_name: &str,
        now: Instant,
    ) -> SendOutcome {
        let target = match host
            .resolve_by_name(target_name)
            .filter(|&id| host.is_reachable(id))
        {
            Some(target) => target,
            None => {
                host.notify(
                    requester,
                    MessageKey::PlayerNotOnline,
                    vec![(PH_PLAYER, target_name.to_string())],
                );
                return SendOutcome::TargetNotOnline(target_name.to_string());
            }
        };

        if target == requester {
            host.notify(requester, MessageKey::CannotTeleportSelf, Vec::new());
            return SendOutcome::SelfRequest;
        }

        let requester_name = display_name(host, requester, &requester.to_string());
        let target_name = display_name(host, target, target_name);

        let (request, replaced) = match self.store.try_create(
            requester,
            &requester_name,
            target,
            &target_name,
            &mut self.scheduler,
        ) {
            CreateResult::AlreadyRequested(existing) => {
                host.notify(
                    requester,
                    MessageKey::AlreadyRequested,
                    vec![(PH_TARGET, target_name)],
                );
                return SendOutcome::AlreadyRequested(existing);
            }
            CreateResult::Replaced { previous, created } => {
                host.notify(
                    requester,
                    MessageKey::PreviousRequestReplaced,
                    vec![(PH_TARGET, previous.target_name.clone())],
                );
                host.notify(
                    previous.target_id,
                    MessageKey::PreviousRequestCanceledNotify,
                    vec![(PH_REQUESTER, requester_name.clone())],
                );
                info!(
                    request = %previous.id,
                    requester = %previous.requester_name,
                    target = %previous.target_name,
                    "[session] Request superseded"
                );
                (created, Some(previous))
            }
            CreateResult::Created(created) => (created, None),
        };

        self.scheduler
            .arm_expiry(&request, self.timings.auto_reject, now);

        host.notify(
            requester,
            MessageKey::RequestSent,
            vec![
                (PH_TARGET, target_name),
                (PH_SECONDS, self.timings.auto_reject.as_secs().to_string()),
            ],
        );
        host.notify(
            target,
            MessageKey::RequestReceived,
            vec![(PH_REQUESTER, requester_name.clone())],
        );
        host.notify(
            target,
            MessageKey::RequestReceivedInstruction,
            vec![(PH_REQUESTER, requester_name)],
        );

        info!(
            request = %request.id,
            requester = %request.requester_name,
            target = %request.target_name,
            "[session] Request sent"
        );
        SendOutcome::Sent { request, replaced }
    }

    // =========================================================================
    // Accept / Deny
    // =========================================================================

    pub fn accept<H: Host>(
        &mut self,
        host: &H,
        target: ActorId,
        requester_name: Option<&str>,
        now: Instant,
    ) -> AcceptOutcome {
        let request = match self.resolve_incoming(host, target, requester_name) {
            Ok(request) => request,
            Err(failure) => return AcceptOutcome::Unresolved(failure),
        };

        if !host.is_reachable(request.requester_id) {
            host.notify(
                target,
                MessageKey::RequesterOffline,
                vec![(PH_REQUESTER, request.requester_name.clone())],
            );
            info!(request = %request.id, "[session] Accepted, but requester is offline");
            return AcceptOutcome::RequesterOffline(request);
        }

        let requester_name = display_name(host, request.requester_id, &request.requester_name);
        let target_name = display_name(host, target, &request.target_name);
        let seconds = self.timings.teleport_wait.as_secs().to_string();

        // The target may go offline during the wait; that is checked when
        // the timer fires, not here.
        let teleport_timer = self.scheduler.arm_teleport(
            request.requester_id,
            request.target_id,
            self.timings.teleport_wait,
            now,
        );

        host.notify(
            target,
            MessageKey::RequestAcceptedTarget,
            vec![(PH_REQUESTER, requester_name), (PH_SECONDS, seconds.clone())],
        );
        host.notify(
            request.requester_id,
            MessageKey::RequestAcceptedRequester,
            vec![(PH_TARGET, target_name), (PH_SECONDS, seconds)],
        );

        info!(request = %request.id, "[session] Request accepted");
        AcceptOutcome::Accepted {
            request,
            teleport_timer,
        }
    }

    pub fn deny<H: Host>(
        &mut self,
        host: &H,
        target: ActorId,
        requester_name: Option<&str>,
    ) -> DenyOutcome {
        let request = match self.resolve_incoming(host, target, requester_name) {
            Ok(request) => request,
            Err(failure) => return DenyOutcome::Unresolved(failure),
        };

        host.notify(
            target,
            MessageKey::RequestDeniedTarget,
            vec![(PH_REQUESTER, request.requester_name.clone())],
        );
        host.notify(
            request.requester_id,
            MessageKey::RequestDeniedRequester,
            vec![(
                PH_TARGET,
                display_name(host, target, &request.target_name),
            )],
        );

        info!(request = %request.id, "[session] Request denied");
        DenyOutcome::Denied(request)
    }

    /// Find the request the target means and take it out of the store.
    ///
    /// Failures are reported to the target.
    fn resolve_incoming<H: Host>(
        &mut self,
        host: &H,
        target: ActorId,
        requester_name: Option<&str>,
    ) -> Result<PendingRequest, ResolveFailure> {
        let request = match self.store.find_incoming(target, requester_name) {
            IncomingLookup::Found(request) => request,
            IncomingLookup::NoPending => {
                host.notify(target, MessageKey::NoPendingRequests, Vec::new());
                return Err(ResolveFailure::NoPending);
            }
            IncomingLookup::Ambiguous(names) => {
                host.notify(
                    target,
                    MessageKey::MultipleRequestsFound,
                    vec![(PH_REQUESTERS, names.join(", "))],
                );
                return Err(ResolveFailure::Ambiguous(names));
            }
            IncomingLookup::NotFound(name) => {
                host.notify(
                    target,
                    MessageKey::NoRequestFromPlayer,
                    vec![(PH_REQUESTER, name.clone())],
                );
                return Err(ResolveFailure::NotFound(name));
            }
        };

        if !self.store.remove(&request, &mut self.scheduler) {
            host.notify(target, MessageKey::RequestNoLongerAvailable, Vec::new());
            return Err(ResolveFailure::NoLongerAvailable);
        }
        Ok(request)
    }

    // =========================================================================
    // Disconnect
    // =========================================================================

    /// Cancel every request the actor takes part in and tell the other side
    pub fn disconnect<H: Host>(&mut self, host: &H, actor: ActorId) -> DisconnectOutcome {
        let mut outcome = DisconnectOutcome::default();

        if let Some(outgoing) = self.store.outgoing(actor).cloned() {
            if self.store.remove(&outgoing, &mut self.scheduler) {
                host.notify(
                    outgoing.target_id,
                    MessageKey::RequestCanceledOutgoingDisconnect,
                    vec![(
                        PH_REQUESTER,
                        display_name(host, actor, &outgoing.requester_name),
                    )],
                );
                outcome.outgoing = Some(outgoing);
            }
        }

        let incoming: Vec<PendingRequest> =
            self.store.incoming(actor).into_iter().cloned().collect();
        for request in incoming {
            if self.store.remove(&request, &mut self.scheduler) {
                host.notify(
                    request.requester_id,
                    MessageKey::RequestCanceledIncomingDisconnect,
                    vec![(PH_TARGET, request.target_name.clone())],
                );
                outcome.incoming.push(request);
            }
        }

        if outcome.canceled_count() > 0 {
            info!(
                %actor,
                canceled = outcome.canceled_count(),
                "[session] Requests canceled on disconnect"
            );
        }
        outcome
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Fire every timer due at `now`.
    ///
    /// Call this regularly (every server tick, or from the timer driver).
    pub fn tick<H: Host>(&mut self, host: &H, now: Instant) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        for fired in self.scheduler.poll_due(now) {
            match fired.kind {
                TimerKind::Expiry(request) => {
                    if let Some(event) = self.expire(host, request) {
                        events.push(event);
                    }
                }
                TimerKind::TeleportDelay { requester, target } => {
                    events.push(self.complete_teleport(host, requester, target));
                }
            }
        }

        events
    }

    fn expire<H: Host>(&mut self, host: &H, request: PendingRequest) -> Option<TimerEvent> {
        // Fast path for superseded or resolved requests; `remove` below
        // compares generations too
        if !self.store.is_current(&request) {
            debug!(request = %request.id, "[session] Stale expiry ignored");
            return None;
        }
        if !self.store.remove(&request, &mut self.scheduler) {
            return None;
        }

        host.notify(
            request.requester_id,
            MessageKey::RequestExpiredRequester,
            vec![(PH_TARGET, request.target_name.clone())],
        );
        host.notify(
            request.target_id,
            MessageKey::RequestExpiredTarget,
            vec![(PH_REQUESTER, request.requester_name.clone())],
        );

        info!(request = %request.id, "[session] Request expired");
        Some(TimerEvent::Expired(request))
    }

    fn complete_teleport<H: Host>(
        &mut self,
        host: &H,
        requester: ActorId,
        target: ActorId,
    ) -> TimerEvent {
        let requester_online = host.is_reachable(requester);
        let target_online = host.is_reachable(target);

        if !(requester_online && target_online) {
            for (actor, online) in [(requester, requester_online), (target, target_online)] {
                if online {
                    host.notify(actor, MessageKey::TeleportCanceledOffline, Vec::new());
                }
            }
            info!(
                %requester,
                %target,
                requester_online,
                target_online,
                "[session] Teleport canceled"
            );
            return TimerEvent::TeleportCanceled { requester, target };
        }

        host.relocate(requester, target);

        // Names as of now, not as of acceptance
        let requester_name = display_name(host, requester, &requester.to_string());
        let target_name = display_name(host, target, &target.to_string());
        host.notify(
            requester,
            MessageKey::TeleportSuccessRequester,
            vec![(PH_TARGET, target_name)],
        );
        host.notify(
            target,
            MessageKey::TeleportSuccessTarget,
            vec![(PH_REQUESTER, requester_name)],
        );

        info!(%requester, %target, "[session] Teleported");
        TimerEvent::Teleported { requester, target }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Drop every pending request and cancel every timer
    pub fn shutdown(&mut self) -> usize {
        let requests = self.store.clear_all(&mut self.scheduler);
        let timers = self.scheduler.cancel_all();
        info!(requests, timers, "[session] Shut down");
        requests
    }
}

fn display_name<D: ActorDirectory + ?Sized>(directory: &D, actor: ActorId, fallback: &str) -> String {
    directory
        .current_display_name(actor)
        .unwrap_or_else(|| fallback.to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::mocks::MockHost;
    use std::time::Duration;

    struct Fixture {
        host: MockHost,
        session: TpaSession,
        t0: Instant,
        alice: ActorId,
        bob: ActorId,
        carol: ActorId,
    }

    impl Fixture {
        fn new() -> Self {
            let host = MockHost::new();
            let alice = host.add_actor(1, "Alice");
            let bob = host.add_actor(2, "Bob");
            let carol = host.add_actor(3, "Carol");
            Self {
                host,
                session: TpaSession::new(TimingSettings::from_secs(60, 5)),
                t0: Instant::now(),
                alice,
                bob,
                carol,
            }
        }

        fn at(&self, secs: u64) -> Instant {
            self.t0 + Duration::from_secs(secs)
        }

        fn send(&mut self, requester: ActorId, target: &str, secs: u64) -> SendOutcome {
            let now = self.at(secs);
            self.session.send(&self.host, requester, target, now)
        }

        fn accept(&mut self, target: ActorId, name: Option<&str>, secs: u64) -> AcceptOutcome {
            let now = self.at(secs);
            self.session.accept(&self.host, target, name, now)
        }

        fn tick(&mut self, secs: u64) -> Vec<TimerEvent> {
            let now = self.at(secs);
            self.session.tick(&self.host, now)
        }
    }

    // -------------------------------------------------------------------------
    // Send
    // -------------------------------------------------------------------------

    #[test]
    fn test_send_creates_request_and_notifies_both() {
        let mut fx = Fixture::new();
        let outcome = fx.send(fx.alice, "Bob", 0);

        let SendOutcome::Sent { request, replaced } = outcome else {
            panic!("expected Sent");
        };
        assert!(replaced.is_none());
        assert_eq!(request.requester_name, "Alice");
        assert_eq!(request.target_name, "Bob");
        assert!(fx.session.scheduler().has_expiry(request.id));

        let sent = fx.host.messages_for(fx.alice);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, MessageKey::RequestSent);
        assert_eq!(sent[0].placeholder(PH_SECONDS), Some("60"));
        assert_eq!(
            fx.host.keys_for(fx.bob),
            vec![
                MessageKey::RequestReceived,
                MessageKey::RequestReceivedInstruction
            ]
        );
    }

    #[test]
    fn test_send_to_offline_target() {
        let mut fx = Fixture::new();
        fx.host.set_online(fx.bob, false);

        assert_eq!(
            fx.send(fx.alice, "Bob", 0),
            SendOutcome::TargetNotOnline("Bob".to_string())
        );
        assert_eq!(
            fx.send(fx.alice, "Nobody", 0),
            SendOutcome::TargetNotOnline("Nobody".to_string())
        );
        assert!(fx.session.store().is_empty());
        assert_eq!(
            fx.host.keys_for(fx.alice),
            vec![MessageKey::PlayerNotOnline, MessageKey::PlayerNotOnline]
        );
    }

    #[test]
    fn test_send_to_self_is_rejected() {
        let mut fx = Fixture::new();
        assert_eq!(fx.send(fx.alice, "Alice", 0), SendOutcome::SelfRequest);
        assert!(fx.session.store().is_empty());
        assert_eq!(fx.host.keys_for(fx.alice), vec![MessageKey::CannotTeleportSelf]);
    }

    #[test]
    fn test_send_twice_to_same_target_does_not_duplicate() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        let outcome = fx.send(fx.alice, "Bob", 1);
        assert!(matches!(outcome, SendOutcome::AlreadyRequested(_)));
        assert_eq!(fx.session.store().len(), 1);
        assert_eq!(fx.session.scheduler().armed_count(), 1);
        assert_eq!(fx.host.keys_for(fx.alice), vec![MessageKey::AlreadyRequested]);
        assert!(fx.host.keys_for(fx.bob).is_empty());
    }

    #[test]
    fn test_send_to_new_target_supersedes_previous() {
        // A -> B, then A -> C before B answers
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        let outcome = fx.send(fx.alice, "Carol", 10);
        let SendOutcome::Sent { request, replaced } = outcome else {
            panic!("expected Sent");
        };
        assert_eq!(replaced.map(|r| r.target_id), Some(fx.bob));
        assert_eq!(request.target_id, fx.carol);

        assert_eq!(
            fx.host.keys_for(fx.bob),
            vec![MessageKey::PreviousRequestCanceledNotify]
        );
        assert_eq!(
            fx.host.keys_for(fx.alice),
            vec![MessageKey::PreviousRequestReplaced, MessageKey::RequestSent]
        );

        let store = fx.session.store();
        assert_eq!(store.len(), 1);
        assert!(store.incoming(fx.bob).is_empty());
        assert_eq!(store.outgoing(fx.alice).map(|r| r.target_id), Some(fx.carol));
        assert_eq!(fx.session.scheduler().armed_count(), 1);
    }

    #[test]
    fn test_superseded_request_timer_does_not_fire() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.send(fx.alice, "Carol", 30);
        fx.host.clear_messages();

        // Original deadline of the request to Bob passes silently
        assert!(fx.tick(60).is_empty());
        assert_eq!(fx.host.message_count(), 0);

        let events = fx.tick(90);
        assert!(matches!(&events[..], [TimerEvent::Expired(r)] if r.target_id == fx.carol));
    }

    // -------------------------------------------------------------------------
    // Expiry
    // -------------------------------------------------------------------------

    #[test]
    fn test_unanswered_request_expires() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        assert!(fx.tick(59).is_empty());
        let events = fx.tick(60);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TimerEvent::Expired(_)));

        assert_eq!(fx.host.keys_for(fx.alice), vec![MessageKey::RequestExpiredRequester]);
        assert_eq!(fx.host.keys_for(fx.bob), vec![MessageKey::RequestExpiredTarget]);
        assert!(fx.session.store().is_empty());
        assert_eq!(fx.session.scheduler().armed_count(), 0);
    }

    #[test]
    fn test_expiry_after_accept_is_silent() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.accept(fx.bob, None, 59);
        fx.host.clear_messages();

        // Only the teleport timer is left; no expiry messages at 60s
        let events = fx.tick(60);
        assert!(events.is_empty());
        assert_eq!(fx.host.message_count(), 0);
    }

    #[test]
    fn test_expiry_and_accept_due_in_same_tick() {
        // Accept lands first; the expiry timer must see it and do nothing
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        let outcome = fx.accept(fx.bob, None, 60);
        assert!(matches!(outcome, AcceptOutcome::Accepted { .. }));

        let events = fx.tick(60);
        assert!(events.is_empty());
        assert!(!fx
            .host
            .keys_for(fx.alice)
            .contains(&MessageKey::RequestExpiredRequester));
    }

    #[test]
    fn test_reload_does_not_change_armed_expiry() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.session.set_timings(TimingSettings::from_secs(10, 5));

        assert!(fx.tick(30).is_empty());
        assert_eq!(fx.tick(60).len(), 1);

        // New requests use the new duration
        fx.send(fx.alice, "Carol", 100);
        assert_eq!(fx.tick(110).len(), 1);
    }

    #[test]
    fn test_huge_timings_do_not_panic() {
        let mut fx = Fixture::new();
        let huge = Duration::from_secs(i64::MAX as u64);
        fx.session.set_timings(TimingSettings::new(huge, huge));

        let request = match fx.send(fx.alice, "Bob", 0) {
            SendOutcome::Sent { request, .. } => request,
            other => panic!("expected Sent, got {:?}", other),
        };
        assert!(fx.session.scheduler().has_expiry(request.id));
        assert!(fx.tick(86_400).is_empty());

        assert!(matches!(
            fx.accept(fx.bob, None, 10),
            AcceptOutcome::Accepted { .. }
        ));
        assert!(fx.tick(86_400).is_empty());
        assert_eq!(fx.session.scheduler().armed_count(), 1);
    }

    // -------------------------------------------------------------------------
    // Accept
    // -------------------------------------------------------------------------

    #[test]
    fn test_accept_then_teleport() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        let outcome = fx.accept(fx.bob, None, 10);
        assert!(matches!(outcome, AcceptOutcome::Accepted { .. }));
        assert!(fx.session.store().is_empty());
        assert_eq!(fx.host.keys_for(fx.bob), vec![MessageKey::RequestAcceptedTarget]);
        assert_eq!(
            fx.host.keys_for(fx.alice),
            vec![MessageKey::RequestAcceptedRequester]
        );
        assert_eq!(fx.host.messages_for(fx.alice)[0].placeholder(PH_SECONDS), Some("5"));

        assert!(fx.tick(14).is_empty());
        let events = fx.tick(15);
        assert_eq!(
            events,
            vec![TimerEvent::Teleported {
                requester: fx.alice,
                target: fx.bob
            }]
        );
        assert_eq!(*fx.host.relocations.lock(), vec![(fx.alice, fx.bob)]);
        assert!(fx
            .host
            .keys_for(fx.alice)
            .contains(&MessageKey::TeleportSuccessRequester));
        assert!(fx
            .host
            .keys_for(fx.bob)
            .contains(&MessageKey::TeleportSuccessTarget));
    }

    #[test]
    fn test_teleport_uses_names_at_fire_time() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.accept(fx.bob, None, 1);
        fx.host.rename(fx.bob, "Robert");
        fx.host.clear_messages();

        fx.tick(6);
        let success = &fx.host.messages_for(fx.alice)[0];
        assert_eq!(success.key, MessageKey::TeleportSuccessRequester);
        assert_eq!(success.placeholder(PH_TARGET), Some("Robert"));
    }

    #[test]
    fn test_target_disconnects_during_teleport_wait() {
        // A -> B, B accepts, B leaves before the delay elapses
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.accept(fx.bob, None, 1);
        fx.host.clear_messages();

        fx.host.set_online(fx.bob, false);
        let outcome = fx.session.disconnect(&fx.host, fx.bob);
        assert_eq!(outcome.canceled_count(), 0);

        let events = fx.tick(6);
        assert!(matches!(&events[..], [TimerEvent::TeleportCanceled { .. }]));
        assert_eq!(fx.host.relocation_count(), 0);
        assert_eq!(fx.host.keys_for(fx.alice), vec![MessageKey::TeleportCanceledOffline]);
    }

    #[test]
    fn test_accept_when_requester_went_offline() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.set_online(fx.alice, false);
        fx.host.clear_messages();

        let outcome = fx.accept(fx.bob, None, 1);
        assert!(matches!(outcome, AcceptOutcome::RequesterOffline(_)));
        assert!(fx.session.store().is_empty());
        assert_eq!(fx.session.scheduler().armed_count(), 0);
        assert_eq!(fx.host.keys_for(fx.bob), vec![MessageKey::RequesterOffline]);
    }

    #[test]
    fn test_accept_ambiguous_without_name() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Carol", 0);
        fx.send(fx.bob, "Carol", 0);
        fx.host.clear_messages();

        let outcome = fx.accept(fx.carol, None, 1);
        assert_eq!(
            outcome,
            AcceptOutcome::Unresolved(ResolveFailure::Ambiguous(vec![
                "Alice".to_string(),
                "Bob".to_string()
            ]))
        );
        assert_eq!(fx.session.store().len(), 2);

        let sent = fx.host.messages_for(fx.carol);
        assert_eq!(sent[0].key, MessageKey::MultipleRequestsFound);
        assert_eq!(sent[0].placeholder(PH_REQUESTERS), Some("Alice, Bob"));

        // Naming one resolves it
        let outcome = fx.accept(fx.carol, Some("bob"), 2);
        assert!(matches!(outcome, AcceptOutcome::Accepted { request, .. } if request.requester_id == fx.bob));
        assert_eq!(fx.session.store().len(), 1);
    }

    #[test]
    fn test_accept_with_nothing_pending() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.accept(fx.bob, None, 0),
            AcceptOutcome::Unresolved(ResolveFailure::NoPending)
        );
        assert_eq!(fx.host.keys_for(fx.bob), vec![MessageKey::NoPendingRequests]);
    }

    #[test]
    fn test_accept_unknown_name() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        assert_eq!(
            fx.accept(fx.bob, Some("Carol"), 1),
            AcceptOutcome::Unresolved(ResolveFailure::NotFound("Carol".to_string()))
        );
        assert_eq!(fx.session.store().len(), 1);
        assert_eq!(fx.host.keys_for(fx.bob), vec![MessageKey::NoRequestFromPlayer]);
    }

    // -------------------------------------------------------------------------
    // Deny
    // -------------------------------------------------------------------------

    #[test]
    fn test_deny() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        let outcome = fx.session.deny(&fx.host, fx.bob, Some("Alice"));
        assert!(matches!(outcome, DenyOutcome::Denied(_)));
        assert!(fx.session.store().is_empty());
        assert_eq!(fx.session.scheduler().armed_count(), 0);
        assert_eq!(fx.host.keys_for(fx.bob), vec![MessageKey::RequestDeniedTarget]);
        assert_eq!(fx.host.keys_for(fx.alice), vec![MessageKey::RequestDeniedRequester]);

        // Resolved once; the second attempt finds nothing
        let outcome = fx.session.deny(&fx.host, fx.bob, Some("Alice"));
        assert_eq!(outcome, DenyOutcome::Unresolved(ResolveFailure::NoPending));
        assert!(fx.tick(60).is_empty());
    }

    // -------------------------------------------------------------------------
    // Disconnect
    // -------------------------------------------------------------------------

    #[test]
    fn test_requester_disconnect_cancels_outgoing() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.host.clear_messages();

        fx.host.set_online(fx.alice, false);
        let outcome = fx.session.disconnect(&fx.host, fx.alice);
        assert!(outcome.outgoing.is_some());
        assert!(outcome.incoming.is_empty());

        assert_eq!(
            fx.host.keys_for(fx.bob),
            vec![MessageKey::RequestCanceledOutgoingDisconnect]
        );
        assert!(fx.session.store().is_empty());
        assert!(fx.tick(60).is_empty());
    }

    #[test]
    fn test_target_disconnect_cancels_all_incoming() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Carol", 0);
        fx.send(fx.bob, "Carol", 0);
        fx.send(fx.carol, "Alice", 0);
        fx.host.clear_messages();

        fx.host.set_online(fx.carol, false);
        let outcome = fx.session.disconnect(&fx.host, fx.carol);
        assert_eq!(outcome.canceled_count(), 3);

        assert_eq!(
            fx.host.keys_for(fx.alice),
            vec![
                MessageKey::RequestCanceledOutgoingDisconnect,
                MessageKey::RequestCanceledIncomingDisconnect
            ]
        );
        assert_eq!(
            fx.host.keys_for(fx.bob),
            vec![MessageKey::RequestCanceledIncomingDisconnect]
        );
        assert!(fx.session.store().is_empty());
        assert_eq!(fx.session.scheduler().armed_count(), 0);
    }

    #[test]
    fn test_disconnect_without_requests_is_noop() {
        let mut fx = Fixture::new();
        let outcome = fx.session.disconnect(&fx.host, fx.alice);
        assert_eq!(outcome, DisconnectOutcome::default());
        assert_eq!(fx.host.message_count(), 0);
    }

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------

    #[test]
    fn test_shutdown_discards_everything() {
        let mut fx = Fixture::new();
        fx.send(fx.alice, "Bob", 0);
        fx.send(fx.carol, "Bob", 0);
        fx.accept(fx.bob, Some("Alice"), 1);
        fx.host.clear_messages();

        assert_eq!(fx.session.shutdown(), 1);
        assert_eq!(fx.session.scheduler().armed_count(), 0);
        assert!(fx.tick(120).is_empty());
        assert_eq!(fx.host.message_count(), 0);
        assert_eq!(fx.host.relocation_count(), 0);
    }

    #[test]
    fn test_incoming_requester_names() {
        let mut fx = Fixture::new();
        fx.send(fx.bob, "Alice", 0);
        fx.send(fx.carol, "Alice", 0);
        assert_eq!(
            fx.session.incoming_requester_names(fx.alice, "c"),
            vec!["Carol".to_string()]
        );
    }
}
