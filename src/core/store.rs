//! Request store - the authoritative set of pending requests
//!
//! Requests are indexed twice: by requester (at most one outgoing request
//! per actor) and by target (any number of incoming requests, one per
//! distinct requester). A request is in one index iff it is in the other.
//!
//! # Removal
//!
//! `remove` compares generations, not keys. Whoever calls it first for a
//! given request wins; every later caller gets `false` and must not emit
//! anything. This is the single linearization point between user actions,
//! expiry timers and disconnect handling.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::scheduler::LifecycleScheduler;
use super::types::{ActorId, PendingRequest, RequestId};

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of `RequestStore::try_create`
#[derive(Debug, Clone, PartialEq)]
pub enum CreateResult {
    /// A new request was stored
    Created(PendingRequest),
    /// The requester's previous request (to another target) was removed and
    /// the new one stored
    Replaced {
        previous: PendingRequest,
        created: PendingRequest,
    },
    /// The requester already has a pending request to this target; nothing
    /// changed
    AlreadyRequested(PendingRequest),
}

impl CreateResult {
    /// The request that is pending after the call
    pub fn request(&self) -> &PendingRequest {
        match self {
            CreateResult::Created(request) => request,
            CreateResult::Replaced { created, .. } => created,
            CreateResult::AlreadyRequested(existing) => existing,
        }
    }
}

/// Result of `RequestStore::find_incoming`
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingLookup {
    /// The target has no incoming request at all
    NoPending,
    /// Several requests and no name given: requester names, oldest first
    Ambiguous(Vec<String>),
    /// No incoming request from the given name
    NotFound(String),
    Found(PendingRequest),
}

// =============================================================================
// REQUEST STORE
// =============================================================================

pub struct RequestStore {
    by_requester: HashMap<ActorId, PendingRequest>,
    by_target: HashMap<ActorId, HashMap<ActorId, PendingRequest>>,
    next_id: u64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self {
            by_requester: HashMap::new(),
            by_target: HashMap::new(),
            next_id: 1,
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Create a request from `requester_id` to `target_id`.
    ///
    /// Self-requests must be rejected by the caller. The caller also arms
    /// the expiry timer of the returned request; a replaced request's timer
    /// is revoked here.
    pub fn try_create(
        &mut self,
        requester_id: ActorId,
        requester_name: &str,
        target_id: ActorId,
        target_name: &str,
        scheduler: &mut LifecycleScheduler,
    ) -> CreateResult {
        debug_assert_ne!(requester_id, target_id, "self-requests are rejected upstream");

        let previous = match self.by_requester.get(&requester_id) {
            Some(existing) if existing.target_id == target_id => {
                return CreateResult::AlreadyRequested(existing.clone());
            }
            Some(existing) => {
                let existing = existing.clone();
                self.remove(&existing, scheduler).then_some(existing)
            }
            None => None,
        };

        let request = PendingRequest {
            id: self.next_request_id(),
            requester_id,
            requester_name: requester_name.to_string(),
            target_id,
            target_name: target_name.to_string(),
        };

        self.by_requester.insert(requester_id, request.clone());
        self.by_target
            .entry(target_id)
            .or_default()
            .insert(requester_id, request.clone());

        debug!(
            request = %request.id,
            requester = %request.requester_name,
            target = %request.target_name,
            replaced = previous.is_some(),
            "[store] Request created"
        );

        match previous {
            Some(previous) => CreateResult::Replaced {
                previous,
                created: request,
            },
            None => CreateResult::Created(request),
        }
    }

    /// Remove this exact request from both indices and revoke its expiry
    /// timer.
    ///
    /// Returns false, changing nothing, if the request was already resolved
    /// or if a newer request now occupies its keys.
    pub fn remove(&mut self, request: &PendingRequest, scheduler: &mut LifecycleScheduler) -> bool {
        let in_requester_index = self
            .by_requester
            .get(&request.requester_id)
            .is_some_and(|current| current.is_same(request));
        let in_target_index = self
            .by_target
            .get(&request.target_id)
            .and_then(|incoming| incoming.get(&request.requester_id))
            .is_some_and(|current| current.is_same(request));

        if !(in_requester_index && in_target_index) {
            if in_requester_index != in_target_index {
                warn!(
                    request = %request.id,
                    in_requester_index,
                    in_target_index,
                    "[store] Index mismatch, refusing partial removal"
                );
            }
            return false;
        }

        self.by_requester.remove(&request.requester_id);
        if let Some(incoming) = self.by_target.get_mut(&request.target_id) {
            incoming.remove(&request.requester_id);
            if incoming.is_empty() {
                self.by_target.remove(&request.target_id);
            }
        }
        scheduler.cancel_expiry(request.id);

        debug!(request = %request.id, "[store] Request removed");
        true
    }

    /// Drop every request and revoke their expiry timers. Returns how many
    /// requests were pending.
    pub fn clear_all(&mut self, scheduler: &mut LifecycleScheduler) -> usize {
        let count = self.by_requester.len();
        for request in self.by_requester.values() {
            scheduler.cancel_expiry(request.id);
        }
        self.by_requester.clear();
        self.by_target.clear();
        if count > 0 {
            debug!(count, "[store] Cleared all requests");
        }
        count
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Resolve which incoming request a target means.
    ///
    /// Without a name, a single incoming request resolves on its own and
    /// several are ambiguous. With a name, the match is case-insensitive and
    /// exact against the requester name captured at send time.
    pub fn find_incoming(&self, target_id: ActorId, requester_name: Option<&str>) -> IncomingLookup {
        let incoming = self.incoming(target_id);
        if incoming.is_empty() {
            return IncomingLookup::NoPending;
        }

        match requester_name {
            None => match incoming.as_slice() {
                [only] => IncomingLookup::Found((*only).clone()),
                _ => IncomingLookup::Ambiguous(
                    incoming.iter().map(|r| r.requester_name.clone()).collect(),
                ),
            },
            Some(name) => {
                let wanted = name.to_lowercase();
                incoming
                    .into_iter()
                    .find(|r| r.requester_name.to_lowercase() == wanted)
                    .cloned()
                    .map(IncomingLookup::Found)
                    .unwrap_or_else(|| IncomingLookup::NotFound(name.to_string()))
            }
        }
    }

    /// Incoming requests of a target, oldest first
    pub fn incoming(&self, target_id: ActorId) -> Vec<&PendingRequest> {
        let mut incoming: Vec<_> = self
            .by_target
            .get(&target_id)
            .map(|m| m.values().collect())
            .unwrap_or_default();
        incoming.sort_by_key(|r| r.id);
        incoming
    }

    /// The requester's outgoing request, if any
    pub fn outgoing(&self, requester_id: ActorId) -> Option<&PendingRequest> {
        self.by_requester.get(&requester_id)
    }

    /// Whether this exact request is still the requester's pending one
    pub fn is_current(&self, request: &PendingRequest) -> bool {
        self.outgoing(request.requester_id)
            .is_some_and(|current| current.is_same(request))
    }

    /// Sorted requester names of a target's incoming requests whose name
    /// starts with `prefix` (case-insensitive)
    pub fn incoming_requester_names(&self, target_id: ActorId, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut names: Vec<String> = self
            .incoming(target_id)
            .into_iter()
            .map(|r| r.requester_name.clone())
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.by_requester.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_requester.is_empty()
    }

    /// Check that both indices hold exactly the same requests
    #[cfg(test)]
    pub(crate) fn indices_consistent(&self) -> bool {
        let target_entries: usize = self.by_target.values().map(|m| m.len()).sum();
        target_entries == self.by_requester.len()
            && !self.by_target.values().any(|m| m.is_empty())
            && self.by_requester.values().all(|r| {
                self.by_target
                    .get(&r.target_id)
                    .and_then(|m| m.get(&r.requester_id))
                    .is_some_and(|t| t.is_same(r))
            })
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
