//! Core types - platform-independent data structures
//!
//! These types describe actors, pending teleport requests and the timing
//! settings that drive expiry and the post-acceptance delay.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use super::constants::{DEFAULT_AUTO_REJECT_SECS, DEFAULT_TELEPORT_WAIT_SECS};

// =============================================================================
// ACTOR ID
// =============================================================================

/// Stable identifier of an actor (player), unique for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ActorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// REQUEST ID
// =============================================================================

/// Generation tag of a pending request.
///
/// Assigned by the store from a monotonically increasing counter, so two
/// requests between the same actors never share an id. Removal and timer
/// callbacks compare ids, never keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// PENDING REQUEST
// =============================================================================

/// One pending teleport solicitation.
///
/// Display names are captured at send time and never re-resolved, so a
/// rename while the request is pending does not change its messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub requester_id: ActorId,
    pub requester_name: String,
    pub target_id: ActorId,
    pub target_name: String,
}

impl PendingRequest {
    /// Whether `other` is the very same request instance (same generation)
    pub fn is_same(&self, other: &PendingRequest) -> bool {
        self.id == other.id
    }
}

// =============================================================================
// TIMING SETTINGS
// =============================================================================

/// Durations used when arming timers.
///
/// Changing these only affects timers armed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSettings {
    /// How long a request stays pending before it expires
    pub auto_reject: Duration,
    /// Delay between acceptance and the actual teleport
    pub teleport_wait: Duration,
}

impl TimingSettings {
    pub fn new(auto_reject: Duration, teleport_wait: Duration) -> Self {
        Self {
            auto_reject,
            teleport_wait,
        }
    }

    pub fn from_secs(auto_reject_secs: u64, teleport_wait_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(auto_reject_secs),
            Duration::from_secs(teleport_wait_secs),
        )
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self::from_secs(DEFAULT_AUTO_REJECT_SECS, DEFAULT_TELEPORT_WAIT_SECS)
    }
}
