//! Core traits - abstractions for host-specific implementations
//!
//! The request lifecycle only talks to the host through these traits:
//! who is online, how to reach them, and how to move them. Tests use the
//! recording mocks at the bottom of this file.

use super::messages::{MessageKey, Placeholders};
use super::types::ActorId;

// =============================================================================
// ACTOR DIRECTORY
// =============================================================================

/// Resolve actors and their presence
pub trait ActorDirectory {
    /// Find an online actor by exact name
    fn resolve_by_name(&self, name: &str) -> Option<ActorId>;

    /// Whether the actor is currently online and can be messaged or moved
    fn is_reachable(&self, actor: ActorId) -> bool;

    /// Current display name, or None if the actor is unknown to the host
    fn current_display_name(&self, actor: ActorId) -> Option<String>;
}

// =============================================================================
// MESSAGING CHANNEL
// =============================================================================

/// Deliver a message to an actor.
///
/// Fire-and-forget: delivery to an unreachable actor is silently dropped by
/// the implementation.
pub trait MessagingChannel {
    fn notify(&self, actor: ActorId, key: MessageKey, placeholders: Placeholders);
}

// =============================================================================
// MOVEMENT ACTION
// =============================================================================

/// Move one actor to another actor's current location
pub trait MovementAction {
    fn relocate(&self, actor: ActorId, to_location_of: ActorId);
}

/// Combined trait for everything the lifecycle needs from the host
///
/// This is automatically implemented for any type that implements all three
/// collaborator traits.
pub trait Host: ActorDirectory + MessagingChannel + MovementAction {}
impl<T: ActorDirectory + MessagingChannel + MovementAction> Host for T {}

// =============================================================================
// TEST MOCKS
// =============================================================================
