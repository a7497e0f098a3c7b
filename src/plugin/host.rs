//! Host adapter - renders lifecycle messages through the catalog
//!
//! The game side implements `GameHost` (presence, movement, raw chat);
//! `ChatHost` turns it into a full `core::Host` by rendering message keys
//! with the current catalog before handing text to the chat sink.

use std::sync::Arc;

use parking_lot::RwLock;

use super::catalog::{ChatSink, MessageCatalog};
use crate::core::messages::{MessageKey, Placeholders};
use crate::core::traits::{ActorDirectory, MessagingChannel, MovementAction};
use crate::core::types::ActorId;

/// Everything the game server provides
pub trait GameHost: ActorDirectory + MovementAction + ChatSink {}
impl<T: ActorDirectory + MovementAction + ChatSink> GameHost for T {}

/// `GameHost` plus a shared, reloadable message catalog
pub struct ChatHost<G> {
    game: G,
    catalog: Arc<RwLock<MessageCatalog>>,
}

impl<G: GameHost> ChatHost<G> {
    pub fn new(game: G, catalog: Arc<RwLock<MessageCatalog>>) -> Self {
        Self { game, catalog }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Swap in a new catalog; messages sent afterwards use it
    pub fn replace_catalog(&self, catalog: MessageCatalog) {
        *self.catalog.write() = catalog;
    }
}

impl<G: GameHost> ActorDirectory for ChatHost<G> {
    fn resolve_by_name(&self, name: &str) -> Option<ActorId> {
        self.game.resolve_by_name(name)
    }

    fn is_reachable(&self, actor: ActorId) -> bool {
        self.game.is_reachable(actor)
    }

    fn current_display_name(&self, actor: ActorId) -> Option<String> {
        self.game.current_display_name(actor)
    }
}

impl<G: GameHost> MovementAction for ChatHost<G> {
    fn relocate(&self, actor: ActorId, to_location_of: ActorId) {
        self.game.relocate(actor, to_location_of);
    }
}

impl<G: GameHost> MessagingChannel for ChatHost<G> {
    fn notify(&self, actor: ActorId, key: MessageKey, placeholders: Placeholders) {
        let text = self.catalog.read().render(key, &placeholders);
        self.game.send_text(actor, &text);
    }
}

// =============================================================================
// TEST MOCKS
// =============================================================================
