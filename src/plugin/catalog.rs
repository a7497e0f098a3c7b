//! Message catalog - templates, placeholders and color codes
//!
//! Templates use `{name}` placeholders and `&` color codes, which are
//! translated to the `§` section sign understood by game chat.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use tracing::warn;

use crate::core::messages::MessageKey;
use crate::core::types::ActorId;

/// Characters that may follow `&` to form a color/format code
const COLOR_CODES: &str = "0123456789abcdefklmnorABCDEFKLMNOR";

const SECTION_SIGN: char = '\u{00A7}';

static DEFAULT_MESSAGES: Lazy<HashMap<MessageKey, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (MessageKey::PlayerNotOnline, "&cPlayer '{player}' is not online."),
        (MessageKey::CannotTeleportSelf, "&cYou cannot send a teleport request to yourself."),
        (MessageKey::AlreadyRequested, "&eYou already sent a teleport request to {target}."),
        (MessageKey::PreviousRequestReplaced, "&eYour previous request to {target} was replaced."),
        (MessageKey::PreviousRequestCanceledNotify, "&e{requester}'s teleport request was canceled."),
        (MessageKey::RequestExpiredRequester, "&cYour teleport request to {target} expired."),
        (MessageKey::RequestExpiredTarget, "&cThe teleport request from {requester} expired."),
        (MessageKey::RequestSent, "&aTeleport request sent to {target}. It expires in {seconds} seconds."),
        (MessageKey::RequestReceived, "&e{requester} wants to teleport to you."),
        (MessageKey::RequestReceivedInstruction, "&eUse /tpaccept {requester} or /tpdeny {requester}."),
        (MessageKey::RequestNoLongerAvailable, "&cThat teleport request is no longer available."),
        (MessageKey::RequesterOffline, "&c{requester} is offline."),
        (MessageKey::RequestAcceptedTarget, "&aAccepted {requester}'s request. Teleporting in {seconds} seconds."),
        (MessageKey::RequestAcceptedRequester, "&a{target} accepted your request. Teleporting in {seconds} seconds."),
        (MessageKey::TeleportCanceledOffline, "&cTeleport canceled because a player went offline."),
        (MessageKey::TeleportSuccessRequester, "&aTeleported to {target}."),
        (MessageKey::TeleportSuccessTarget, "&a{requester} teleported to you."),
        (MessageKey::RequestDeniedTarget, "&eDenied {requester}'s teleport request."),
        (MessageKey::RequestDeniedRequester, "&c{target} denied your teleport request."),
        (MessageKey::NoPendingRequests, "&eYou have no pending teleport requests."),
        (MessageKey::MultipleRequestsFound, "&eYou have several requests. Specify one of: {requesters}."),
        (MessageKey::NoRequestFromPlayer, "&cNo pending request from '{requester}'."),
        (MessageKey::RequestCanceledOutgoingDisconnect, "&e{requester}'s teleport request was canceled."),
        (MessageKey::RequestCanceledIncomingDisconnect, "&eYour teleport request to {target} was canceled."),
        (MessageKey::ReloadSuccess, "&aTPA reloaded: auto-reject={auto_reject_seconds}s, teleport-wait={teleport_wait_seconds}s"),
    ])
});

// =============================================================================
// MESSAGE CATALOG
// =============================================================================

/// Rendered-message lookup with per-key overrides from the config file
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    overrides: HashMap<MessageKey, String>,
}

impl MessageCatalog {
    /// Build a catalog from the `[messages]` config section.
    ///
    /// Unknown keys are ignored with a warning.
    pub fn from_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut catalog = Self::default();
        for (name, template) in overrides {
            match MessageKey::from_name(name) {
                Some(key) => {
                    catalog.overrides.insert(key, template.clone());
                }
                None => warn!(key = %name, "[catalog] Unknown message key ignored"),
            }
        }
        catalog
    }

    /// Raw template for a key: the override if any, else the default
    pub fn template(&self, key: MessageKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .or_else(|| DEFAULT_MESSAGES.get(&key).copied())
            .unwrap_or_else(|| key.as_str())
    }

    /// Substitute placeholders and translate color codes
    pub fn render(&self, key: MessageKey, placeholders: &[(&str, String)]) -> String {
        let replaced = placeholders
            .iter()
            .fold(self.template(key).to_string(), |text, (name, value)| {
                text.replace(&format!("{{{}}}", name), value)
            });
        translate_color_codes(&replaced)
    }
}

/// Replace `&x` with `§x` when `x` is a valid color/format code
pub fn translate_color_codes(input: &str) -> String {
    let mut chars: Vec<char> = input.chars().collect();
    for i in 0..chars.len().saturating_sub(1) {
        if chars[i] == '&' && COLOR_CODES.contains(chars[i + 1]) {
            chars[i] = SECTION_SIGN;
        }
    }
    chars.into_iter().collect()
}

// =============================================================================
// CHAT SINK
// =============================================================================

/// Deliver rendered text to an actor's chat.
///
/// Implementations drop text for actors that are offline.
pub trait ChatSink {
    fn send_text(&self, actor: ActorId, text: &str);
}
