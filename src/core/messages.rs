//! Message keys and placeholders
//!
//! The core never renders text. It hands a `MessageKey` plus placeholder
//! values to the `MessagingChannel`, which owns templating.

/// Every message the request lifecycle can emit.
///
/// `as_str()` is the key used in the `[messages]` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    PlayerNotOnline,
    CannotTeleportSelf,
    AlreadyRequested,
    PreviousRequestReplaced,
    PreviousRequestCanceledNotify,
    RequestExpiredRequester,
    RequestExpiredTarget,
    RequestSent,
    RequestReceived,
    RequestReceivedInstruction,
    RequestNoLongerAvailable,
    RequesterOffline,
    RequestAcceptedTarget,
    RequestAcceptedRequester,
    TeleportCanceledOffline,
    TeleportSuccessRequester,
    TeleportSuccessTarget,
    RequestDeniedTarget,
    RequestDeniedRequester,
    NoPendingRequests,
    MultipleRequestsFound,
    NoRequestFromPlayer,
    RequestCanceledOutgoingDisconnect,
    RequestCanceledIncomingDisconnect,
    ReloadSuccess,
}

impl MessageKey {
    pub const ALL: [MessageKey; 25] = [
        MessageKey::PlayerNotOnline,
        MessageKey::CannotTeleportSelf,
        MessageKey::AlreadyRequested,
        MessageKey::PreviousRequestReplaced,
        MessageKey::PreviousRequestCanceledNotify,
        MessageKey::RequestExpiredRequester,
        MessageKey::RequestExpiredTarget,
        MessageKey::RequestSent,
        MessageKey::RequestReceived,
        MessageKey::RequestReceivedInstruction,
        MessageKey::RequestNoLongerAvailable,
        MessageKey::RequesterOffline,
        MessageKey::RequestAcceptedTarget,
        MessageKey::RequestAcceptedRequester,
        MessageKey::TeleportCanceledOffline,
        MessageKey::TeleportSuccessRequester,
        MessageKey::TeleportSuccessTarget,
        MessageKey::RequestDeniedTarget,
        MessageKey::RequestDeniedRequester,
        MessageKey::NoPendingRequests,
        MessageKey::MultipleRequestsFound,
        MessageKey::NoRequestFromPlayer,
        MessageKey::RequestCanceledOutgoingDisconnect,
        MessageKey::RequestCanceledIncomingDisconnect,
        MessageKey::ReloadSuccess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::PlayerNotOnline => "player-not-online",
            MessageKey::CannotTeleportSelf => "cannot-teleport-self",
            MessageKey::AlreadyRequested => "already-requested",
            MessageKey::PreviousRequestReplaced => "previous-request-replaced",
            MessageKey::PreviousRequestCanceledNotify => "previous-request-canceled-notify",
            MessageKey::RequestExpiredRequester => "request-expired-requester",
            MessageKey::RequestExpiredTarget => "request-expired-target",
            MessageKey::RequestSent => "request-sent",
            MessageKey::RequestReceived => "request-received",
            MessageKey::RequestReceivedInstruction => "request-received-instruction",
            MessageKey::RequestNoLongerAvailable => "request-no-longer-available",
            MessageKey::RequesterOffline => "requester-offline",
            MessageKey::RequestAcceptedTarget => "request-accepted-target",
            MessageKey::RequestAcceptedRequester => "request-accepted-requester",
            MessageKey::TeleportCanceledOffline => "teleport-canceled-offline",
            MessageKey::TeleportSuccessRequester => "teleport-success-requester",
            MessageKey::TeleportSuccessTarget => "teleport-success-target",
            MessageKey::RequestDeniedTarget => "request-denied-target",
            MessageKey::RequestDeniedRequester => "request-denied-requester",
            MessageKey::NoPendingRequests => "no-pending-requests",
            MessageKey::MultipleRequestsFound => "multiple-requests-found",
            MessageKey::NoRequestFromPlayer => "no-request-from-player",
            MessageKey::RequestCanceledOutgoingDisconnect => {
                "request-canceled-outgoing-disconnect"
            }
            MessageKey::RequestCanceledIncomingDisconnect => {
                "request-canceled-incoming-disconnect"
            }
            MessageKey::ReloadSuccess => "reload-success",
        }
    }

    /// Look up a key by its config name
    pub fn from_name(name: &str) -> Option<MessageKey> {
        MessageKey::ALL.iter().copied().find(|key| key.as_str() == name)
    }
}

// =============================================================================
// PLACEHOLDERS
// =============================================================================

pub const PH_PLAYER: &str = "player";
pub const PH_REQUESTER: &str = "requester";
pub const PH_REQUESTERS: &str = "requesters";
pub const PH_TARGET: &str = "target";
pub const PH_SECONDS: &str = "seconds";
pub const PH_AUTO_REJECT_SECONDS: &str = "auto_reject_seconds";
pub const PH_TELEPORT_WAIT_SECONDS: &str = "teleport_wait_seconds";

/// Placeholder name/value pairs passed along with a message key
pub type Placeholders = Vec<(&'static str, String)>;
