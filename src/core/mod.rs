//! Core module - host-independent request lifecycle

pub mod constants;
pub mod messages;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod traits;
pub mod types;

pub use messages::{MessageKey, Placeholders};
pub use scheduler::{FiredTimer, LifecycleScheduler, TimerId, TimerKind};
pub use session::{
    AcceptOutcome, DenyOutcome, DisconnectOutcome, ResolveFailure, SendOutcome, TimerEvent,
    TpaSession,
};
pub use store::{CreateResult, IncomingLookup, RequestStore};
pub use traits::{ActorDirectory, Host, MessagingChannel, MovementAction};
pub use types::{ActorId, PendingRequest, RequestId, TimingSettings};
