// TPA System - teleport request tracker

pub mod core;
pub mod plugin;

pub use crate::core::{
    AcceptOutcome, ActorDirectory, ActorId, DenyOutcome, DisconnectOutcome, Host, MessageKey,
    MessagingChannel, MovementAction, PendingRequest, SendOutcome, TimerEvent, TimingSettings,
    TpaSession,
};
pub use crate::plugin::{Config, GameHost, TpaPlugin};
