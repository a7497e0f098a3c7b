//! Plugin module - configuration, logging and the threaded runtime

pub mod catalog;
pub mod config;
pub mod driver;
pub mod host;
pub mod logging;
pub mod tracker;

pub use catalog::{translate_color_codes, ChatSink, MessageCatalog};
pub use config::{Config, ConfigError, LoggingSettings};
pub use driver::{SharedSession, TimerDriver};
pub use host::{ChatHost, GameHost};
pub use tracker::TpaPlugin;
