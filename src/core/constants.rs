//! Constants - default durations and limits
//!
//! Message keys live in the `messages` module.

use std::time::Duration;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Seconds a request stays pending before it is automatically rejected
pub const DEFAULT_AUTO_REJECT_SECS: u64 = 60;

/// Seconds between acceptance and the teleport
pub const DEFAULT_TELEPORT_WAIT_SECS: u64 = 5;

/// Smallest accepted value for either timing setting, in seconds
pub const MIN_TIMING_SECS: i64 = 1;

/// Largest accepted value for either timing setting (ten years), in seconds
pub const MAX_TIMING_SECS: i64 = 315_360_000;

/// Longest delay the scheduler will arm; longer delays are clamped
pub const MAX_TIMER_DELAY: Duration = Duration::from_secs(MAX_TIMING_SECS as u64);

// =============================================================================
// DRIVER
// =============================================================================

/// How often the background driver polls the scheduler for due timers
pub const DRIVER_TICK_INTERVAL: Duration = Duration::from_millis(50);
