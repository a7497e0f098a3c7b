//! Timer driver - shared session and background tick thread
//!
//! `SharedSession` puts the whole session behind one mutex, so user actions
//! and timer firings from different threads serialize on it and
//! `RequestStore::remove` stays an atomic compare-and-remove.
//!
//! `TimerDriver` owns a thread that ticks the shared session at a fixed
//! interval until it is stopped. A panic during one tick is logged and the
//! thread keeps going.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::core::session::{
    AcceptOutcome, DenyOutcome, DisconnectOutcome, SendOutcome, TimerEvent, TpaSession,
};
use crate::core::traits::Host;
use crate::core::types::{ActorId, TimingSettings};

// =============================================================================
// SHARED SESSION
// =============================================================================

/// Thread-safe handle to a session and the host it talks to
pub struct SharedSession<H> {
    session: Arc<Mutex<TpaSession>>,
    host: Arc<H>,
}

impl<H> Clone for SharedSession<H> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            host: Arc::clone(&self.host),
        }
    }
}

impl<H: Host> SharedSession<H> {
    pub fn new(session: TpaSession, host: H) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            host: Arc::new(host),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn send(&self, requester: ActorId, target_name: &str) -> SendOutcome {
        self.session
            .lock()
            .send(&*self.host, requester, target_name, Instant::now())
    }

    pub fn accept(&self, target: ActorId, requester_name: Option<&str>) -> AcceptOutcome {
        self.session
            .lock()
            .accept(&*self.host, target, requester_name, Instant::now())
    }

    pub fn deny(&self, target: ActorId, requester_name: Option<&str>) -> DenyOutcome {
        self.session.lock().deny(&*self.host, target, requester_name)
    }

    pub fn disconnect(&self, actor: ActorId) -> DisconnectOutcome {
        self.session.lock().disconnect(&*self.host, actor)
    }

    /// Fire timers due at `now`
    pub fn tick_at(&self, now: Instant) -> Vec<TimerEvent> {
        self.session.lock().tick(&*self.host, now)
    }

    pub fn tick(&self) -> Vec<TimerEvent> {
        self.tick_at(Instant::now())
    }

    pub fn incoming_requester_names(&self, target: ActorId, prefix: &str) -> Vec<String> {
        self.session.lock().incoming_requester_names(target, prefix)
    }

    pub fn timings(&self) -> TimingSettings {
        self.session.lock().timings()
    }

    pub fn set_timings(&self, timings: TimingSettings) {
        self.session.lock().set_timings(timings);
    }

    pub fn pending_count(&self) -> usize {
        self.session.lock().store().len()
    }

    pub fn shutdown(&self) -> usize {
        self.session.lock().shutdown()
    }

    /// Run `f` with exclusive access to the session
    pub fn with_session<R>(&self, f: impl FnOnce(&mut TpaSession) -> R) -> R {
        f(&mut *self.session.lock())
    }
}

// =============================================================================
// TIMER DRIVER
// =============================================================================

enum DriverMessage {
    Shutdown,
}

/// Background thread that ticks a `SharedSession`
pub struct TimerDriver {
    tx: Option<Sender<DriverMessage>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// Spawn the tick thread
    pub fn start<H>(session: SharedSession<H>, interval: Duration) -> Self
    where
        H: Host + Send + Sync + 'static,
    {
        let (tx, rx) = bounded::<DriverMessage>(1);

        let handle = thread::spawn(move || loop {
            match rx.recv_timeout(interval) {
                Ok(DriverMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    // A panicking host callback costs one tick, not the thread
                    match panic::catch_unwind(AssertUnwindSafe(|| session.tick())) {
                        Ok(events) => {
                            for event in events {
                                debug!(?event, "[driver] Timer fired");
                            }
                        }
                        Err(panic_info) => {
                            error!("[driver] Tick panicked: {}", panic_message(&*panic_info))
                        }
                    }
                }
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "[driver] Started");
        Self {
            tx: Some(tx),
            thread_handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the thread and wait for it. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.try_send(DriverMessage::Shutdown) {
                // Dropping the sender below also stops the loop
                warn!("[driver] Failed to queue shutdown: {}", e);
            }
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            info!("[driver] Stopped");
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// TESTS
// =============================================================================
