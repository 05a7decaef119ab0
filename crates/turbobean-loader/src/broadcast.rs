//! Change broadcast: lets readers block until the project has re-solved.
//!
//! A single monotonic version counter is bumped once per completed solve.
//! Listeners don't see intermediate states and don't miss updates: each
//! tracks the last version it observed and wakes whenever the counter
//! moves past it, no matter how many solves happened in between
//! (edge-triggered, not one-notification-per-solve).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Shared state backing a [`Broadcaster`] and its [`Listener`]s.
#[derive(Debug, Default)]
struct State {
    version: Mutex<u64>,
    changed: Condvar,
    shutdown: Mutex<bool>,
}

/// Bumps a version counter once per solve and wakes any blocked
/// [`Listener`]s.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    state: Arc<State>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    /// Create a broadcaster starting at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(State::default()),
        }
    }

    /// The current version, incremented once per completed solve.
    #[must_use]
    pub fn version(&self) -> u64 {
        *self.state.version.lock()
    }

    /// Advance the version and wake every blocked listener.
    pub fn bump(&self) {
        let mut version = self.state.version.lock();
        *version += 1;
        self.state.changed.notify_all();
    }

    /// Create a listener that starts tracking from the current version,
    /// i.e. its first `wait_for_new_version` call blocks until the *next*
    /// bump, not the most recent one.
    #[must_use]
    pub fn listen(&self) -> Listener {
        Listener {
            state: self.state.clone(),
            last_seen: self.version(),
        }
    }

    /// Signal shutdown: every blocked or future `wait_for_new_version` call
    /// on any listener returns `false` instead of waiting.
    ///
    /// Idempotent; calling this more than once (or after every listener has
    /// already dropped) is harmless.
    pub fn shutdown(&self) {
        *self.state.shutdown.lock() = true;
        self.state.changed.notify_all();
    }

    /// Whether [`Self::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.state.shutdown.lock()
    }
}

/// Tracks the last version a reader has observed and blocks until a newer
/// one is available.
#[derive(Debug, Clone)]
pub struct Listener {
    state: Arc<State>,
    last_seen: u64,
}

impl Listener {
    /// Block until the version counter advances past the last one this
    /// listener observed, then return `true`.
    ///
    /// Returns `false` immediately without blocking if the owning
    /// [`Broadcaster`] has already had [`Broadcaster::shutdown`] called, or
    /// as soon as it is called while blocked — the clean-exit path callers
    /// use to stop a waiting thread when the project is torn down.
    pub fn wait_for_new_version(&mut self) -> bool {
        let mut version = self.state.version.lock();
        loop {
            if *self.state.shutdown.lock() {
                return false;
            }
            if *version != self.last_seen {
                self.last_seen = *version;
                return true;
            }
            self.state.changed.wait(&mut version);
        }
    }

    /// As [`Self::wait_for_new_version`], but gives up and returns `None`
    /// if no new version arrives within `timeout`. Returns `Some(false)` if
    /// shutdown is signalled before a new version or the timeout arrives.
    #[must_use]
    pub fn wait_for_new_version_timeout(&mut self, timeout: Duration) -> Option<bool> {
        let mut version = self.state.version.lock();
        let mut remaining = timeout;
        loop {
            if *self.state.shutdown.lock() {
                return Some(false);
            }
            if *version != self.last_seen {
                self.last_seen = *version;
                return Some(true);
            }
            let start = std::time::Instant::now();
            let result = self.state.changed.wait_for(&mut version, remaining);
            if result.timed_out() {
                return None;
            }
            remaining = remaining.saturating_sub(start.elapsed());
        }
    }

    /// The last version this listener has observed.
    #[must_use]
    pub const fn last_seen(&self) -> u64 {
        self.last_seen
    }
}
