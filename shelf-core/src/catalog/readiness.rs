//! One-shot readiness barrier
//!
//! Opens exactly once and stays open. Blocking waiters park on a condvar,
//! async waiters on a watch channel. The atomic flag is the fast path for
//! `is_ready` and for waiters arriving after the gate opened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Readiness barrier shared by the catalog and its dependents
#[derive(Debug)]
pub struct ReadyGate {
    ready: AtomicBool,
    opened: Mutex<bool>,
    condvar: Condvar,
    watch: watch::Sender<bool>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        let (watch, _) = watch::channel(false);
        Self {
            ready: AtomicBool::new(false),
            opened: Mutex::new(false),
            condvar: Condvar::new(),
            watch,
        }
    }

    /// Non-blocking readiness check
    pub fn is_open(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Open the gate, waking every waiter
    ///
    /// Returns `false` if the gate was already open.
    pub fn open(&self) -> bool {
        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        if *opened {
            return false;
        }
        *opened = true;
        self.ready.store(true, Ordering::Release);
        drop(opened);

        self.condvar.notify_all();
        self.watch.send_replace(true);
        true
    }

    /// Block the calling thread until the gate opens
    pub fn wait(&self) {
        if self.is_open() {
            return;
        }

        let opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        let _opened = self
            .condvar
            .wait_while(opened, |opened| !*opened)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block for at most `timeout`; returns whether the gate is open
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_open() {
            return true;
        }

        let opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        let (opened, _) = self
            .condvar
            .wait_timeout_while(opened, timeout, |opened| !*opened)
            .unwrap_or_else(PoisonError::into_inner);
        *opened
    }

    /// Wait for the gate from async code without blocking a runtime worker
    pub async fn opened(&self) {
        if self.is_open() {
            return;
        }

        let mut receiver = self.watch.subscribe();
        // The sender lives in self, so the channel cannot close under us
        let _ = receiver.wait_for(|ready| *ready).await;
    }
}
