//! Interactive execution context
//!
//! Presentation state is only mutated on one dedicated thread. Background
//! work hands results back by dispatching closures onto that thread through
//! a `MainQueue`.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::debug;

thread_local! {
    static INTERACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread is the interactive thread
pub fn is_interactive_thread() -> bool {
    INTERACTIVE.with(Cell::get)
}

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Handle to the interactive thread's work queue
///
/// Clones share the same thread. Jobs run one at a time, in dispatch order.
#[derive(Clone)]
pub struct MainQueue {
    sender: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MainQueue {
    /// Spawn the interactive thread
    pub fn spawn() -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Message>();

        let thread = std::thread::Builder::new()
            .name("shelf-main".to_string())
            .spawn(move || {
                INTERACTIVE.with(|flag| flag.set(true));
                while let Some(message) = receiver.blocking_recv() {
                    match message {
                        Message::Run(job) => job(),
                        Message::Shutdown => break,
                    }
                }

                // Jobs that raced past the closed check land behind Shutdown
                receiver.close();
                while let Ok(message) = receiver.try_recv() {
                    if let Message::Run(_) = message {
                        debug!("Interactive queue closed, dropping job");
                    }
                }
                debug!("Interactive queue stopped");
            })?;

        Ok(Self {
            sender,
            closed: Arc::new(AtomicBool::new(false)),
            thread: Arc::new(Mutex::new(Some(thread))),
        })
    }

    /// Queue `job` to run on the interactive thread
    ///
    /// Returns `false` if the queue has shut down; the job is dropped.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() || self.sender.send(Message::Run(Box::new(job))).is_err() {
            debug!("Interactive queue closed, dropping job");
            return false;
        }
        true
    }

    /// Run `job` on the interactive thread and wait for its result
    ///
    /// Runs inline when already on the interactive thread. Returns `None`
    /// if the queue shut down before the job ran.
    pub fn dispatch_and_wait<F, R>(&self, job: F) -> Option<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if is_interactive_thread() {
            return Some(job());
        }

        let (reply, result) = std::sync::mpsc::sync_channel(1);
        let queued = self.dispatch(move || {
            let _ = reply.send(job());
        });
        if !queued {
            return None;
        }
        result.recv().ok()
    }

    /// Whether `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the interactive thread after the jobs already queued
    ///
    /// Joins the thread unless called from it.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.sender.send(Message::Shutdown);

        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if !is_interactive_thread() && handle.join().is_err() {
                tracing::error!("Interactive thread panicked");
            }
        }
    }
}
