//! Cooperative interruption of blocked callers
//!
//! Threads cannot be interrupted from the outside, so a caller that wants to
//! abandon a blocking map call hands it an [`Interrupt`] and triggers it from
//! another thread (a signal handler, a watchdog, a test). Triggering is
//! one-shot and wakes every waiter at once: the handle owns the only sender
//! of a channel, and dropping that sender disconnects every receiver.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, cloneable interruption handle
#[derive(Debug, Clone)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Interrupt {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
                signal: rx,
            }),
        }
    }

    /// Wake every caller blocked on this handle. Later calls are no-ops.
    pub fn trigger(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        self.inner.trigger.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once the handle is triggered
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}
