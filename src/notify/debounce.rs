//! Trailing-edge debounced notifier.

use crate::error::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Subscriber callback. Receives a hint naming the path that changed last
/// (empty for a whole-state change).
pub type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

type Slot = Arc<Mutex<Option<ChangeCallback>>>;

/// Delivers coalesced change notifications to at most one subscriber.
///
/// Delivery happens on a dedicated worker thread, never on the thread that
/// triggered it. The worker stops when the notifier is dropped, after
/// delivering any pending notification.
pub struct Notifier {
    sender: Option<Sender<String>>,
    subscriber: Slot,
    worker: Option<JoinHandle<()>>,
    window: Duration,
}

impl Notifier {
    /// Start a notifier with the given quiescence window.
    pub fn new(window: Duration) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let subscriber: Slot = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&subscriber);

        let worker = thread::Builder::new()
            .name("usage-report-notify".to_string())
            .spawn(move || run(receiver, worker_slot, window))?;

        Ok(Self {
            sender: Some(sender),
            subscriber,
            worker: Some(worker),
            window,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Install the subscriber, replacing any previous one.
    pub fn set_subscriber<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.subscriber.lock() = Some(Arc::new(callback));
    }

    /// Remove the subscriber. Pending notifications are dropped.
    pub fn clear_subscriber(&self) {
        *self.subscriber.lock() = None;
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.lock().is_some()
    }

    /// Schedule a notification. Cheap when nobody is subscribed.
    pub fn notify(&self, hint: &str) {
        if !self.has_subscriber() {
            return;
        }
        if let Some(sender) = &self.sender {
            // The worker only disconnects during drop.
            let _ = sender.send(hint.to_string());
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

fn run(receiver: Receiver<String>, subscriber: Slot, window: Duration) {
    while let Ok(mut hint) = receiver.recv() {
        let mut open = true;
        loop {
            match receiver.recv_timeout(window) {
                Ok(next) => hint = next,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    open = false;
                    break;
                }
            }
        }

        deliver(&subscriber, &hint);
        if !open {
            break;
        }
    }
    debug!("notifier worker stopped");
}

fn deliver(subscriber: &Slot, hint: &str) {
    // Clone out so the callback may replace or clear the subscriber.
    let Some(callback) = subscriber.lock().clone() else {
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| callback(hint))).is_err() {
        warn!(hint, "change subscriber panicked");
    }
}
