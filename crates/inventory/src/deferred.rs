//! Single-worker FIFO queue for work done off the calling path.
//!
//! Jobs run in submission order on one dedicated thread. A barrier pushed
//! through the same channel lets callers wait until everything submitted
//! before it has finished, instead of sleeping for a guessed duration.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

enum Message<T> {
    Job(T),
    Barrier(mpsc::Sender<()>),
}

/// Handle to a running worker. Dropping it closes the queue, lets the worker
/// drain what was already submitted, and joins it.
pub(crate) struct DeferredQueue<T: Send + 'static> {
    name: String,
    sender: Option<mpsc::Sender<Message<T>>>,
    worker: Option<thread::JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl<T: Send + 'static> DeferredQueue<T> {
    pub(crate) fn spawn<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(T) + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Message<T>>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let worker_in_flight = in_flight.clone();
        let worker_name = name.clone();
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&worker_name, receiver, handler, &worker_in_flight))
            .expect("failed to spawn deferred worker thread");

        Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
            in_flight,
        }
    }

    /// Hand `job` to the worker. Returns `false` if the worker is gone.
    pub(crate) fn submit(&self, job: T) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if sender.send(Message::Job(job)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            error!(queue = %self.name, "deferred worker is gone, job dropped");
            return false;
        }
        true
    }

    /// Block until every job submitted before this call has run, or until
    /// `timeout` elapses. Returns `true` if the queue caught up in time.
    pub(crate) fn flush(&self, timeout: Duration) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        let (ack_tx, ack_rx) = mpsc::channel();
        if sender.send(Message::Barrier(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv_timeout(timeout).is_ok()
    }

    /// Jobs submitted but not yet finished.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl<T: Send + 'static> Drop for DeferredQueue<T> {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the backlog is done.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(queue = %self.name, "deferred worker panicked");
            }
        }
    }
}

fn worker_loop<T, F>(
    name: &str,
    receiver: mpsc::Receiver<Message<T>>,
    handler: F,
    in_flight: &AtomicUsize,
) where
    F: Fn(T),
{
    debug!(queue = %name, "deferred worker started");

    for message in receiver {
        match message {
            Message::Job(job) => {
                if panic::catch_unwind(AssertUnwindSafe(|| handler(job))).is_err() {
                    error!(queue = %name, "deferred job panicked");
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            Message::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }

    debug!(queue = %name, "deferred worker stopped");
}
