//! Result pipe: streams step outcomes from a running step to its caller.
//!
//! A pipe has exactly one producer ([`PipeSender`], moved into the step task)
//! and one consumer ([`Pipe`], kept by the orchestrator). The producer sends
//! zero or more signals and then closes; the consumer drains everything that
//! was sent. A step succeeded iff its drained sequence is empty.
//!
//! ```text
//! Open ──close()/drop──▶ Closing ──drain() completes──▶ Closed
//! ```
//!
//! Signals are buffered in a bounded channel, so a fast producer waits for
//! the consumer instead of growing memory without limit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffer size used by [`create`]
pub const DEFAULT_CAPACITY: usize = 16;

/// Lifecycle of a pipe as seen by the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    /// The producer may still send
    Open,
    /// The producer has closed; buffered signals not yet drained
    Closing,
    /// Fully drained; the result is cached
    Closed,
}

/// Create a pipe with the default buffer size
pub fn create<S>() -> (PipeSender<S>, Pipe<S>) {
    with_capacity(DEFAULT_CAPACITY)
}

/// Create a pipe buffering at most `capacity` undrained signals
pub fn with_capacity<S>(capacity: usize) -> (PipeSender<S>, Pipe<S>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let closed = Arc::new(AtomicBool::new(false));
    (
        PipeSender {
            tx,
            closed: Arc::clone(&closed),
        },
        Pipe {
            rx: Some(rx),
            closed,
            signals: Vec::new(),
        },
    )
}

/// Producer half of a pipe
///
/// Closing consumes the sender, so nothing can be sent after close. Dropping
/// the sender closes the pipe too, which keeps a panicking producer from
/// leaving its consumer waiting forever.
#[derive(Debug)]
pub struct PipeSender<S> {
    tx: mpsc::Sender<S>,
    closed: Arc<AtomicBool>,
}

impl<S> PipeSender<S> {
    /// Append a signal.
    ///
    /// Waits only while the buffer is full. If the consumer is gone the
    /// signal is discarded.
    pub async fn send(&self, signal: S) {
        if self.tx.send(signal).await.is_err() {
            log::warn!("Result pipe consumer dropped; discarding signal");
        }
    }

    /// Blocking variant of [`send`](Self::send) for producers running on a
    /// plain thread. Must not be called from within an async runtime.
    pub fn send_blocking(&self, signal: S) {
        if self.tx.blocking_send(signal).is_err() {
            log::warn!("Result pipe consumer dropped; discarding signal");
        }
    }

    /// Declare that no more signals will be sent.
    pub fn close(self) {}
}

impl<S> Drop for PipeSender<S> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Consumer half of a pipe
#[derive(Debug)]
pub struct Pipe<S> {
    rx: Option<mpsc::Receiver<S>>,
    closed: Arc<AtomicBool>,
    signals: Vec<S>,
}

impl<S> Pipe<S> {
    /// Current state
    pub fn state(&self) -> PipeState {
        if self.rx.is_none() {
            PipeState::Closed
        } else if self.closed.load(Ordering::Acquire) {
            PipeState::Closing
        } else {
            PipeState::Open
        }
    }

    /// Wait for the producer to close and return every signal it sent, in
    /// send order.
    ///
    /// Once drained, further calls return the same signals immediately.
    /// Cancel safe: if the returned future is dropped (e.g. by a timeout),
    /// signals received so far are kept and a later call resumes.
    pub async fn drain(&mut self) -> &[S] {
        if let Some(rx) = self.rx.as_mut() {
            while let Some(signal) = rx.recv().await {
                self.signals.push(signal);
            }
            self.rx = None;
        }
        &self.signals
    }

    /// Blocking variant of [`drain`](Self::drain) for synchronous callers.
    ///
    /// Must not be called from within an async runtime.
    pub fn drain_blocking(&mut self) -> &[S] {
        if let Some(rx) = self.rx.as_mut() {
            while let Some(signal) = rx.blocking_recv() {
                self.signals.push(signal);
            }
            self.rx = None;
        }
        &self.signals
    }

    /// Signals received so far, without waiting
    pub fn received(&self) -> &[S] {
        &self.signals
    }

    /// Consume the pipe, returning the signals received so far
    pub fn into_signals(self) -> Vec<S> {
        self.signals
    }
}

#[cfg(test)]
#[path = "pipe_test.rs"]
mod tests;
