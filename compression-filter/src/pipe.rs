//! Message pipes and negotiation latches.
//!
//! - [`pipe`]: an ordered, bounded, single-consumer stream between two
//!   stages of a call
//! - [`latch`]: a single-assignment value handed from one stage to another
//!
//! Both are thin wrappers around `tokio::sync` channels. Dropping either end
//! of a pipe closes it; dropping a latch setter unset wakes the waiter with
//! `None`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

/// Default number of in-flight items a pipe buffers.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

/// Create a pipe with [`DEFAULT_PIPE_CAPACITY`].
pub fn pipe<T>() -> (PipeSender<T>, PipeReceiver<T>) {
    pipe_with_capacity(DEFAULT_PIPE_CAPACITY)
}

/// Create a pipe buffering at most `capacity` items (at least one).
pub fn pipe_with_capacity<T>(capacity: usize) -> (PipeSender<T>, PipeReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PipeSender { tx }, PipeReceiver { rx })
}

/// Writing end of a pipe.
#[derive(Debug)]
pub struct PipeSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> PipeSender<T> {
    /// Push an item, waiting for buffer space.
    ///
    /// Returns false if the receiving end is gone; the item is dropped.
    pub async fn push(&self, item: T) -> bool {
        self.tx.send(item).await.is_ok()
    }

    /// Returns true once the receiving end has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reading end of a pipe.
#[derive(Debug)]
pub struct PipeReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> PipeReceiver<T> {
    /// Wait for the next item. `None` once every sender is gone and the
    /// buffer is drained.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop accepting items; buffered items can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl<T> Stream for PipeReceiver<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Create a latch.
pub fn latch<T>() -> (LatchSetter<T>, LatchWaiter<T>) {
    let (tx, rx) = oneshot::channel();
    (LatchSetter { tx }, LatchWaiter { rx })
}

/// Setting side of a latch. Consumed by [`set`](Self::set).
#[derive(Debug)]
pub struct LatchSetter<T> {
    tx: oneshot::Sender<T>,
}

impl<T> LatchSetter<T> {
    /// Set the latch. Returns false if the waiter is gone.
    pub fn set(self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }

    /// Returns true once the waiter has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Waiting side of a latch.
#[derive(Debug)]
pub struct LatchWaiter<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> LatchWaiter<T> {
    /// Wait for the value. `None` if the setter was dropped without setting.
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
