use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use futures::Stream;
use tokio::sync::{Mutex, mpsc};

use crate::{
    error::{DecodeError, Result},
    frame::{Frame, FramePair},
};

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// One unit of work handed to consumers: the index of the current frame,
/// the `(previous, current)` pair and the caller's settings, untouched.
#[derive(Clone, Debug)]
pub struct WorkItem<S> {
    pub index: u64,
    pub frames: FramePair,
    pub settings: S,
}

impl<S> WorkItem<S> {
    pub fn new(index: u64, frames: FramePair, settings: S) -> Self {
        Self {
            index,
            frames,
            settings,
        }
    }

    pub fn into_parts(self) -> (u64, (Frame, Frame), S) {
        (self.index, self.frames.into_tuple(), self.settings)
    }
}

impl<S> Display for WorkItem<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorkItem {{ index: {}, size: {} }}",
            self.index,
            self.frames.current.geometry()
        )
    }
}

/// Producer side of a FIFO work queue.
///
/// `enqueue` blocks the calling thread while a bounded queue is full. It must
/// not be called from inside an async context.
pub trait WorkSink<S>: Send {
    fn enqueue(&self, item: WorkItem<S>) -> Result<()>;
}

impl<S: Send> WorkSink<S> for mpsc::Sender<WorkItem<S>> {
    fn enqueue(&self, item: WorkItem<S>) -> Result<()> {
        self.blocking_send(item).map_err(|_| DecodeError::QueueClosed)
    }
}

impl<S: Send> WorkSink<S> for mpsc::UnboundedSender<WorkItem<S>> {
    fn enqueue(&self, item: WorkItem<S>) -> Result<()> {
        self.send(item).map_err(|_| DecodeError::QueueClosed)
    }
}

impl<S: Send> WorkSink<S> for std::sync::mpsc::SyncSender<WorkItem<S>> {
    fn enqueue(&self, item: WorkItem<S>) -> Result<()> {
        self.send(item).map_err(|_| DecodeError::QueueClosed)
    }
}

impl<S: Send> WorkSink<S> for std::sync::mpsc::Sender<WorkItem<S>> {
    fn enqueue(&self, item: WorkItem<S>) -> Result<()> {
        self.send(item).map_err(|_| DecodeError::QueueClosed)
    }
}

/// Consumer side of a bounded work queue, shareable between consumers.
///
/// The queue ends (`None`) once every sender is dropped, i.e. when the
/// decoder that owns the sender has exited. A consumer waiting for an item
/// holds the receiver; other waiting consumers queue up behind it, while
/// `try_recv` returns immediately.
pub struct WorkQueue<S> {
    inner: Mutex<mpsc::Receiver<WorkItem<S>>>,
    capacity: usize,
}

impl<S> WorkQueue<S> {
    pub fn new() -> (mpsc::Sender<WorkItem<S>>, Self) {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (mpsc::Sender<WorkItem<S>>, Self) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (
            sender,
            Self {
                inner: Mutex::new(receiver),
                capacity,
            },
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks until an item is available or the queue has ended.
    ///
    /// Must not be called from inside an async context.
    pub fn blocking_recv(&self) -> Option<WorkItem<S>> {
        self.inner.blocking_lock().blocking_recv()
    }

    /// Returns `None` when nothing is queued or another consumer is receiving.
    pub fn try_recv(&self) -> Option<WorkItem<S>> {
        self.inner.try_lock().ok()?.try_recv().ok()
    }

    pub async fn recv(&self) -> Option<WorkItem<S>> {
        self.inner.lock().await.recv().await
    }

    /// Returns a stream that owns the queue. Use this when you have `Arc<WorkQueue<S>>`.
    pub fn as_stream(this: Arc<Self>) -> impl Stream<Item = WorkItem<S>> {
        futures::stream::unfold(this, |queue| async move {
            let item = queue.recv().await?;
            Some((item, queue))
        })
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
