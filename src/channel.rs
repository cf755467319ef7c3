//! Capacity-bounded FIFO queue with blocking operations and an explicit close state.
//!
//! The queue is a thin wrapper over a bounded `flume` channel: pushing blocks while the queue is
//! full, popping blocks while it's empty. Closing the queue drops the sender it owns, so once the
//! pushes that are already in flight complete the receiver drains what is left and then observes
//! the disconnection.

use flume::{Receiver, Sender};
use parking_lot::RwLock;
use thiserror::Error;

pub trait QueueItem: Send + 'static {}
impl<T: Send + 'static> QueueItem for T {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError<T> {
    /// The queue was closed, the item is handed back.
    #[error("queue closed")]
    Closed(T),
}

/// A finite-capacity FIFO shared by reference between producers and consumers.
#[derive(Debug)]
pub struct BoundedQueue<T: QueueItem> {
    /// `None` once the queue has been closed.
    sender: RwLock<Option<Sender<T>>>,
    receiver: Receiver<T>,
    capacity: usize,
}

impl<T: QueueItem> BoundedQueue<T> {
    /// Create a new open queue that holds at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: a rendezvous queue would never buffer anything.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedQueue capacity must be positive");
        let (sender, receiver) = flume::bounded(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity,
        }
    }

    /// Push an item at the back of the queue, blocking while the queue is full.
    pub fn push(&self, item: T) -> Result<(), QueueError<T>> {
        // clone out of the lock so a blocked producer doesn't hold back `close`
        let sender = match self.sender.read().as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(QueueError::Closed(item)),
        };
        // the queue owns its receiver, so the channel can't disconnect under us
        sender
            .send(item)
            .map_err(|flume::SendError(item)| QueueError::Closed(item))
    }

    /// Pop the item at the front of the queue, blocking while the queue is empty.
    ///
    /// Returns `None` only after the queue has been closed and every item pushed before the close
    /// has been popped.
    pub fn pop(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Refuse any further push. Calling it more than once has no effect.
    pub fn close(&self) {
        if self.sender.write().take().is_some() {
            trace!("queue of capacity {} closed", self.capacity);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over the items, blocking between them, until the queue is closed and drained.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.pop())
    }
}
