use crate::connection::{SubscriberId, SubscriberRegistry};
use crate::error::Error;
use crate::message::Message;
use log::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default number of published messages that may wait for dispatch.
pub const DEFAULT_INTAKE_CAPACITY: usize = 100;

/// Default number of dispatched messages a single subscriber may have queued
/// before further messages are dropped for it.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOptions {
    pub intake_capacity: usize,
    pub subscriber_capacity: usize,
}

impl BroadcastOptions {
    pub fn new(intake_capacity: usize, subscriber_capacity: usize) -> Self {
        // Tokio channels cannot be created with a zero capacity.
        Self {
            intake_capacity: intake_capacity.max(1),
            subscriber_capacity: subscriber_capacity.max(1),
        }
    }
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self::new(DEFAULT_INTAKE_CAPACITY, DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

/// A published message stamped with its position in publish order.
#[derive(Debug)]
struct Envelope {
    sequence: u64,
    message: Message,
}

/// Process-wide fan-out of chat messages to every registered subscriber.
///
/// Publishers enqueue onto a bounded intake queue; a single [`DispatchLoop`] drains
/// it in FIFO order and copies each message into every subscriber's own bounded
/// queue.
///
/// Delivery semantics are at-most-once:
/// - `publish` never waits. A full intake queue rejects the message with
///   [`Error::IntakeFull`].
/// - Dispatch never waits on a subscriber. If a subscriber's queue is full, that
///   subscriber misses the message and everyone else still receives it.
/// - Subscribers only see messages published after they registered.
pub struct Broadcaster {
    intake: mpsc::Sender<Envelope>,
    registry: Arc<SubscriberRegistry>,
    subscriber_capacity: usize,
    next_sequence: AtomicU64,
    running: AtomicBool,
    stop: watch::Sender<bool>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Broadcaster {
    /// Creates a broadcaster together with the dispatch loop that drives it.
    ///
    /// Nothing is delivered until the returned [`DispatchLoop`] is run. Most callers
    /// want [`Broadcaster::spawn`] instead.
    pub fn new(options: BroadcastOptions) -> (Self, DispatchLoop) {
        let options = BroadcastOptions::new(options.intake_capacity, options.subscriber_capacity);
        let (intake, intake_rx) = mpsc::channel(options.intake_capacity);
        let (stop, stop_rx) = watch::channel(false);
        let registry = Arc::new(SubscriberRegistry::new());

        let broadcaster = Self {
            intake,
            registry: Arc::clone(&registry),
            subscriber_capacity: options.subscriber_capacity,
            next_sequence: AtomicU64::new(0),
            running: AtomicBool::new(true),
            stop,
            dispatch_handle: Mutex::new(None),
        };

        let dispatch = DispatchLoop {
            intake: intake_rx,
            registry,
            stop: stop_rx,
        };

        (broadcaster, dispatch)
    }

    /// Creates a broadcaster and runs its dispatch loop on the current Tokio runtime.
    pub fn spawn(options: BroadcastOptions) -> Self {
        let (broadcaster, dispatch) = Self::new(options);
        let handle = tokio::spawn(dispatch.run());
        broadcaster.set_dispatch_handle(handle);
        broadcaster
    }

    /// Accepts `message` for dispatch to every currently registered subscriber.
    ///
    /// Succeeds once the message is in the intake queue, whether or not anyone is
    /// subscribed. Never blocks.
    pub fn publish(&self, message: impl Into<Message>) -> Result<(), Error> {
        if !self.is_running() {
            return Err(Error::Closed);
        }

        let envelope = Envelope {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            message: message.into(),
        };

        match self.intake.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(envelope)) => {
                warn!(
                    "Broadcast intake is full, rejecting message #{}",
                    envelope.sequence
                );
                Err(Error::IntakeFull)
            }
            Err(TrySendError::Closed(_)) => Err(Error::Closed),
        }
    }

    /// Registers a new subscriber and returns its private message queue.
    ///
    /// Dropping the returned [`Subscription`] unregisters it. After shutdown the
    /// subscription is returned already closed.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.subscriber_capacity);
        let first_sequence = self.next_sequence.load(Ordering::SeqCst);
        let id = self.registry.register(sender, first_sequence);

        // A shutdown racing with this registration may already have cleared the
        // registry, so check again now that the entry is in.
        if !self.is_running() {
            self.registry.unregister(&id);
        } else {
            debug!("Registered subscriber {id}");
        }

        Subscription {
            id,
            receiver,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Removes a subscriber. Unknown or already removed ids are ignored.
    ///
    /// Returns `true` if the subscriber was registered. Its queue still yields the
    /// messages already delivered to it, then ends.
    pub fn unsubscribe(&self, subscriber_id: &SubscriberId) -> bool {
        let removed = self.registry.unregister(subscriber_id);
        if removed {
            debug!("Unregistered subscriber {subscriber_id}");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops dispatch and closes every open subscription.
    ///
    /// Messages still waiting in intake are dropped. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Broadcaster already shut down");
            return;
        }

        info!(
            "Shutting down broadcaster with {} registered subscriber(s)",
            self.registry.len()
        );

        // Fails only when the dispatch loop is already gone, which is fine.
        let _ = self.stop.send(true);

        let handle = match self.dispatch_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Dispatch loop terminated abnormally: {e}");
            }
        }

        self.registry.clear();
    }

    fn set_dispatch_handle(&self, handle: JoinHandle<()>) {
        match self.dispatch_handle.lock() {
            Ok(mut guard) => *guard = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.stop.send(true);
        self.registry.clear();
    }
}

/// The single consumer of the intake queue.
#[must_use = "messages are only delivered while the dispatch loop runs"]
pub struct DispatchLoop {
    intake: mpsc::Receiver<Envelope>,
    registry: Arc<SubscriberRegistry>,
    stop: watch::Receiver<bool>,
}

impl DispatchLoop {
    /// Runs until the broadcaster shuts down or is dropped.
    pub async fn run(mut self) {
        debug!("Dispatch loop started");

        loop {
            tokio::select! {
                biased;

                // Err means the broadcaster itself is gone.
                _ = self.stop.changed() => break,

                next = self.intake.recv() => match next {
                    Some(Envelope { sequence, message }) => {
                        let report = self.registry.deliver(sequence, &message);
                        trace!(
                            "Dispatched message #{sequence}: delivered={}, dropped={}, pruned={}",
                            report.delivered,
                            report.dropped,
                            report.pruned
                        );
                    }
                    None => break,
                },
            }
        }

        debug!("Dispatch loop stopped");
    }
}

/// One listener's private queue of dispatched messages.
///
/// The subscription stays registered for as long as it is alive; dropping it
/// unregisters it, so a connection that ends for any reason cleans up after itself.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Message>,
    registry: Arc<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Waits for the next message. Returns `None` once the subscription has been
    /// unregistered or the broadcaster has shut down, after any queued messages.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Returns the next queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.unregister(&self.id) {
            debug!("Subscriber {} dropped, unregistered", self.id);
        }
    }
}
