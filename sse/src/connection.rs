use crate::message::Message;
use dashmap::DashMap;
use log::*;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

/// Unique identifier for a subscriber (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of fanning a single message out to the registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that accepted the message into their queue
    pub delivered: usize,
    /// Subscribers whose queue was full; they miss this message
    pub dropped: usize,
    /// Subscribers whose receiver was gone; they were removed from the registry
    pub pruned: usize,
}

/// Registration record for one subscriber
#[derive(Debug)]
struct Subscriber {
    sender: Sender<Message>,
    /// Messages stamped with a lower sequence number were published before this
    /// subscriber registered and are never delivered to it.
    first_sequence: u64,
}

/// Concurrent set of registered subscriber queues, keyed by `SubscriberId`.
///
/// Membership changes and delivery may run concurrently from any task. Delivery
/// never waits on a subscriber: every send is a `try_send`, so one stalled client
/// cannot hold up fan-out to the others.
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a new subscriber queue - O(1)
    ///
    /// `first_sequence` is the sequence number of the first message the subscriber
    /// is eligible to receive.
    pub fn register(&self, sender: Sender<Message>, first_sequence: u64) -> SubscriberId {
        let subscriber_id = SubscriberId::new();
        self.subscribers.insert(
            subscriber_id.clone(),
            Subscriber {
                sender,
                first_sequence,
            },
        );
        subscriber_id
    }

    /// Unregister a subscriber - O(1). Returns `false` when the id was not registered.
    ///
    /// Removing the entry drops the sender, so the subscriber's receiver drains
    /// whatever is already queued and then reports the end of the stream.
    pub fn unregister(&self, subscriber_id: &SubscriberId) -> bool {
        self.subscribers.remove(subscriber_id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, subscriber_id: &SubscriberId) -> bool {
        self.subscribers.contains_key(subscriber_id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Drops every registered sender, which ends all outstanding subscriptions.
    pub fn clear(&self) {
        self.subscribers.clear();
    }

    /// Send a message to every subscriber registered before it was published - O(n)
    pub fn deliver(&self, sequence: u64, message: &Message) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if sequence < subscriber.first_sequence {
                continue;
            }

            match subscriber.sender.try_send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Subscriber {} is not keeping up, dropping message",
                        entry.key()
                    );
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => closed.push(entry.key().clone()),
            }
        }

        // Shard guards from the iteration above must be released before removal.
        for subscriber_id in closed {
            if self.unregister(&subscriber_id) {
                debug!("Pruned closed subscriber {subscriber_id}");
                report.pruned += 1;
            }
        }

        report
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
