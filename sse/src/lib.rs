//! Broadcast/subscribe engine behind the chatroom's Server-Sent Events streams.
//!
//! # Architecture
//!
//! - **One intake queue**: every publisher enqueues onto a single bounded queue.
//!   A full queue rejects the publish instead of blocking the caller.
//! - **One dispatch loop**: a background task drains intake in FIFO order and
//!   copies each message into every registered subscriber's own queue.
//! - **DashMap registry**: subscribers register and unregister concurrently with
//!   dispatch; no membership change waits on delivery.
//! - **Bounded per-subscriber queues**: a subscriber that stops reading misses
//!   messages once its queue fills. Delivery is at-most-once with no redelivery.
//! - **Ephemeral messages**: nothing is persisted and late joiners start with the
//!   next message published after they register.
//!
//! # Message Flow
//!
//! 1. A stream handler calls `Broadcaster::subscribe()` and keeps the returned
//!    `Subscription` alive for as long as the client stays connected
//! 2. A publish handler calls `Broadcaster::publish(text)`
//! 3. The dispatch loop delivers the message to every subscriber that was
//!    registered before the publish
//! 4. When the client disconnects the response stream is dropped, which drops the
//!    `Subscription`, which unregisters it
//!
//! # Example
//!
//! ```rust,ignore
//! use sse::{BroadcastOptions, Broadcaster};
//!
//! let broadcaster = Broadcaster::spawn(BroadcastOptions::default());
//! let mut subscription = broadcaster.subscribe();
//!
//! broadcaster.publish("hello")?;
//! assert_eq!(subscription.recv().await.unwrap().as_str(), "hello");
//!
//! broadcaster.shutdown().await;
//! ```
//!
//! # Modules
//!
//! - `broadcaster`: Broadcaster, DispatchLoop and Subscription
//! - `connection`: SubscriberRegistry and type-safe SubscriberId
//! - `message`: the shared text payload
//! - `error`: publish failures

pub mod broadcaster;
pub mod connection;
pub mod error;
pub mod message;

pub use broadcaster::{BroadcastOptions, Broadcaster, DispatchLoop, Subscription};
pub use connection::SubscriberId;
pub use error::Error;
pub use message::Message;
