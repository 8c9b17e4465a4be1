//! Live broadcast channel: fan-out of newly accepted samples to every
//! currently connected subscriber.
//!
//! Built on [`tokio::sync::broadcast`]. Publishing never blocks and never
//! waits for subscribers; late joiners see only events published after they
//! subscribed. Nothing is persisted here; durability lives in the store.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
#[cfg(test)]
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::sample::Sample;

/// An event delivered to subscribers, serialised as
/// `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
  /// Liveness acknowledgement sent by transports when a subscriber connects.
  Connected,
  /// One sample accepted by a single submission.
  NewSample(Sample),
  /// The samples newly inserted by one batch submission.
  NewSamples(Vec<Sample>),
}

/// Publish/subscribe hub shared by the ingest pipeline and transports.
pub struct LiveChannel {
  sender:  broadcast::Sender<LiveEvent>,
  next_id: AtomicU64,
}

impl LiveChannel {
  /// `capacity` bounds how far a slow subscriber may fall behind before it
  /// starts missing events.
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    Self { sender, next_id: AtomicU64::new(1) }
  }

  pub fn subscribe(&self) -> Subscription {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    debug!(subscriber = id, "live subscriber added");
    Subscription { id, receiver: self.sender.subscribe() }
  }

  pub fn unsubscribe(&self, subscription: Subscription) {
    debug!(subscriber = subscription.id, "live subscriber removed");
    drop(subscription);
  }

  /// Deliver `event` to every current subscriber. Returns how many were
  /// reached; zero when nobody is connected.
  pub fn publish(&self, event: LiveEvent) -> usize {
    self.sender.send(event).unwrap_or(0)
  }

  pub fn subscriber_count(&self) -> usize { self.sender.receiver_count() }
}

impl Default for LiveChannel {
  fn default() -> Self { Self::new(256) }
}

/// Handle held by one subscriber. Dropping it unsubscribes.
pub struct Subscription {
  id:       u64,
  receiver: broadcast::Receiver<LiveEvent>,
}

impl Subscription {
  pub fn id(&self) -> u64 { self.id }

  /// Wait for the next event. Returns `None` once the channel is gone.
  ///
  /// A subscriber that falls more than `capacity` events behind skips the
  /// overflow and continues with the oldest retained event.
  pub async fn recv(&mut self) -> Option<LiveEvent> {
    loop {
      match self.receiver.recv().await {
        Ok(event) => return Some(event),
        Err(RecvError::Lagged(skipped)) => {
          warn!(subscriber = self.id, skipped, "live subscriber lagged");
        }
        Err(RecvError::Closed) => return None,
      }
    }
  }

  /// Next already-published event, without waiting.
  #[cfg(test)]
  pub(crate) fn try_recv(&mut self) -> Option<LiveEvent> {
    loop {
      match self.receiver.try_recv() {
        Ok(event) => return Some(event),
        Err(TryRecvError::Lagged(skipped)) => {
          warn!(subscriber = self.id, skipped, "live subscriber lagged");
        }
        Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
      }
    }
  }
}
