use sluice_core::backend::Subscriber;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Channel name → subscribers, holding only weak references.
///
/// A channel entry exists exactly as long as it has at least one
/// subscriber. The boolean results tell the caller when to issue
/// `LISTEN` (channel created) or `UNLISTEN` (channel torn down).
#[derive(Default)]
pub struct ChannelArena {
  channels: HashMap<String, HashMap<u64, Weak<dyn Subscriber>>>,
}

impl ChannelArena {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns `true` when this created the channel.
  pub fn subscribe(&mut self, channel: &str, subscriber: &Arc<dyn Subscriber>) -> bool {
    let created = !self.channels.contains_key(channel);
    self
      .channels
      .entry(channel.to_string())
      .or_default()
      .insert(subscriber.subscriber_id(), Arc::downgrade(subscriber));
    created
  }

  /// Returns `true` when this tore the channel down.
  pub fn unsubscribe(&mut self, channel: &str, subscriber_id: u64) -> bool {
    let Some(subscribers) = self.channels.get_mut(channel) else {
      return false;
    };
    if subscribers.remove(&subscriber_id).is_none() {
      return false;
    }
    if subscribers.is_empty() {
      self.channels.remove(channel);
      return true;
    }
    false
  }

  /// Drop a subscriber from every channel. Returns the channels torn down.
  pub fn remove_subscriber(&mut self, subscriber_id: u64) -> Vec<String> {
    let mut emptied = Vec::new();
    self.channels.retain(|channel, subscribers| {
      subscribers.remove(&subscriber_id);
      if subscribers.is_empty() {
        emptied.push(channel.clone());
        false
      } else {
        true
      }
    });
    emptied
  }

  /// Fan a notification out to the channel's live subscribers.
  ///
  /// Subscribers that are gone are pruned. Returns how many were notified
  /// and whether the channel was torn down as a result.
  pub fn deliver(&mut self, channel: &str, payload: &str) -> (usize, bool) {
    let Some(subscribers) = self.channels.get_mut(channel) else {
      return (0, false);
    };

    let mut delivered = 0;
    subscribers.retain(|_, weak| match weak.upgrade() {
      Some(subscriber) if subscriber.notify(channel, payload) => {
        delivered += 1;
        true
      }
      _ => false,
    });

    if subscribers.is_empty() {
      self.channels.remove(channel);
      return (delivered, true);
    }
    (delivered, false)
  }

  pub fn channels(&self) -> impl Iterator<Item = &str> {
    self.channels.keys().map(String::as_str)
  }

  pub fn subscriber_count(&self, channel: &str) -> usize {
    self.channels.get(channel).map_or(0, HashMap::len)
  }
}
