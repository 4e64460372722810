use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use crate::realtime::events::ChangeEvent;

/// A fan-out channel. Conversation topics carry message events for one
/// thread; user topics carry presence, block and badge-refresh events
/// for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Conversation(Uuid),
    User(Uuid),
}

impl Topic {
    /// Redis channel name for this topic.
    pub fn channel(&self) -> String {
        match self {
            Topic::Conversation(id) => format!("conversation:{}", id),
            Topic::User(id) => format!("user:{}", id),
        }
    }

    /// Parse a channel name back into a topic. Accepts a trailing
    /// `:<suffix>` after the uuid.
    pub fn parse(channel: &str) -> Option<Topic> {
        let (prefix, rest) = channel.split_once(':')?;
        let id_part = rest.split(':').next().unwrap_or(rest);
        let id = Uuid::parse_str(id_part).ok()?;
        match prefix {
            "conversation" => Some(Topic::Conversation(id)),
            "user" => Some(Topic::User(id)),
            _ => None,
        }
    }
}

/// In-process subscriber map: topic -> list of channel senders.
#[derive(Default, Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RwLock<HashMap<Topic, Vec<UnboundedSender<ChangeEvent>>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_subscriber(&self, topic: Topic) -> UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.inner.write().await;
        guard.entry(topic).or_default().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber of the topic, dropping
    /// senders whose receiver side has gone away.
    pub async fn broadcast(&self, topic: Topic, event: &ChangeEvent) {
        let mut guard = self.inner.write().await;
        let mut drained = false;
        if let Some(list) = guard.get_mut(&topic) {
            list.retain(|sender| sender.send(event.clone()).is_ok());
            drained = list.is_empty();
        }
        if drained {
            guard.remove(&topic);
        }
    }

    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        let guard = self.inner.read().await;
        guard.get(&topic).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_round_trip_through_channel_names() {
        let id = Uuid::new_v4();
        let topic = Topic::Conversation(id);
        assert_eq!(Topic::parse(&topic.channel()), Some(topic));

        let topic = Topic::User(id);
        assert_eq!(Topic::parse(&topic.channel()), Some(topic));

        assert_eq!(Topic::parse("listing:42"), None);
        assert_eq!(Topic::parse("conversation:not-a-uuid"), None);
        // suffixed channels still resolve
        assert_eq!(
            Topic::parse(&format!("conversation:{}:reads", id)),
            Some(Topic::Conversation(id))
        );
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let registry = SubscriberRegistry::new();
        let topic = Topic::Conversation(Uuid::new_v4());
        let mut rx1 = registry.add_subscriber(topic).await;
        let mut rx2 = registry.add_subscriber(topic).await;

        let event = ChangeEvent::MessageNew {
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
        };
        registry.broadcast(topic, &event).await;

        assert_eq!(rx1.recv().await, Some(event.clone()));
        assert_eq!(rx2.recv().await, Some(event));
    }

    #[tokio::test]
    async fn broadcast_is_scoped_to_the_topic() {
        let registry = SubscriberRegistry::new();
        let watched = Topic::Conversation(Uuid::new_v4());
        let other = Topic::Conversation(Uuid::new_v4());
        let mut rx = registry.add_subscriber(watched).await;

        let event = ChangeEvent::MessageNew {
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
        };
        registry.broadcast(other, &event).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_subscribers_are_pruned_on_broadcast() {
        let registry = SubscriberRegistry::new();
        let topic = Topic::User(Uuid::new_v4());
        let rx = registry.add_subscriber(topic).await;
        drop(rx);

        let event = ChangeEvent::BlockChanged {
            blocker_id: Uuid::new_v4(),
            blocked_id: Uuid::new_v4(),
            blocked: true,
        };
        registry.broadcast(topic, &event).await;

        assert_eq!(registry.subscriber_count(topic).await, 0);
    }
}
