//! Push fan-out of change events to authorized subscribers.
//!
//! Events flow service -> redis channel -> psub listener -> in-process
//! registry -> subscriber receivers. Delivery is at-least-once and
//! unordered across topics; within one conversation channel redis
//! preserves publish order. Subscribers must treat events as re-fetch
//! triggers and reconcile fully on reconnect.

pub mod events;
pub mod pubsub;
pub mod registry;
pub mod session;

pub use events::ChangeEvent;
pub use registry::{SubscriberRegistry, Topic};
pub use session::ChatSession;

use sqlx::{Pool, Postgres};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::conversation_service::ConversationService;

#[derive(Clone)]
pub struct RealtimeBus {
    client: redis::Client,
    registry: SubscriberRegistry,
}

impl RealtimeBus {
    pub fn new(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            registry: SubscriberRegistry::new(),
        })
    }

    /// Spawn the redis -> registry bridge. Call once per process. No
    /// automatic reconnect: when the returned task finishes, the caller
    /// re-subscribes and reconciles, with the periodic poll covering the
    /// gap until it does.
    pub fn start(&self) -> JoinHandle<redis::RedisResult<()>> {
        let client = self.client.clone();
        let registry = self.registry.clone();
        tokio::spawn(pubsub::start_psub_listener(client, registry))
    }

    /// Subscribe to a topic, scoped so a subscriber only receives events
    /// it is authorized to see: a conversation channel requires
    /// participation, a user channel requires being that user or sharing
    /// at least one conversation with them.
    pub async fn subscribe(
        &self,
        db: &Pool<Postgres>,
        topic: Topic,
        subscriber_id: Uuid,
    ) -> AppResult<UnboundedReceiver<ChangeEvent>> {
        let authorized = match topic {
            Topic::Conversation(conversation_id) => {
                ConversationService::is_participant(db, conversation_id, subscriber_id).await?
            }
            Topic::User(user_id) => {
                user_id == subscriber_id
                    || ConversationService::share_conversation(db, user_id, subscriber_id).await?
            }
        };
        if !authorized {
            return Err(AppError::Forbidden);
        }
        Ok(self.registry.add_subscriber(topic).await)
    }

    /// Publish an event on a topic. Failures are logged, not bubbled: the
    /// mutation already committed, and the safety-net poll reconciles any
    /// subscriber that missed the push.
    pub async fn publish(&self, topic: Topic, event: &ChangeEvent) {
        if let Err(e) = pubsub::publish(&self.client, topic, event).await {
            tracing::warn!(
                "failed to publish {} on {}: {}",
                event.event_type(),
                topic.channel(),
                e
            );
        }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }
}
