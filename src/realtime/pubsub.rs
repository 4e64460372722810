use redis::AsyncCommands;
use redis::Client;

use crate::realtime::events::ChangeEvent;
use crate::realtime::registry::{SubscriberRegistry, Topic};

pub async fn publish(client: &Client, topic: Topic, event: &ChangeEvent) -> redis::RedisResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(topic.channel(), event.to_payload())
        .await
}

/// Bridge redis pub/sub into the in-process registry. Runs until the
/// connection drops; the caller decides whether to restart it (the
/// reconciliation poll covers the gap either way).
pub async fn start_psub_listener(
    client: Client,
    registry: SubscriberRegistry,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not multiplexed
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("conversation:*").await?;
    pubsub.psubscribe("user:*").await?;
    let mut stream = pubsub.on_message();
    use futures_util::StreamExt;
    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let payload: String = msg.get_payload()?;
        let Some(topic) = Topic::parse(&channel) else {
            continue;
        };
        match ChangeEvent::from_payload(&payload) {
            Some(event) => registry.broadcast(topic, &event).await,
            None => {
                tracing::warn!("dropping unparseable event on {}", channel);
            }
        }
    }
    Ok(())
}
