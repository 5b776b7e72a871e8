use futures::StreamExt;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::change::{ChangeEvent, Table};
use crate::services::change_feed::ChangeFeed;

/// Writers publish on `db_changes:{table}`.
pub const CHANGE_CHANNEL_PREFIX: &str = "db_changes:";
const RELAY_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn channel_for(table: Table) -> String {
    format!("{}{}", CHANGE_CHANNEL_PREFIX, table.as_str())
}

/// Publish a change notification to Redis so every relay forwards it to its
/// local subscribers.
pub async fn publish_change(
    redis_client: &Arc<RedisClient>,
    event: &ChangeEvent,
) -> Result<(), RelayError> {
    let mut conn = redis_client.get_multiplexed_async_connection().await?;

    let channel = channel_for(event.table);
    let message = serde_json::to_string(event)?;

    conn.publish::<_, _, ()>(&channel, message).await?;

    tracing::info!("Published {:?} change on {}", event.kind, channel);
    Ok(())
}

/// Decode one notification payload.
pub fn decode_notification(payload: &str) -> Result<ChangeEvent, RelayError> {
    Ok(serde_json::from_str(payload)?)
}

/// Forward every notification published on `db_changes:*` into `feed`,
/// reconnecting after a fixed delay whenever the Redis connection drops.
pub fn spawn_change_relay(redis_client: Arc<RedisClient>, feed: ChangeFeed) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match relay_changes(&redis_client, &feed).await {
                Ok(()) => tracing::warn!("🔌 Redis change stream ended, reconnecting"),
                Err(e) => tracing::error!("❌ Redis change relay failed: {}", e),
            }
            tokio::time::sleep(RELAY_RETRY_DELAY).await;
        }
    })
}

async fn relay_changes(redis_client: &RedisClient, feed: &ChangeFeed) -> Result<(), RelayError> {
    let conn = redis_client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    let pattern = format!("{}*", CHANGE_CHANNEL_PREFIX);
    pubsub.psubscribe(&pattern).await?;
    tracing::info!("✅ Subscribed to change notifications on {}", pattern);

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload = match msg.get_payload::<String>() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("❌ Unreadable payload on {}: {}", msg.get_channel_name(), e);
                continue;
            }
        };
        match decode_notification(&payload) {
            Ok(event) => {
                let delivered = feed.publish(event);
                tracing::debug!("📥 Relayed change from {} to {} receivers", msg.get_channel_name(), delivered);
            }
            Err(e) => {
                tracing::warn!("Skipping malformed change notification on {}: {}", msg.get_channel_name(), e);
            }
        }
    }

    Ok(())
}
