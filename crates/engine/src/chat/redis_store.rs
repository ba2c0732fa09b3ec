use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::store::{StoreError, StoreFuture, TranscriptStore};

/// Redis-backed transcript store. One string value per session key.
pub struct RedisTranscriptStore {
    conn: MultiplexedConnection,
}

impl RedisTranscriptStore {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        tracing::info!("Connecting to Redis");

        let client =
            redis::Client::open(redis_url).map_err(|e| StoreError::Connection(e.to_string()))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { conn };
        store.health_check().await?;
        tracing::info!("Redis connection established");

        Ok(store)
    }

    /// Verify the connection is alive (PING).
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;

        if pong != "PONG" {
            return Err(StoreError::Command(format!(
                "Unexpected PING response: {}",
                pong
            )));
        }
        Ok(())
    }
}

impl TranscriptStore for RedisTranscriptStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            conn.get::<_, Option<String>>(key)
                .await
                .map_err(|e| StoreError::Command(e.to_string()))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            conn.set::<_, _, ()>(key, value)
                .await
                .map_err(|e| StoreError::Command(e.to_string()))
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            conn.del::<_, ()>(key)
                .await
                .map_err(|e| StoreError::Command(e.to_string()))
        })
    }
}
