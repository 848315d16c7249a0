//! Redis-backed locality store.

use crate::kvcache::error::Result;
use crate::kvcache::store::KeyValueStore;
use redis::aio::ConnectionManager;
use tracing::info;

/// Redis store answering batch lookups with a single `MGET`.
///
/// The connection manager reconnects on its own; it is cloned per request
/// since `query_async` needs a mutable connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis and verify the server answers `PING`.
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server is unreachable
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;

        info!("Connected to Redis locality store at {}", redis_url);
        Ok(Self { conn })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut conn = self.conn.clone();
        let values = redis::cmd("MGET")
            .arg(keys)
            .query_async::<_, Vec<Option<Vec<u8>>>>(&mut conn)
            .await?;
        Ok(values)
    }
}
