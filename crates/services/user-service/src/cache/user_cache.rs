//! Redis cache for user entities.

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use common::AppResult;
use domain::{User, UserId};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Attempts after the first failed connect
const CONNECT_RETRIES: usize = 1;

/// Per-attempt connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Cache key prefix for single users
pub const CACHE_PREFIX_USER: &str = "user:";

/// Cache key for the full user list
pub const CACHE_KEY_ALL_USERS: &str = "users:all";

/// Cache key for one user
pub fn user_key(id: UserId) -> String {
    format!("{}{}", CACHE_PREFIX_USER, id)
}

/// Decode a stored JSON value. `None` is a miss.
fn decode<T: DeserializeOwned>(raw: Option<Vec<u8>>) -> AppResult<Option<T>> {
    match raw {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Key-value cache for users and the user list.
///
/// `get_*` returns `Ok(None)` on a miss. An unreachable cache is
/// `AppError::Cache`, an undecodable entry is `AppError::Serialization`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;

    async fn set_user(&self, user: &User, ttl: Duration) -> AppResult<()>;

    async fn delete_user(&self, id: UserId) -> AppResult<()>;

    async fn get_users(&self) -> AppResult<Option<Vec<User>>>;

    async fn set_users(&self, users: &[User], ttl: Duration) -> AppResult<()>;

    async fn delete_users(&self) -> AppResult<()>;
}

/// Redis cache wrapper.
#[derive(Clone)]
pub struct RedisUserCache {
    conn: ConnectionManager,
}

impl RedisUserCache {
    /// Connect to Redis. An unreachable server is `AppError::Cache`.
    pub async fn connect(url: &str) -> AppResult<Self> {
        debug!("Connecting to Redis");
        let client = redis::Client::open(url)?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_connection_timeout(CONNECT_TIMEOUT);
        let conn = ConnectionManager::new_with_config(client, config).await?;
        Ok(Self { conn })
    }

    /// Round-trip a PING to confirm the server is reachable.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    // =========================================================================
    // Generic Cache Operations
    // =========================================================================

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        // Raw bytes, so a bad payload is reported as such rather than as an outage
        let raw = conn.get::<_, Option<Vec<u8>>>(key).await.map_err(|e| {
            warn!("Redis get error for key {}: {}", key, e);
            e
        })?;

        decode(raw)
    }

    async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(value)?;
        // SETEX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(|e| {
                warn!("Redis set error for key {}: {}", key, e);
                e
            })?;
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(|e| {
            warn!("Redis delete error for key {}: {}", key, e);
            e
        })?;
        Ok(())
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.get_json(&user_key(id)).await
    }

    async fn set_user(&self, user: &User, ttl: Duration) -> AppResult<()> {
        self.set_json(&user_key(user.id), user, ttl).await
    }

    async fn delete_user(&self, id: UserId) -> AppResult<()> {
        self.delete_key(&user_key(id)).await
    }

    async fn get_users(&self) -> AppResult<Option<Vec<User>>> {
        self.get_json(CACHE_KEY_ALL_USERS).await
    }

    async fn set_users(&self, users: &[User], ttl: Duration) -> AppResult<()> {
        self.set_json(CACHE_KEY_ALL_USERS, users, ttl).await
    }

    async fn delete_users(&self) -> AppResult<()> {
        self.delete_key(CACHE_KEY_ALL_USERS).await
    }
}
