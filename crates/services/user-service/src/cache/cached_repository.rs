//! Cache-aside decorator over any [`UserRepository`].
//!
//! Reads check the cache first and populate it after a store hit. Writes go
//! to the store, then refresh or drop the affected keys. Writes made to the
//! store by anyone else stay invisible until the entry's TTL runs out.
//!
//! A failing cache never fails a request: the error is logged as a cache
//! outage (distinct from a miss) and the store is used directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use common::{AppError, AppResult};
use domain::{NewUser, User, UserChanges, UserId};

use super::UserCache;
use crate::repository::UserRepository;

/// Repository decorator implementing cache-aside reads.
pub struct CachedUserRepository {
    inner: Arc<dyn UserRepository>,
    cache: Arc<dyn UserCache>,
    ttl: Duration,
}

impl CachedUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>, cache: Arc<dyn UserCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

fn log_cache_outage(operation: &str, err: &AppError) {
    warn!(operation, error = %err, "Cache unavailable, continuing without it");
}

#[async_trait]
impl UserRepository for CachedUserRepository {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let user = self.inner.create(new_user).await?;

        if let Err(e) = self.cache.delete_users().await {
            log_cache_outage("delete_users", &e);
        }

        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> AppResult<User> {
        match self.cache.get_user(id).await {
            Ok(Some(user)) => {
                debug!(user_id = id, "User cache hit");
                return Ok(user);
            }
            Ok(None) => debug!(user_id = id, "User cache miss"),
            Err(e) => log_cache_outage("get_user", &e),
        }

        let user = self.inner.get_by_id(id).await?;

        if let Err(e) = self.cache.set_user(&user, self.ttl).await {
            log_cache_outage("set_user", &e);
        }

        Ok(user)
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        match self.cache.get_users().await {
            Ok(Some(users)) => {
                debug!("User list cache hit");
                return Ok(users);
            }
            Ok(None) => debug!("User list cache miss"),
            Err(e) => log_cache_outage("get_users", &e),
        }

        let users = self.inner.get_all().await?;

        if let Err(e) = self.cache.set_users(&users, self.ttl).await {
            log_cache_outage("set_users", &e);
        }

        Ok(users)
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> AppResult<User> {
        let user = self.inner.update(id, changes).await?;

        if let Err(e) = self.cache.set_user(&user, self.ttl).await {
            log_cache_outage("set_user", &e);
        }
        if let Err(e) = self.cache.delete_users().await {
            log_cache_outage("delete_users", &e);
        }

        Ok(user)
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        self.inner.delete(id).await?;

        if let Err(e) = self.cache.delete_user(id).await {
            log_cache_outage("delete_user", &e);
        }
        if let Err(e) = self.cache.delete_users().await {
            log_cache_outage("delete_users", &e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use redis::{ErrorKind, RedisError};

    use super::*;
    use crate::cache::MockUserCache;
    use crate::repository::{MemoryUserStore, MockUserRepository};

    const TTL: Duration = Duration::from_secs(60);

    fn ann() -> User {
        User {
            id: 1,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
        }
    }

    fn cache_down() -> AppError {
        AppError::Cache(RedisError::from((ErrorKind::IoError, "connection refused")))
    }

    fn decorate(repo: impl UserRepository + 'static, cache: MockUserCache) -> CachedUserRepository {
        CachedUserRepository::new(Arc::new(repo), Arc::new(cache), TTL)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_store() {
        let mut cache = MockUserCache::new();
        cache
            .expect_get_user()
            .with(eq(1))
            .returning(|_| Ok(Some(ann())));
        cache.expect_set_user().never();

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id().never();

        let user = decorate(repo, cache).get_by_id(1).await.unwrap();

        assert_eq!(user, ann());
    }

    #[tokio::test]
    async fn test_cache_miss_reads_store_and_populates() {
        let mut cache = MockUserCache::new();
        cache.expect_get_user().returning(|_| Ok(None));
        cache
            .expect_set_user()
            .withf(|user, ttl| user.id == 1 && *ttl == TTL)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(ann()));

        let user = decorate(repo, cache).get_by_id(1).await.unwrap();

        assert_eq!(user.name, "Ann");
    }

    #[tokio::test]
    async fn test_cache_outage_falls_back_to_store() {
        let mut cache = MockUserCache::new();
        cache.expect_get_user().returning(|_| Err(cache_down()));
        cache.expect_set_user().returning(|_, _| Err(cache_down()));

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id().times(1).returning(|_| Ok(ann()));

        let result = decorate(repo, cache).get_by_id(1).await;

        assert_eq!(result.unwrap(), ann());
    }

    #[tokio::test]
    async fn test_store_not_found_is_not_cached() {
        let mut cache = MockUserCache::new();
        cache.expect_get_user().returning(|_| Ok(None));
        cache.expect_set_user().never();

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id().returning(|_| Err(AppError::NotFound));

        let result = decorate(repo, cache).get_by_id(5).await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_miss_populates_list_key() {
        let mut cache = MockUserCache::new();
        cache.expect_get_users().returning(|| Ok(None));
        cache
            .expect_set_users()
            .withf(|users, _| users.len() == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut repo = MockUserRepository::new();
        repo.expect_get_all().returning(|| Ok(vec![ann()]));

        let users = decorate(repo, cache).get_all().await.unwrap();

        assert_eq!(users, vec![ann()]);
    }

    #[tokio::test]
    async fn test_writes_refresh_entry_and_drop_list() {
        let mut cache = MockUserCache::new();
        cache.expect_delete_users().times(3).returning(|| Ok(()));
        cache
            .expect_set_user()
            .withf(|user, _| user.name == "Annie")
            .times(1)
            .returning(|_, _| Ok(()));
        cache
            .expect_delete_user()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));

        let repo = decorate(MemoryUserStore::new(), cache);

        let created = repo
            .create(NewUser {
                name: "Ann".to_string(),
                email: "ann@x.com".to_string(),
            })
            .await
            .unwrap();
        repo.update(
            created.id,
            UserChanges {
                name: Some("Annie".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();
        repo.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_alone() {
        let mut cache = MockUserCache::new();
        cache.expect_delete_user().never();
        cache.expect_delete_users().never();

        let repo = decorate(MemoryUserStore::new(), cache);

        assert!(matches!(repo.delete(99).await, Err(AppError::NotFound)));
    }
}
