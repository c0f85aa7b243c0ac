//! User caching: the Redis adapter and the opt-in cache-aside decorator.

mod cached_repository;
mod user_cache;

pub use cached_repository::CachedUserRepository;
pub use user_cache::{user_key, RedisUserCache, UserCache, CACHE_KEY_ALL_USERS, CACHE_PREFIX_USER};

#[cfg(any(test, feature = "test-utils"))]
pub use user_cache::MockUserCache;
