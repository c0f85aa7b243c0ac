//! Storage-independent user repository contract.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use common::{AppError, AppResult};
use domain::{NewUser, User, UserChanges, UserId};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fixed deadline applied to every call into an external store.
pub const STORE_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// User repository trait for dependency injection.
///
/// Implementations translate their store's "no such record" condition into
/// [`AppError::NotFound`]; every other store failure surfaces as an IO-class
/// error without retry.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Assign an identity and persist a new user
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// Find user by ID, `NotFound` if absent
    async fn get_by_id(&self, id: UserId) -> AppResult<User>;

    /// List all users ordered by ID (empty when the store is empty)
    async fn get_all(&self) -> AppResult<Vec<User>>;

    /// Merge the present fields of `changes` into an existing user
    async fn update(&self, id: UserId, changes: UserChanges) -> AppResult<User>;

    /// Remove a user, `NotFound` if absent
    async fn delete(&self, id: UserId) -> AppResult<()>;
}

/// Run a store operation under [`STORE_OPERATION_TIMEOUT`].
pub async fn with_deadline<T, F>(operation: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(STORE_OPERATION_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, "Store operation exceeded deadline");
            Err(AppError::timeout(operation))
        }
    }
}
