//! In-memory user repository.
//!
//! State lives for the lifetime of the process only.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{AppResult, OptionExt};
use domain::{NewUser, User, UserChanges, UserId, MIN_USER_ID};

use super::UserRepository;

struct Inner {
    users: BTreeMap<UserId, User>,
    next_id: UserId,
}

/// Process-local store guarded by a single reader/writer lock.
///
/// Reads share the lock; create, update and delete take it exclusively,
/// so id allocation is serialised with the insert it belongs to.
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    /// Create an empty store. The first assigned id is 1.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                users: BTreeMap::new(),
                next_id: MIN_USER_ID,
            }),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;

        let id = inner.next_id;
        inner.next_id += 1;

        let user = User::from_new(id, new_user);
        inner.users.insert(id, user.clone());

        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner.users.get(&id).cloned().ok_or_not_found()
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().cloned().collect())
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> AppResult<User> {
        let mut inner = self.inner.write().await;

        let user = inner.users.get_mut(&id).ok_or_not_found()?;
        user.apply(changes);

        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.users.remove(&id).map(|_| ()).ok_or_not_found()
    }
}
