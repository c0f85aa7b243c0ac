//! User service - Handles user-related business logic.
//!
//! Validates caller input, then delegates to whichever repository was
//! selected at startup. Repository errors are passed through untouched.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::{
    is_valid_user_id, CreateUserRequest, UpdateUserRequest, User, UserId, MSG_INVALID_USER_ID,
};

use crate::repository::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a new user
    async fn create_user(&self, request: CreateUserRequest) -> AppResult<User>;

    /// Get user by ID
    async fn get_user(&self, id: UserId) -> AppResult<User>;

    /// List all users
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Apply a partial update
    async fn update_user(&self, id: UserId, request: UpdateUserRequest) -> AppResult<User>;

    /// Delete user
    async fn delete_user(&self, id: UserId) -> AppResult<()>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

fn ensure_valid_id(id: UserId) -> AppResult<()> {
    if is_valid_user_id(id) {
        Ok(())
    } else {
        Err(AppError::validation(MSG_INVALID_USER_ID))
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create_user(&self, request: CreateUserRequest) -> AppResult<User> {
        let new_user = request.validate()?;
        let user = self.repo.create(new_user).await?;
        tracing::debug!(user_id = user.id, "User created");
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> AppResult<User> {
        ensure_valid_id(id)?;
        self.repo.get_by_id(id).await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repo.get_all().await
    }

    async fn update_user(&self, id: UserId, request: UpdateUserRequest) -> AppResult<User> {
        ensure_valid_id(id)?;
        let changes = request.validate()?;
        self.repo.update(id, changes).await
    }

    async fn delete_user(&self, id: UserId) -> AppResult<()> {
        ensure_valid_id(id)?;
        self.repo.delete(id).await?;
        tracing::debug!(user_id = id, "User deleted");
        Ok(())
    }
}
