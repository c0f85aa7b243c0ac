//! Repository layer for data access.
//!
//! One trait, three adapters. Which adapter is live is decided once at
//! startup by [`crate::backend`].

pub mod entities;
mod memory;
mod mongo;
mod postgres;
mod user_repository;

pub use memory::MemoryUserStore;
pub use mongo::MongoUserStore;
pub use postgres::PostgresUserStore;
pub use user_repository::{with_deadline, UserRepository, STORE_OPERATION_TIMEOUT};

#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
