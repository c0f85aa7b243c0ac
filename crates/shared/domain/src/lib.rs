//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Every storage adapter and the HTTP layer speak in these types.

pub mod constants;
pub mod error;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use user::{CreateUserRequest, NewUser, UpdateUserRequest, User, UserChanges, UserId};
