//! User domain entity and related types.

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::constants::{MSG_EMAIL_INVALID, MSG_EMAIL_REQUIRED, MSG_NAME_REQUIRED};
use crate::error::{DomainError, DomainResult};

/// Store-assigned user identifier
pub type UserId = i64;

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    /// Unique user identifier
    #[cfg_attr(feature = "openapi", schema(example = 1))]
    pub id: UserId,
    /// User display name
    #[cfg_attr(feature = "openapi", schema(example = "Ann"))]
    pub name: String,
    /// User email address
    #[cfg_attr(feature = "openapi", schema(example = "ann@example.com"))]
    pub email: String,
}

impl User {
    /// Attach a store-assigned identifier to validated input
    pub fn from_new(id: UserId, new_user: NewUser) -> Self {
        Self {
            id,
            name: new_user.name,
            email: new_user.email,
        }
    }

    /// Merge a partial update into this user. Absent fields are left untouched.
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
    }
}

/// Validated user data ready to be persisted (no identity yet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Validated partial update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    /// True when the update would not touch any field
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// User creation data transfer object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateUserRequest {
    /// User display name
    #[cfg_attr(feature = "openapi", schema(example = "Ann"))]
    #[serde(default)]
    pub name: String,
    /// User email address
    #[cfg_attr(feature = "openapi", schema(example = "ann@example.com"))]
    #[serde(default)]
    pub email: String,
}

impl CreateUserRequest {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Validate the request and turn it into persistable data.
    pub fn validate(self) -> DomainResult<NewUser> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(MSG_NAME_REQUIRED));
        }
        if self.email.trim().is_empty() {
            return Err(DomainError::validation(MSG_EMAIL_REQUIRED));
        }
        if !self.email.validate_email() {
            return Err(DomainError::validation(MSG_EMAIL_INVALID));
        }

        Ok(NewUser {
            name: self.name,
            email: self.email,
        })
    }
}

/// User update data transfer object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateUserRequest {
    /// New display name
    #[cfg_attr(feature = "openapi", schema(example = "Annie"))]
    pub name: Option<String>,
    /// New email address
    #[cfg_attr(feature = "openapi", schema(example = "annie@example.com"))]
    pub email: Option<String>,
}

impl UpdateUserRequest {
    /// Validate the request. Empty strings count as "not provided".
    pub fn validate(self) -> DomainResult<UserChanges> {
        let name = self.name.filter(|name| !name.trim().is_empty());
        let email = self.email.filter(|email| !email.trim().is_empty());

        if let Some(ref email) = email {
            if !email.validate_email() {
                return Err(DomainError::validation(MSG_EMAIL_INVALID));
            }
        }

        Ok(UserChanges { name, email })
    }
}
