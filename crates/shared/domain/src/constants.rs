//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Identity
// =============================================================================

/// Smallest identifier a store may assign
pub const MIN_USER_ID: i64 = 1;

/// Check if an identifier could belong to a stored user
pub fn is_valid_user_id(id: i64) -> bool {
    id >= MIN_USER_ID
}

// =============================================================================
// Validation messages
// =============================================================================

pub const MSG_NAME_REQUIRED: &str = "name is required";

pub const MSG_EMAIL_REQUIRED: &str = "email is required";

pub const MSG_EMAIL_INVALID: &str = "email must be a valid email address";

pub const MSG_INVALID_USER_ID: &str = "invalid user ID";
