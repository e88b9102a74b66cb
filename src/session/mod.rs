//! Session issuance, validation and storage.
//!
//! Flow Overview:
//! 1) The OAuth callback hands an [`Identity`] and a [`MembershipState`] to the
//!    [`SessionIssuer`].
//! 2) The issuer writes a serialized [`UserRecord`] under a fresh token into the
//!    injected [`SessionStore`].
//! 3) Protected handlers run the presented token through the
//!    [`SessionValidator`], which only checks that the record is still present.

pub mod issuer;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod validator;

pub use issuer::{IssueError, SessionIssuer};
pub use memory::MemoryStore;
pub use postgres::PgSessionStore;
pub use store::{SessionStore, StoreError};
pub use validator::{SessionValidator, ValidationError};

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

/// Server-side lifetime of a session record.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Lifetime of the cookie that carries a fresh token back to the frontend.
pub const SESSION_COOKIE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Authenticated identity granted access. Stored as the session payload.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
}

/// Identity returned by the identity provider after a successful callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Display name, absent when the user never set one.
    pub name: Option<String>,
    /// Login handle, used for the membership lookup.
    pub login: String,
}

impl Identity {
    /// Name shown to the user, falling back to the login handle.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.login,
        }
    }
}

/// Team membership verdict. Only [`MembershipState::Active`] authorizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipState {
    Active,
    Pending,
    /// The user is not a member of the team.
    Absent,
    /// Any other state reported by the provider, or a failed lookup.
    Unknown(String),
}

impl MembershipState {
    /// Map the provider's `state` string into a verdict.
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        match state {
            "active" => Self::Active,
            "pending" => Self::Pending,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// 128 bits from the OS RNG as 32 lowercase hex characters.
///
/// # Errors
/// Returns the RNG error if the OS entropy source fails.
pub fn random_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; 16];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(format!("{:032x}", u128::from_be_bytes(bytes)))
}
