//! The identity a cart and its persisted state are scoped to.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// The identity namespace for client-side state.
///
/// Carts, recently-viewed lists, and other per-user local state are keyed by
/// the active identity, including an anonymous guest namespace used before
/// sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Identity {
    /// No authenticated session; state lives in the shared guest namespace.
    #[default]
    Guest,

    /// An authenticated user.
    User(UserId),
}

impl Identity {
    /// Returns the storage key suffix for this identity.
    pub fn storage_suffix(&self) -> String {
        match self {
            Identity::Guest => "guest".to_string(),
            Identity::User(id) => id.to_string(),
        }
    }

    /// Returns true for the anonymous guest namespace.
    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }

    /// Returns the user ID for an authenticated identity.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::Guest => None,
            Identity::User(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_suffix())
    }
}

impl From<UserId> for Identity {
    fn from(id: UserId) -> Self {
        Identity::User(id)
    }
}
