use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Opaque authenticated user identifier (an email address in practice).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Source of the acting user's identity.
///
/// `None` means there is no authenticated session; operations requiring
/// one fail with their own auth error.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// In-process session, driven by the host app's login and logout flows.
#[derive(Default)]
pub struct SessionIdentity {
    user: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts already signed in.
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: UserId) {
        *self.user.write().expect("identity lock poisoned") = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().expect("identity lock poisoned") = None;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.read().expect("identity lock poisoned").clone()
    }
}
