use std::sync::Arc;

use crate::domain::clock::Clock;
use crate::domain::ids::UserId;
use crate::domain::ports::UserStoreRef;
use crate::domain::user::{User, normalize_email};
use crate::error::{LibraryError, Result};

/// Registration input.
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
}

/// Registers borrowers and enforces email uniqueness before any loan
/// operation can reference them.
pub struct UserService {
    users: UserStoreRef,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(users: UserStoreRef, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    #[tracing::instrument(skip(self, draft))]
    pub async fn register(&self, draft: UserDraft) -> Result<UserId> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(LibraryError::invalid("name", "name is required"));
        }

        let email = normalize_email(&draft.email);
        if !is_valid_email(&email) {
            return Err(LibraryError::invalid("email", "email format is invalid"));
        }
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(LibraryError::conflict("email already registered"));
        }

        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email,
            registered_at: self.clock.now(),
        };
        self.users.add(user).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.list().await
    }
}

/// Structural check only: one `@`, non-empty local part, dotted host, no
/// whitespace. Deliverability is not our problem.
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, host)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || host.contains('@') {
        return false;
    }
    host.split_once('.')
        .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
}
