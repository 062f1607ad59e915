//! Resolves the logged-in user before any command that acts on their behalf.

use thiserror::Error;

use crate::store::{Store, StoreError, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not logged in: run `gator register <name>` or `gator login <name>` first")]
    NotLoggedIn,
    #[error("current user {0:?} is not registered; run `gator login <name>`")]
    UnknownUser(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn require_user<S: Store>(store: &S, name: Option<&str>) -> Result<User, AuthError> {
    let name = name.filter(|n| !n.is_empty()).ok_or(AuthError::NotLoggedIn)?;
    store
        .get_user_by_name(name)
        .await?
        .ok_or_else(|| AuthError::UnknownUser(name.to_string()))
}
