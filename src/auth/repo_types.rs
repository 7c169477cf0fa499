use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::password::Credential;

/// Numeric identity of a user; the only thing a session remembers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,           // stored credential, see `Credential::parse`
    pub avatar_key: Option<String>, // storage key of the current avatar
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn credential(&self) -> Credential {
        Credential::parse(&self.password)
    }
}
