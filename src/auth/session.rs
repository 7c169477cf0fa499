use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::{
    auth::repo_types::{User, UserId},
    error::{AppError, AppResult},
    state::AppState,
};

/// Session key under which the authenticated user id lives.
pub const SESSION_USER_ID_KEY: &str = "user_id";

/// Who the current request stream speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(UserId),
}

impl SessionState {
    pub async fn load(session: &Session) -> AppResult<Self> {
        Ok(match session.get::<UserId>(SESSION_USER_ID_KEY).await? {
            Some(id) => SessionState::Authenticated(id),
            None => SessionState::Anonymous,
        })
    }
}

/// Binds the session to `user`. Only call once the credential was accepted.
pub async fn login(session: &Session, user: &User) -> AppResult<SessionState> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_ID_KEY, user.id).await?;
    debug!(user_id = %user.id, "session authenticated");
    Ok(SessionState::Authenticated(user.id))
}

/// Drops the session entirely, whatever state it was in.
pub async fn logout(session: &Session) -> AppResult<SessionState> {
    session.flush().await?;
    Ok(SessionState::Anonymous)
}

/// The authenticated requester. Protected handlers take this and pass the id
/// explicitly to whatever needs it. A session whose account has since been
/// deleted is flushed and treated as anonymous.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| {
                warn!(%status, msg, "session layer missing");
                AppError::Internal(anyhow::anyhow!(msg))
            })?;

        let SessionState::Authenticated(id) = SessionState::load(&session).await? else {
            return Err(AppError::Unauthenticated);
        };

        let app = AppState::from_ref(state);
        if User::find_by_id(&app.db, id).await?.is_none() {
            warn!(user_id = %id, "session refers to a deleted account");
            logout(&session).await?;
            return Err(AppError::Unauthenticated);
        }
        Ok(CurrentUser(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::OffsetDateTime;
    use tower_sessions::MemoryStore;

    use super::*;

    fn user(id: i64) -> User {
        User {
            id: UserId(id),
            username: format!("user{id}"),
            email: format!("user{id}@x.com"),
            password: "pw".into(),
            avatar_key: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn fresh_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn starts_anonymous() {
        let session = fresh_session();
        assert_eq!(SessionState::load(&session).await.unwrap(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn login_then_logout() {
        let session = fresh_session();
        let state = login(&session, &user(7)).await.unwrap();
        assert_eq!(state, SessionState::Authenticated(UserId(7)));
        assert_eq!(
            SessionState::load(&session).await.unwrap(),
            SessionState::Authenticated(UserId(7))
        );

        assert_eq!(logout(&session).await.unwrap(), SessionState::Anonymous);
        assert_eq!(SessionState::load(&session).await.unwrap(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn logout_from_anonymous_is_fine() {
        let session = fresh_session();
        assert_eq!(logout(&session).await.unwrap(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn second_login_switches_identity() {
        let session = fresh_session();
        login(&session, &user(1)).await.unwrap();
        login(&session, &user(2)).await.unwrap();
        assert_eq!(
            SessionState::load(&session).await.unwrap(),
            SessionState::Authenticated(UserId(2))
        );
    }
}
