use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        password::{Credential, Verification},
        repo_types::{User, UserId},
        reset_token::ResetTokenKeys,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::bad_request("Password must not be empty"));
    }
    Ok(())
}

pub async fn register(db: &SqlitePool, payload: RegisterRequest) -> AppResult<User> {
    let username = payload.username.trim();
    let email = normalize_email(&payload.email);

    if username.is_empty() {
        return Err(AppError::bad_request("Username must not be empty"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    require_password(&payload.password)?;

    let credential = Credential::hash(&payload.password)?;
    let user = User::create(db, username, &email, &credential).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks `presented` against the user's credential. A matching legacy
/// credential is replaced by its hash before returning.
pub async fn verify_and_migrate(db: &SqlitePool, user: &User, presented: &str) -> AppResult<bool> {
    let credential = user.credential();
    match credential.verify(presented)? {
        Verification::Rejected => Ok(false),
        Verification::Accepted => Ok(true),
        Verification::AcceptedLegacy(hashed) => {
            let swapped =
                User::upgrade_legacy_credential(db, user.id, credential.as_stored(), &hashed).await?;
            if swapped {
                info!(user_id = %user.id, "legacy credential migrated");
            }
            Ok(true)
        }
    }
}

/// Resolves a username/password pair to a user. Unknown usernames and wrong
/// passwords fail the same way.
pub async fn authenticate(db: &SqlitePool, username: &str, password: &str) -> AppResult<User> {
    let Some(user) = User::find_by_username(db, username.trim()).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_and_migrate(db, &user, password).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

pub async fn set_credential(db: &SqlitePool, user_id: UserId, new_password: &str) -> AppResult<()> {
    require_password(new_password)?;
    let credential = Credential::hash(new_password)?;
    User::set_credential(db, user_id, &credential).await
}

pub async fn change_password(
    db: &SqlitePool,
    user_id: UserId,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    if !verify_and_migrate(db, &user, current_password).await? {
        warn!(%user_id, "password change with wrong current password");
        return Err(AppError::InvalidCredentials);
    }
    set_credential(db, user_id, new_password).await?;
    info!(%user_id, "password changed");
    Ok(())
}

/// Mails a reset link when the address belongs to an account. Unknown
/// addresses succeed silently.
pub async fn forgot_password(state: &AppState, keys: &ResetTokenKeys, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        info!(%email, "password reset requested for unknown email");
        return Ok(());
    };

    let token = keys.issue(&user.email)?;
    let link = format!(
        "{}/reset-password?token={}",
        state.config.public_base_url.trim_end_matches('/'),
        token
    );
    let body = format!(
        "Hello {},\n\nTo reset your password, open the link below. It expires in one hour.\n\n{}\n\nIf you did not ask for this, ignore this message.\n",
        user.username, link
    );
    state.mailer.send(&user.email, "Password reset", &body).await?;
    info!(user_id = %user.id, "password reset mail sent");
    Ok(())
}

pub async fn reset_password(
    db: &SqlitePool,
    keys: &ResetTokenKeys,
    token: &str,
    new_password: &str,
) -> AppResult<()> {
    let email = keys.verify(token)?;
    let user = User::find_by_email(db, &email)
        .await?
        .ok_or(AppError::TokenInvalid)?;
    set_credential(db, user.id, new_password).await?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Removes the account, everything it owns and its avatar.
pub async fn delete_account(state: &AppState, user_id: UserId) -> AppResult<()> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    User::delete(&state.db, user_id).await?;
    if let Some(key) = user.avatar_key.as_deref() {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(error = %e, %user_id, key, "avatar cleanup failed");
        }
    }
    info!(%user_id, "account deleted");
    Ok(())
}
