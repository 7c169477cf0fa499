use crate::auth::password::Credential;
use crate::auth::repo_types::{User, UserId};
use crate::error::{AppError, AppResult};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, username, email, password, avatar_key, created_at";

impl User {
    /// Find a user by exact (case-sensitive) username.
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user. The pre-checks give precise errors in the common
    /// case; the unique constraints settle concurrent registrations.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        email: &str,
        credential: &Credential,
    ) -> AppResult<User> {
        if User::find_by_username(db, username).await?.is_some() {
            return Err(AppError::DuplicateUsername);
        }
        if User::find_by_email(db, email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password)
            VALUES (?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(credential.as_stored())
        .fetch_one(db)
        .await
        .map_err(AppError::from_user_insert)
    }

    /// Replace the credential unconditionally.
    pub async fn set_credential(db: &SqlitePool, id: UserId, credential: &Credential) -> AppResult<()> {
        let res = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(credential.as_stored())
            .bind(id)
            .execute(db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Swap a legacy credential for its hash, only if the row still holds
    /// the legacy value. Returns whether this call performed the swap.
    pub async fn upgrade_legacy_credential(
        db: &SqlitePool,
        id: UserId,
        legacy: &str,
        hashed: &Credential,
    ) -> AppResult<bool> {
        let res = sqlx::query("UPDATE users SET password = ? WHERE id = ? AND password = ?")
            .bind(hashed.as_stored())
            .bind(id)
            .bind(legacy)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn set_avatar_key(db: &SqlitePool, id: UserId, key: Option<&str>) -> AppResult<()> {
        sqlx::query("UPDATE users SET avatar_key = ? WHERE id = ?")
            .bind(key)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Delete the user; foreign keys cascade to every owned record.
    pub async fn delete(db: &SqlitePool, id: UserId) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn legacy_user(db: &SqlitePool, username: &str, password: &str) -> User {
        User::create(
            db,
            username,
            &format!("{username}@x.com"),
            &Credential::Legacy(password.into()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_find() {
        let db = crate::db::memory().await;
        let cred = Credential::hash("pw1").unwrap();
        let user = User::create(&db, "alice", "alice@x.com", &cred).await.unwrap();

        let by_name = User::find_by_username(&db, "alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        let by_email = User::find_by_email(&db, "alice@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_id = User::find_by_id(&db, user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert!(User::find_by_username(&db, "Alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_rejected_without_insert() {
        let db = crate::db::memory().await;
        let cred = Credential::hash("pw1").unwrap();
        User::create(&db, "alice", "alice@x.com", &cred).await.unwrap();

        let err = User::create(&db, "alice", "other@x.com", &cred).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));
        let err = User::create(&db, "bob", "alice@x.com", &cred).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn raw_unique_violation_is_translated() {
        let db = crate::db::memory().await;
        legacy_user(&db, "alice", "pw").await;
        let err = sqlx::query("INSERT INTO users (username, email, password) VALUES ('x', 'alice@x.com', 'p')")
            .execute(&db)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from_user_insert(err), AppError::DuplicateEmail));

        let err = sqlx::query("INSERT INTO users (username, email, password) VALUES ('alice', 'new@x.com', 'p')")
            .execute(&db)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from_user_insert(err), AppError::DuplicateUsername));
    }

    #[tokio::test]
    async fn legacy_upgrade_only_applies_once() {
        let db = crate::db::memory().await;
        let user = legacy_user(&db, "carol", "plain").await;
        let hashed = Credential::hash("plain").unwrap();

        assert!(User::upgrade_legacy_credential(&db, user.id, "plain", &hashed).await.unwrap());
        let other = Credential::hash("plain").unwrap();
        assert!(!User::upgrade_legacy_credential(&db, user.id, "plain", &other).await.unwrap());

        let stored = User::find_by_id(&db, user.id).await.unwrap().unwrap();
        assert_eq!(stored.credential(), hashed);
    }

    #[tokio::test]
    async fn deleting_missing_user_is_not_found() {
        let db = crate::db::memory().await;
        let err = User::delete(&db, UserId(42)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
