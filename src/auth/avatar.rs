use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    auth::repo_types::{User, UserId},
    error::{AppError, AppResult},
    state::AppState,
};

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

pub struct Avatar {
    pub body: Bytes,
    pub content_type: &'static str,
}

/// Stores the avatar under `avatars/<user_id>.<ext>`. A later upload replaces
/// the earlier one; the old file goes away if its extension differs.
pub async fn upload_avatar(
    st: &AppState,
    user_id: UserId,
    content_type: &str,
    body: Bytes,
) -> AppResult<String> {
    let ext = ext_from_mime(content_type)
        .ok_or_else(|| AppError::bad_request("Avatar must be a jpeg, png, webp or gif image"))?;
    if body.is_empty() {
        return Err(AppError::bad_request("Avatar is empty"));
    }
    if body.len() > MAX_AVATAR_BYTES {
        return Err(AppError::bad_request("Avatar is too large"));
    }

    let user = User::find_by_id(&st.db, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let key = format!("avatars/{}.{}", user_id, ext);
    st.storage.put_object(&key, body).await?;
    User::set_avatar_key(&st.db, user_id, Some(&key)).await?;

    if let Some(old) = user.avatar_key.filter(|old| *old != key) {
        if let Err(e) = st.storage.delete_object(&old).await {
            warn!(error = %e, %user_id, key = %old, "stale avatar cleanup failed");
        }
    }
    info!(%user_id, %key, "avatar stored");
    Ok(key)
}

pub async fn load_avatar(st: &AppState, user_id: UserId) -> AppResult<Avatar> {
    let user = User::find_by_id(&st.db, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let key = user.avatar_key.ok_or(AppError::NotFound)?;
    let body = st.storage.get_object(&key).await?.ok_or(AppError::NotFound)?;
    let content_type = key
        .rsplit_once('.')
        .and_then(|(_, ext)| mime_from_ext(ext))
        .unwrap_or("application/octet-stream");
    Ok(Avatar { body, content_type })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn mime_from_ext(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
